//! Session acquisition and teardown.
//!
//! [`SessionBuilder`] configures and opens a [`Session`]: it registers with
//! the hub, discovers the single valid peer, and binds to it. Discovery is
//! strict — zero candidates, an unknown explicit peer, or several
//! candidates without an explicit choice are all faults; there is no
//! pick-first fallback. Any failure after registration unregisters before
//! returning, so a half-open connection never leaks.
//!
//! [`with_session`] wraps the acquire/run/release cycle for callers who
//! want scoped lifetime; [`list_peers`] is the matching diagnostic for
//! disambiguating an [`Error::AmbiguousPeer`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ds9link::{BusClient, Result, SessionBuilder};
//!
//! # async fn example(bus: Arc<dyn BusClient>) -> Result<()> {
//! let session = SessionBuilder::new()
//!     .timeout(30)
//!     .connect(bus)
//!     .await?;
//!
//! session.set("cmap viridis").await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::bus::BusClient;
use crate::error::{Error, Result};
use crate::report::{ReportSink, TracingSink};
use crate::session::{DEFAULT_TIMEOUT_SECS, Session};

// ============================================================================
// Constants
// ============================================================================

/// Default client name announced to the hub.
const DEFAULT_NAME: &str = "ds9link";

/// Default client description announced to the hub.
const DEFAULT_DESCRIPTION: &str = "Client created by ds9link";

// ============================================================================
// SessionBuilder
// ============================================================================

/// Fluent configuration for opening a [`Session`].
pub struct SessionBuilder {
    /// Client name announced to the hub.
    name: String,
    /// Client description announced to the hub.
    description: String,
    /// Explicit peer choice; required when several peers are connected.
    peer: Option<String>,
    /// Default per-call timeout in seconds (`0` = no timeout).
    timeout: u32,
    /// Verbose per-command tracing.
    verbose: bool,
    /// Receiver for remote-reported diagnostics.
    sink: Arc<dyn ReportSink>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            peer: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            verbose: false,
            sink: Arc::new(TracingSink),
        }
    }
}

impl SessionBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the client name announced to the hub.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the client description announced to the hub.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Binds to a specific peer client id.
    ///
    /// Only needed when multiple DS9 instances are connected to the hub;
    /// use [`list_peers`] to find the candidate ids.
    #[must_use]
    pub fn peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Sets the default per-call timeout in seconds (`0` = no timeout).
    #[must_use]
    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables verbose per-command tracing.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Installs a custom diagnostics sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the client name this builder announces.
    #[inline]
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.name
    }

    /// Returns the client description this builder announces.
    #[inline]
    #[must_use]
    pub fn client_description(&self) -> &str {
        &self.description
    }

    /// Registers with the hub, discovers the peer, and opens the session.
    ///
    /// Supporting `ds9.get`/`ds9.set` is taken on faith as "is DS9": SAMP
    /// is not a secure connection system, and the check stops at the two
    /// required capabilities.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPeer`] when nothing on the hub supports both commands.
    /// - [`Error::UnknownPeer`] when the explicit peer is not a candidate.
    /// - [`Error::AmbiguousPeer`] when several candidates exist and none
    ///   was chosen.
    /// - [`Error::Bus`] on registration or lookup failure.
    ///
    /// On every failure after registration the connection is torn down
    /// before the error is returned.
    pub async fn connect(self, bus: Arc<dyn BusClient>) -> Result<Session> {
        bus.connect(&self.name, &self.description, &registration_metadata())
            .await?;

        let bound = match Self::discover(bus.as_ref(), self.peer.as_deref()).await {
            Ok(bound) => bound,
            Err(e) => {
                let _ = bus.disconnect().await;
                return Err(e);
            }
        };

        let metadata = match bus.metadata(&bound).await {
            Ok(metadata) => metadata,
            Err(e) => {
                let _ = bus.disconnect().await;
                return Err(e);
            }
        };

        info!(peer = %bound, name = %self.name, "session opened");
        Ok(Session::new(
            bus,
            bound,
            metadata,
            self.timeout,
            self.verbose,
            self.sink,
        ))
    }

    /// Resolves the single valid peer.
    async fn discover(bus: &dyn BusClient, explicit: Option<&str>) -> Result<String> {
        let mut candidates = candidate_peers(bus).await?;
        debug!(?candidates, "peers supporting ds9.get/set");

        if candidates.is_empty() {
            return Err(Error::NoPeer);
        }

        if let Some(name) = explicit {
            return if candidates.iter().any(|c| c == name) {
                Ok(name.to_string())
            } else {
                Err(Error::unknown_peer(name))
            };
        }

        if candidates.len() > 1 {
            return Err(Error::ambiguous_peer(candidates));
        }
        Ok(candidates.swap_remove(0))
    }
}

// ============================================================================
// Scoped Acquisition
// ============================================================================

/// Runs a closure against a freshly opened session, guaranteeing teardown.
///
/// The hub connection is released on every exit path: after the closure
/// completes, when it fails, and when acquisition itself fails partway.
/// A closure error takes precedence over a disconnect error.
///
/// # Errors
///
/// Acquisition faults (see [`SessionBuilder::connect`]), the closure's own
/// error, or a disconnect failure, in that order of precedence.
pub async fn with_session<T, F>(bus: Arc<dyn BusClient>, builder: SessionBuilder, f: F) -> Result<T>
where
    F: AsyncFnOnce(&Session) -> Result<T>,
{
    let session = builder.connect(bus).await?;
    let outcome = f(&session).await;
    let closed = session.close().await;

    let value = outcome?;
    closed?;
    Ok(value)
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Lists the client ids of every peer supporting both command capabilities.
///
/// Opens a short-lived connection of its own and disconnects even when the
/// listing fails. The result is sorted and deterministic; use it to pick a
/// peer after an [`Error::AmbiguousPeer`].
///
/// # Errors
///
/// Returns [`Error::Bus`] on registration or lookup failure.
pub async fn list_peers(bus: Arc<dyn BusClient>) -> Result<Vec<String>> {
    bus.connect(DEFAULT_NAME, DEFAULT_DESCRIPTION, &registration_metadata())
        .await?;
    let outcome = candidate_peers(bus.as_ref()).await;
    let closed = bus.disconnect().await;

    let peers = outcome?;
    closed?;
    Ok(peers)
}

/// Metadata declared alongside every hub registration.
fn registration_metadata() -> FxHashMap<String, String> {
    let mut metadata = FxHashMap::default();
    metadata.insert(
        "ds9link.version".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    metadata
}

/// Intersects the subscriber lists of the two required capabilities.
async fn candidate_peers(bus: &dyn BusClient) -> Result<Vec<String>> {
    let getters = bus.subscribed_clients("ds9.get").await?;
    let setters = bus.subscribed_clients("ds9.set").await?;

    let mut candidates: Vec<String> = getters
        .into_iter()
        .filter(|id| setters.contains(id))
        .collect();
    candidates.sort();
    candidates.dedup();
    Ok(candidates)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bus::testing::MockBus;
    use crate::protocol::ReplyEnvelope;

    #[tokio::test]
    async fn test_connect_single_candidate() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c1");
        bus.set_metadata("c1", "ds9.version", "8.7");

        let session = SessionBuilder::new()
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap();

        assert_eq!(session.peer(), "c1");
        assert_eq!(session.version(), Some("8.7"));
        assert_eq!(*bus.transitions.lock(), vec!["connect"]);

        let announced = bus.announced.lock();
        let (name, description, metadata) = announced.as_ref().unwrap();
        assert_eq!(name, "ds9link");
        assert_eq!(description, "Client created by ds9link");
        assert_eq!(
            metadata.get("ds9link.version").map(String::as_str),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }

    #[tokio::test]
    async fn test_connect_announces_overridden_identity() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c1");

        SessionBuilder::new()
            .name("imexam")
            .description("scripted viewer control")
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap();

        let announced = bus.announced.lock();
        let (name, description, metadata) = announced.as_ref().unwrap();
        assert_eq!(name, "imexam");
        assert_eq!(description, "scripted viewer control");
        // Overriding the identity never drops the declared library version.
        assert!(metadata.contains_key("ds9link.version"));
    }

    #[tokio::test]
    async fn test_connect_no_candidates_disconnects() {
        let bus = Arc::new(MockBus::new());

        let err = SessionBuilder::new()
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoPeer));
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_connect_ambiguous_requires_explicit_choice() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c2");
        bus.add_peer("c1");

        let err = SessionBuilder::new()
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap_err();

        match err {
            Error::AmbiguousPeer { candidates } => {
                assert_eq!(candidates, vec!["c1".to_string(), "c2".to_string()]);
            }
            other => panic!("expected AmbiguousPeer, got {other:?}"),
        }
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_connect_explicit_peer() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c1");
        bus.add_peer("c2");

        let session = SessionBuilder::new()
            .peer("c2")
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap();

        assert_eq!(session.peer(), "c2");
    }

    #[tokio::test]
    async fn test_connect_unknown_explicit_peer() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c1");

        let err = SessionBuilder::new()
            .peer("c9")
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownPeer { name } if name == "c9"));
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_connect_requires_both_capabilities() {
        let bus = Arc::new(MockBus::new());
        // Subscribed to ds9.get only.
        bus.subscribers
            .lock()
            .entry("ds9.get".to_string())
            .or_default()
            .push("half".to_string());

        let err = SessionBuilder::new()
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoPeer));
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let bus = Arc::new(MockBus::new());
        *bus.fail_connect.lock() = true;

        let err = SessionBuilder::new()
            .connect(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Bus { .. }));
        assert!(bus.transitions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_builder_defaults() {
        let builder = SessionBuilder::new();
        assert_eq!(builder.client_name(), "ds9link");
        assert_eq!(builder.client_description(), "Client created by ds9link");
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(!builder.verbose);
        assert!(builder.peer.is_none());
    }

    #[tokio::test]
    async fn test_with_session_disconnects_on_success_and_failure() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c1");
        bus.push_reply(ReplyEnvelope::ok(Some("grey")));

        let cmap = with_session(
            Arc::clone(&bus) as Arc<dyn BusClient>,
            SessionBuilder::new(),
            async |session| session.get("cmap").await,
        )
        .await
        .unwrap();
        assert_eq!(cmap, Some("grey".to_string()));
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);

        bus.transitions.lock().clear();
        bus.push_fault(Error::call_timeout(10));

        let err = with_session(
            Arc::clone(&bus) as Arc<dyn BusClient>,
            SessionBuilder::new(),
            async |session| session.get("cmap").await,
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_list_peers_sorted_and_scoped() {
        let bus = Arc::new(MockBus::new());
        bus.add_peer("c3");
        bus.add_peer("c1");
        bus.add_peer("c2");

        let peers = list_peers(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap();

        assert_eq!(
            peers,
            vec!["c1".to_string(), "c2".to_string(), "c3".to_string()]
        );
        assert_eq!(*bus.transitions.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_list_peers_empty_hub() {
        let bus = Arc::new(MockBus::new());
        let peers = list_peers(Arc::clone(&bus) as Arc<dyn BusClient>)
            .await
            .unwrap();
        assert!(peers.is_empty());
    }
}
