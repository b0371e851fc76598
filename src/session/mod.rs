//! Session: the bound connection to one DS9 peer.
//!
//! A [`Session`] composes the command channel and the array codec into the
//! user-facing surface: the raw [`get`](Session::get) / [`set`](Session::set)
//! primitives and the array operations in [`transfer`]. It owns the default
//! timeout and the verbose tracing flag, and is bound to exactly one peer
//! for its whole lifetime.
//!
//! Remote-reported errors never raise: they are reported through the
//! session's [`ReportSink`] and degrade to an absent/failed sentinel so a
//! multi-step workflow (probe, then create a frame, then transfer) keeps
//! going. Only transport faults surface as `Err`.

// ============================================================================
// Submodules
// ============================================================================

/// Array send/retrieve operations.
pub mod transfer;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::bus::BusClient;
use crate::error::Result;
use crate::protocol::{CallKind, CommandChannel, CommandResult};
use crate::report::ReportSink;

// ============================================================================
// Constants
// ============================================================================

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 10;

/// Metadata key under which DS9 advertises its version.
const VERSION_KEY: &str = "ds9.version";

// ============================================================================
// Session
// ============================================================================

/// A live connection to one DS9 peer on the hub.
///
/// Built by [`SessionBuilder`](crate::lifecycle::SessionBuilder); all calls
/// are strictly ordered on a single logical thread of control, blocking
/// (awaiting) until the peer has processed each command.
pub struct Session {
    /// The hub connection, exclusively owned by this session.
    bus: Arc<dyn BusClient>,
    /// Command execution against the bound peer.
    channel: CommandChannel,
    /// Peer metadata captured at bind time.
    metadata: FxHashMap<String, String>,
    /// Default timeout in seconds; `0` means no timeout.
    timeout: u32,
    /// Upgrade per-command traces from debug to info level.
    verbose: bool,
    /// Receiver for remote-reported diagnostics.
    sink: Arc<dyn ReportSink>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.channel.peer())
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.version().unwrap_or("<unknown>");
        write!(
            f,
            "Connection to DS9 {version} (client {})",
            self.channel.peer()
        )
    }
}

impl Session {
    /// Creates a session bound to a discovered peer.
    pub(crate) fn new(
        bus: Arc<dyn BusClient>,
        peer: String,
        metadata: FxHashMap<String, String>,
        timeout: u32,
        verbose: bool,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let channel = CommandChannel::new(Arc::clone(&bus), peer, Arc::clone(&sink));
        Self {
            bus,
            channel,
            metadata,
            timeout,
            verbose,
            sink,
        }
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the bound peer's client id.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &str {
        self.channel.peer()
    }

    /// Returns the peer's advertised DS9 version, if declared.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.metadata.get(VERSION_KEY).map(String::as_str)
    }

    /// Returns the default timeout in seconds (`0` = no timeout).
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Sets the default timeout in seconds (`0` = no timeout).
    #[inline]
    pub fn set_timeout(&mut self, timeout: u32) {
        self.timeout = timeout;
    }

    /// Returns the verbose tracing flag.
    #[inline]
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Sets the verbose tracing flag.
    #[inline]
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Resolves a per-call override against the session default.
    #[inline]
    pub(crate) fn effective_timeout(&self, timeout: Option<u32>) -> u32 {
        timeout.unwrap_or(self.timeout)
    }
}

// ============================================================================
// Session - Commands
// ============================================================================

impl Session {
    /// Queries state with the session's default timeout.
    ///
    /// Returns `Ok(None)` both for a reply without a value and for a
    /// remote-reported error (reported through the sink) — the absent
    /// sentinel is a legitimate outcome, distinct from `Some("")`.
    ///
    /// # Errors
    ///
    /// Only transport faults: timeout, bus failure, malformed reply.
    pub async fn get(&self, command: &str) -> Result<Option<String>> {
        self.get_with_timeout(command, self.timeout).await
    }

    /// Queries state with an explicit timeout (`0` = no timeout).
    ///
    /// # Errors
    ///
    /// Only transport faults; see [`Session::get`].
    pub async fn get_with_timeout(&self, command: &str, timeout: u32) -> Result<Option<String>> {
        self.trace_command("get", command, timeout);

        match self.channel.call(CallKind::Get, command, timeout).await? {
            CommandResult::Ok { payload } => Ok(payload),
            CommandResult::Warning { message, payload } => {
                self.sink.warning_reported(&message);
                Ok(payload)
            }
            CommandResult::Error { message } => {
                self.sink.error_reported(&message);
                Ok(None)
            }
        }
    }

    /// Mutates state with the session's default timeout.
    ///
    /// Returns `Ok(true)` when the peer processed the command (a warning is
    /// reported but still counts as success) and `Ok(false)` when the peer
    /// rejected it (reported, non-fatal).
    ///
    /// # Errors
    ///
    /// Only transport faults: timeout, bus failure, malformed reply.
    pub async fn set(&self, command: &str) -> Result<bool> {
        self.set_with_timeout(command, self.timeout).await
    }

    /// Mutates state with an explicit timeout (`0` = no timeout).
    ///
    /// # Errors
    ///
    /// Only transport faults; see [`Session::set`].
    pub async fn set_with_timeout(&self, command: &str, timeout: u32) -> Result<bool> {
        self.trace_command("set", command, timeout);

        match self.channel.call(CallKind::Set, command, timeout).await? {
            CommandResult::Ok { .. } => Ok(true),
            CommandResult::Warning { message, .. } => {
                self.sink.warning_reported(&message);
                Ok(true)
            }
            CommandResult::Error { message } => {
                self.sink.error_reported(&message);
                Ok(false)
            }
        }
    }

    /// Disconnects from the hub.
    ///
    /// This never closes the hub or the DS9 instance.
    ///
    /// # Errors
    ///
    /// Returns the bus's unregistration failure, if any.
    pub async fn close(self) -> Result<()> {
        info!(peer = %self.channel.peer(), "closing session");
        self.bus.disconnect().await
    }

    /// Traces one outgoing command at the level the verbose flag selects.
    fn trace_command(&self, kind: &str, command: &str, timeout: u32) {
        if self.verbose {
            info!(peer = %self.channel.peer(), kind, command, timeout, "ds9 command");
        } else {
            debug!(peer = %self.channel.peer(), kind, command, timeout, "ds9 command");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
