//! The SAMP bus collaborator boundary.
//!
//! Everything this crate needs from a SAMP hub client is captured by the
//! [`BusClient`] trait: registration, peer metadata, capability-subscriber
//! listing, and the call-and-wait primitive. Delivery guarantees, transport
//! framing, and hub discovery belong to the implementation behind this
//! trait, not to this crate.
//!
//! Implementations map their own failures into [`Error::Bus`] and an
//! expired call wait into [`Error::CallTimeout`], keeping the transport
//! taxonomy uniform for the layers above.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::protocol::ReplyEnvelope;

// ============================================================================
// BusClient
// ============================================================================

/// Client handle onto the SAMP hub.
///
/// All methods are async; a `call_and_wait` does not resolve until the peer
/// has fully processed the command (or the wait expires). A timeout of `0`
/// means no local bound on the wait.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Registers with the hub, announcing a client name, description, and
    /// declared metadata (such as the library version).
    async fn connect(
        &self,
        name: &str,
        description: &str,
        metadata: &FxHashMap<String, String>,
    ) -> Result<()>;

    /// Unregisters from the hub.
    ///
    /// This never closes the hub or the peer application.
    async fn disconnect(&self) -> Result<()>;

    /// Returns the declared metadata of a peer.
    async fn metadata(&self, peer: &str) -> Result<FxHashMap<String, String>>;

    /// Lists the client ids subscribed to an mtype.
    async fn subscribed_clients(&self, mtype: &str) -> Result<Vec<String>>;

    /// Sends a command to a peer and waits for its reply envelope.
    ///
    /// # Arguments
    ///
    /// * `peer` - Hub-assigned client id of the target.
    /// * `mtype` - Capability name the call is issued on.
    /// * `timeout_secs` - Wait bound in seconds; `0` waits indefinitely.
    /// * `command` - Plain-text command for the peer.
    ///
    /// # Errors
    ///
    /// - [`Error::CallTimeout`](crate::Error::CallTimeout) when the wait
    ///   expires with no reply.
    /// - [`Error::Bus`](crate::Error::Bus) on delivery failure.
    async fn call_and_wait(
        &self,
        peer: &str,
        mtype: &str,
        timeout_secs: u32,
        command: &str,
    ) -> Result<ReplyEnvelope>;
}

// ============================================================================
// Test Support
// ============================================================================
