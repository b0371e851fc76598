//! ds9link - Drive a running SAO DS9 image display over a SAMP hub.
//!
//! This library controls a remote, already-running DS9 instance through the
//! SAMP publish-subscribe bus, issuing synchronous `set` (mutate state) and
//! `get` (query state) commands and exchanging raw numeric arrays through a
//! shared-file handoff.
//!
//! # Architecture
//!
//! The crate layers from a pure leaf upward:
//!
//! - **Array codec**: stateless translation between an in-memory array and
//!   the wire descriptor (`xdim=..,ydim=..,bitpix=..`) plus raw bytes.
//! - **Command channel**: one blocking (awaited) call per command, with
//!   timeout, tri-state outcome, and inline-vs-file payload resolution.
//! - **Session**: `get`/`set` primitives plus [`Session::send_array`] and
//!   [`Session::retrieve_array`], bound to exactly one peer.
//! - **Lifecycle**: peer discovery, scoped acquisition, guaranteed
//!   teardown.
//!
//! The SAMP hub itself sits behind the [`BusClient`] trait; a hub client
//! implementation is supplied by the embedding application.
//!
//! SAMP is not designed as a secure connection system: any client
//! advertising `ds9.get` and `ds9.set` is assumed to be DS9 (or a valid
//! DS9 emulator).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ds9link::{ArrayData, BusClient, Result, SessionBuilder, Shape};
//!
//! # async fn example(bus: Arc<dyn BusClient>) -> Result<()> {
//! let session = SessionBuilder::new().connect(bus).await?;
//!
//! // Raw commands
//! session.set("cmap viridis").await?;
//! let zoom = session.get("zoom").await?;
//! println!("zoom: {zoom:?}");
//!
//! // Array handoff
//! let image = ArrayData::from_f64(Shape::two(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
//! session.send_array(&image, None, false, None).await?;
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | SAMP hub collaborator boundary ([`BusClient`]) |
//! | [`codec`] | Array/wire translation ([`ArrayData`], descriptors) |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`lifecycle`] | Discovery, acquisition, teardown |
//! | [`protocol`] | Call/reply message types (internal plumbing) |
//! | [`report`] | Remote-reported diagnostics sink |
//! | [`session`] | The bound [`Session`] and its operations |

// ============================================================================
// Modules
// ============================================================================

/// SAMP hub collaborator boundary.
pub mod bus;

/// Array codec: wire descriptors and bit-depth decoding.
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Session acquisition and teardown.
pub mod lifecycle;

/// SAMP call/reply message types.
pub mod protocol;

/// Structured reporting of remote-reported warnings and errors.
pub mod report;

/// Session: the bound connection to one DS9 peer.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

// Bus boundary
pub use bus::BusClient;

// Codec types
pub use codec::{ArrayData, ByteOrder, CubeChannel, ElementType, Shape};

// Error types
pub use error::{Error, Result};

// Lifecycle
pub use lifecycle::{SessionBuilder, list_peers, with_session};

// Protocol types
pub use protocol::{CallKind, CommandResult, ReplyEnvelope};

// Reporting
pub use report::{ReportSink, TracingSink};

// Session
pub use session::Session;
