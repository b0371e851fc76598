//! Error types for ds9link.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ds9link::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.set("cmap viridis").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Transport | [`Error::Bus`], [`Error::CallTimeout`], [`Error::Protocol`] |
//! | Validation | [`Error::InvalidArgument`], [`Error::UnsupportedType`], [`Error::UnknownFormat`] |
//! | Discovery | [`Error::NoPeer`], [`Error::UnknownPeer`], [`Error::AmbiguousPeer`] |
//! | External | [`Error::Io`] |
//!
//! Remote-reported command failures are deliberately *not* part of this
//! taxonomy: the peer rejecting a command is a normal, recoverable outcome
//! reported through the [`ReportSink`](crate::report::ReportSink) and
//! surfaced as an absent value, so that multi-step workflows keep going.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// SAMP hub or delivery failure.
    ///
    /// Returned when the bus cannot be reached or a call fails in transit.
    #[error("Bus error: {message}")]
    Bus {
        /// Description of the bus failure.
        message: String,
    },

    /// The local wait for a reply elapsed.
    ///
    /// Distinct from a remote-reported error: no reply envelope was produced.
    #[error("Call timed out after {seconds}s")]
    CallTimeout {
        /// Seconds waited before giving up.
        seconds: u32,
    },

    /// Malformed or unrecognized reply envelope.
    ///
    /// Returned when the reply cannot be classified, including an
    /// unrecognized status string.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Invalid argument supplied by the caller.
    ///
    /// Returned before any bus interaction: bad array rank, zero-sized axis,
    /// illegal cube/channel combination, empty command text.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Element type has no wire representation.
    ///
    /// Returned when an array's element type cannot be mapped to a bitpix
    /// code.
    #[error("Unsupported element type: {dtype}")]
    UnsupportedType {
        /// Name of the unsupported element type.
        dtype: String,
    },

    /// Unrecognized bitpix code in a decode request.
    #[error("Unknown bitpix code: {bitpix}")]
    UnknownFormat {
        /// The unrecognized code.
        bitpix: i32,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// No peer on the hub advertises both ds9.get and ds9.set.
    #[error("Unable to find a SAMP client that supports ds9.get/set")]
    NoPeer,

    /// The explicitly requested peer is not a valid candidate.
    #[error("Client name {name} is not valid")]
    UnknownPeer {
        /// The requested client id.
        name: String,
    },

    /// Multiple candidate peers and no explicit choice.
    ///
    /// The caller must disambiguate; there is no pick-first fallback.
    #[error("Multiple DS9 SAMP clients found ({}); select one explicitly", candidates.join(", "))]
    AmbiguousPeer {
        /// The candidate client ids, sorted.
        candidates: Vec<String>,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a bus error.
    #[inline]
    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus {
            message: message.into(),
        }
    }

    /// Creates a call timeout error.
    #[inline]
    pub fn call_timeout(seconds: u32) -> Self {
        Self::CallTimeout { seconds }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    #[inline]
    pub fn unsupported_type(dtype: impl Into<String>) -> Self {
        Self::UnsupportedType {
            dtype: dtype.into(),
        }
    }

    /// Creates an unknown format error.
    #[inline]
    pub fn unknown_format(bitpix: i32) -> Self {
        Self::UnknownFormat { bitpix }
    }

    /// Creates an unknown peer error.
    #[inline]
    pub fn unknown_peer(name: impl Into<String>) -> Self {
        Self::UnknownPeer { name: name.into() }
    }

    /// Creates an ambiguous peer error.
    #[inline]
    pub fn ambiguous_peer(candidates: Vec<String>) -> Self {
        Self::AmbiguousPeer { candidates }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CallTimeout { .. })
    }

    /// Returns `true` if this is a transport-level fault.
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Bus { .. } | Self::CallTimeout { .. } | Self::Protocol { .. } | Self::Io(_)
        )
    }

    /// Returns `true` if this is a local validation fault.
    ///
    /// Validation faults are raised before any bus interaction.
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::UnsupportedType { .. } | Self::UnknownFormat { .. }
        )
    }

    /// Returns `true` if this is a discovery fault.
    #[inline]
    #[must_use]
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            Self::NoPeer | Self::UnknownPeer { .. } | Self::AmbiguousPeer { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::bus("hub unreachable");
        assert_eq!(err.to_string(), "Bus error: hub unreachable");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::call_timeout(10);
        assert_eq!(err.to_string(), "Call timed out after 10s");
    }

    #[test]
    fn test_ambiguous_peer_display() {
        let err = Error::ambiguous_peer(vec!["c1".into(), "c2".into()]);
        assert_eq!(
            err.to_string(),
            "Multiple DS9 SAMP clients found (c1, c2); select one explicitly"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::call_timeout(5);
        let other_err = Error::bus("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::bus("test").is_transport());
        assert!(Error::call_timeout(1).is_transport());
        assert!(Error::protocol("bad status").is_transport());
        assert!(!Error::NoPeer.is_transport());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::invalid_argument("rank 4").is_validation());
        assert!(Error::unsupported_type("complex64").is_validation());
        assert!(Error::unknown_format(-8).is_validation());
        assert!(!Error::protocol("test").is_validation());
    }

    #[test]
    fn test_is_discovery() {
        assert!(Error::NoPeer.is_discovery());
        assert!(Error::unknown_peer("c9").is_discovery());
        assert!(Error::ambiguous_peer(vec![]).is_discovery());
        assert!(!Error::bus("test").is_discovery());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport());
    }
}
