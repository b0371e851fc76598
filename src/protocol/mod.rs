//! SAMP call/reply message types.
//!
//! Defines the reply envelope a peer sends back from a command call and the
//! classified [`CommandResult`] the rest of the crate consumes.
//!
//! # Reply envelope
//!
//! The hub delivers a map keyed with SAMP names:
//!
//! ```json
//! {
//!   "samp.status": "samp.ok",
//!   "samp.result": { "value": "grey" }
//! }
//! ```
//!
//! Error and warning replies carry the detail under `samp.error`:
//!
//! ```json
//! {
//!   "samp.status": "samp.error",
//!   "samp.error": { "samp.errortxt": "unknown command" }
//! }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Synchronous command execution over the bus.
pub mod channel;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::CommandChannel;

use rustc_hash::FxHashMap;
use serde::Deserialize;

// ============================================================================
// Constants
// ============================================================================

/// Placeholder when a failing reply carries no error text.
pub(crate) const UNKNOWN_ERROR: &str = "Unknown DS9 error";

// ============================================================================
// CallKind
// ============================================================================

/// The two command kinds a session issues.
///
/// Both ride the `ds9.get` mtype on the wire: `ds9.set` is a capability a
/// valid peer must advertise, but DS9 only replies to calls made on
/// `ds9.get`, and a set needs that reply envelope to report its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Query state: the reply may carry a payload.
    Get,
    /// Mutate state: the reply reports success only.
    Set,
}

impl CallKind {
    /// Returns the SAMP mtype the call is issued on.
    #[inline]
    #[must_use]
    pub fn mtype(&self) -> &'static str {
        match self {
            Self::Get | Self::Set => "ds9.get",
        }
    }
}

// ============================================================================
// ReplyEnvelope
// ============================================================================

/// A raw reply envelope as delivered by the hub.
///
/// The status string stays untyped here; [`CommandChannel`] classifies it
/// exhaustively and treats anything outside the three SAMP statuses as a
/// transport fault.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyEnvelope {
    /// Reply status: `samp.ok`, `samp.warning`, or `samp.error`.
    #[serde(rename = "samp.status")]
    pub status: String,

    /// Error detail map; `samp.errortxt` holds the message.
    #[serde(rename = "samp.error", default)]
    pub error: Option<FxHashMap<String, String>>,

    /// Result map; `value` holds an inline payload, `url` a file-backed one.
    #[serde(rename = "samp.result", default)]
    pub result: Option<FxHashMap<String, String>>,
}

impl ReplyEnvelope {
    /// Builds a success envelope with an optional inline value.
    #[must_use]
    pub fn ok(value: Option<&str>) -> Self {
        let mut result = FxHashMap::default();
        if let Some(value) = value {
            result.insert("value".to_string(), value.to_string());
        }
        Self {
            status: "samp.ok".to_string(),
            error: None,
            result: Some(result),
        }
    }

    /// Builds an error envelope with the given message.
    #[must_use]
    pub fn error(message: &str) -> Self {
        let mut error = FxHashMap::default();
        error.insert("samp.errortxt".to_string(), message.to_string());
        Self {
            status: "samp.error".to_string(),
            error: Some(error),
            result: None,
        }
    }

    /// Extracts the error message, falling back to the generic placeholder.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|map| map.get("samp.errortxt"))
            .map_or_else(
                || UNKNOWN_ERROR.to_string(),
                |text| format!("DS9 reported: {text}"),
            )
    }

    /// Gets a string from the result map.
    #[inline]
    #[must_use]
    pub fn result_field(&self, key: &str) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|map| map.get(key))
            .map(String::as_str)
    }
}

// ============================================================================
// CommandResult
// ============================================================================

/// Classified outcome of one remote command.
///
/// Produced per call and consumed immediately; never persisted. A remote
/// `Error` here is a *reported* failure, not a transport fault — the
/// session stays usable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The peer processed the command.
    Ok {
        /// Resolved payload, if the reply carried one.
        payload: Option<String>,
    },
    /// The peer processed the command but flagged a problem.
    Warning {
        /// The warning text.
        message: String,
        /// Resolved payload, if any.
        payload: Option<String>,
    },
    /// The peer rejected the command.
    Error {
        /// The rejection text.
        message: String,
    },
}

impl CommandResult {
    /// Returns the payload for non-error outcomes.
    #[must_use]
    pub fn into_payload(self) -> Option<String> {
        match self {
            Self::Ok { payload } | Self::Warning { payload, .. } => payload,
            Self::Error { .. } => None,
        }
    }

    /// Returns `true` unless the peer rejected the command.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_kind_mtypes() {
        // Sets also go out on ds9.get: DS9 never replies on ds9.set, and a
        // set needs the reply envelope to report its outcome.
        assert_eq!(CallKind::Get.mtype(), "ds9.get");
        assert_eq!(CallKind::Set.mtype(), "ds9.get");
    }

    #[test]
    fn test_envelope_from_json() {
        let json = r#"{
            "samp.status": "samp.ok",
            "samp.result": {"value": "viridis"}
        }"#;

        let envelope: ReplyEnvelope = serde_json::from_str(json).expect("parse");
        assert_eq!(envelope.status, "samp.ok");
        assert_eq!(envelope.result_field("value"), Some("viridis"));
        assert!(envelope.error.is_none());
    }

    #[test]
    fn test_envelope_error_message() {
        let json = r#"{
            "samp.status": "samp.error",
            "samp.error": {"samp.errortxt": "unknown command"}
        }"#;

        let envelope: ReplyEnvelope = serde_json::from_str(json).expect("parse");
        assert_eq!(envelope.error_message(), "DS9 reported: unknown command");
    }

    #[test]
    fn test_envelope_error_message_placeholder() {
        let json = r#"{"samp.status": "samp.error"}"#;
        let envelope: ReplyEnvelope = serde_json::from_str(json).expect("parse");
        assert_eq!(envelope.error_message(), UNKNOWN_ERROR);

        // An error map without the text key also falls back.
        let json = r#"{"samp.status": "samp.error", "samp.error": {}}"#;
        let envelope: ReplyEnvelope = serde_json::from_str(json).expect("parse");
        assert_eq!(envelope.error_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_envelope_builders() {
        let ok = ReplyEnvelope::ok(Some("128"));
        assert_eq!(ok.status, "samp.ok");
        assert_eq!(ok.result_field("value"), Some("128"));

        let ok = ReplyEnvelope::ok(None);
        assert_eq!(ok.result_field("value"), None);

        let err = ReplyEnvelope::error("bad frame");
        assert_eq!(err.status, "samp.error");
        assert_eq!(err.error_message(), "DS9 reported: bad frame");
    }

    #[test]
    fn test_command_result_payload() {
        let ok = CommandResult::Ok {
            payload: Some("x".into()),
        };
        assert!(ok.is_success());
        assert_eq!(ok.into_payload(), Some("x".to_string()));

        let warn = CommandResult::Warning {
            message: "w".into(),
            payload: None,
        };
        assert!(warn.is_success());
        assert_eq!(warn.into_payload(), None);

        let err = CommandResult::Error {
            message: "e".into(),
        };
        assert!(!err.is_success());
        assert_eq!(err.into_payload(), None);
    }
}
