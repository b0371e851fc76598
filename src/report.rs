//! Structured reporting of remote-reported warnings and errors.
//!
//! A peer rejecting or flagging a command is a normal outcome, not a fault,
//! so it surfaces as an event on a [`ReportSink`] instead of an `Err`. The
//! default sink routes events into `tracing`; callers wanting their own
//! presentation install a sink through
//! [`SessionBuilder::sink`](crate::lifecycle::SessionBuilder::sink).

// ============================================================================
// Imports
// ============================================================================

use tracing::{error, warn};

// ============================================================================
// ReportSink
// ============================================================================

/// Receiver for remote-reported diagnostics.
///
/// Implementations must be cheap: sinks are invoked inline on the command
/// path.
pub trait ReportSink: Send + Sync {
    /// A peer reply carried `samp.warning`; the command still succeeded.
    fn warning_reported(&self, message: &str);

    /// A peer reply carried `samp.error`; the command was rejected.
    fn error_reported(&self, message: &str);
}

// ============================================================================
// TracingSink
// ============================================================================

/// Default sink: forwards events to `tracing` at warn/error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn warning_reported(&self, message: &str) {
        warn!(message, "peer reported warning");
    }

    fn error_reported(&self, message: &str) {
        error!(message, "peer reported error");
    }
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Collecting sink for assertions on reported events.

    use super::*;

    use parking_lot::Mutex;

    /// Records every reported event, prefixed with its level.
    #[derive(Debug, Default)]
    pub struct CollectSink {
        pub events: Mutex<Vec<String>>,
    }

    impl CollectSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn drain(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl ReportSink for CollectSink {
        fn warning_reported(&self, message: &str) {
            self.events.lock().push(format!("warning: {message}"));
        }

        fn error_reported(&self, message: &str) {
            self.events.lock().push(format!("error: {message}"));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::testing::CollectSink;
    use super::*;

    #[test]
    fn test_collect_sink_records_in_order() {
        let sink = CollectSink::new();
        sink.warning_reported("first");
        sink.error_reported("second");

        assert_eq!(
            sink.drain(),
            vec!["warning: first".to_string(), "error: second".to_string()]
        );
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_tracing_sink_is_installable() {
        // Smoke test: the default sink can be called without a subscriber.
        let sink = TracingSink;
        sink.warning_reported("w");
        sink.error_reported("e");
    }
}
