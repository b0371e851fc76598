//! Synchronous command execution over the bus.
//!
//! [`CommandChannel`] turns the bus's call-and-wait primitive into one
//! blocking (awaited) call with a classified outcome. A call does not
//! return until the peer acknowledges processing — deliberately not
//! fire-and-forget, so command N+1 is never sent before command N has been
//! handled and ordering holds across a whole session.
//!
//! # Per-call state machine
//!
//! `Idle → AwaitingReply → Resolved(Ok | Warning | Error) → Idle`, with no
//! partial or streaming states. An expired local wait is a transport fault
//! ([`Error::CallTimeout`]), distinct from a remote-reported `Error`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace};
use url::Url;

use crate::bus::BusClient;
use crate::error::{Error, Result};
use crate::report::ReportSink;

use super::{CallKind, CommandResult, ReplyEnvelope};

// ============================================================================
// CommandChannel
// ============================================================================

/// Executes single commands against one bound peer.
///
/// Owns the outcome classification and payload resolution; the per-call
/// timeout is supplied by the caller (the session applies its default).
pub struct CommandChannel {
    /// The hub connection.
    bus: Arc<dyn BusClient>,
    /// Hub-assigned id of the bound peer. Never changes.
    peer: String,
    /// Receiver for remote-reported diagnostics.
    sink: Arc<dyn ReportSink>,
}

impl CommandChannel {
    /// Creates a channel bound to one peer.
    pub(crate) fn new(bus: Arc<dyn BusClient>, peer: String, sink: Arc<dyn ReportSink>) -> Self {
        Self { bus, peer, sink }
    }

    /// Returns the bound peer id.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Performs one remote command and classifies its outcome.
    ///
    /// Blocks the calling task until the peer's reply envelope arrives or
    /// the wait expires. A `timeout_secs` of `0` removes the local bound
    /// entirely; the call then waits as long as the bus does.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for empty command text (checked before
    ///   any bus traffic).
    /// - [`Error::CallTimeout`] when the wait expires with no reply.
    /// - [`Error::Protocol`] for an unrecognized reply status.
    /// - [`Error::Bus`] / [`Error::Io`] on delivery or payload-read failure.
    pub async fn call(
        &self,
        kind: CallKind,
        command: &str,
        timeout_secs: u32,
    ) -> Result<CommandResult> {
        if command.trim().is_empty() {
            return Err(Error::invalid_argument("command text must not be empty"));
        }

        trace!(peer = %self.peer, mtype = kind.mtype(), command, timeout_secs, "sending command");

        let envelope = self
            .bus
            .call_and_wait(&self.peer, kind.mtype(), timeout_secs, command)
            .await?;

        self.classify(envelope).await
    }

    /// Classifies a reply envelope into a [`CommandResult`].
    ///
    /// The three SAMP statuses are matched exhaustively; anything else is a
    /// transport fault, never silently coerced.
    async fn classify(&self, envelope: ReplyEnvelope) -> Result<CommandResult> {
        match envelope.status.as_str() {
            "samp.ok" => {
                let payload = self.resolve_payload(&envelope).await?;
                Ok(CommandResult::Ok { payload })
            }
            "samp.warning" => {
                let message = envelope.error_message();
                let payload = self.resolve_payload(&envelope).await?;
                Ok(CommandResult::Warning { message, payload })
            }
            "samp.error" => Ok(CommandResult::Error {
                message: envelope.error_message(),
            }),
            other => Err(Error::protocol(format!(
                "unrecognized reply status {other:?}"
            ))),
        }
    }

    /// Resolves the reply payload: inline `value`, or the contents of a
    /// `file` URL.
    ///
    /// A URL with any other scheme is reported through the sink and yields
    /// no payload; the peer put it there, so it is the peer's mistake, not
    /// a transport fault. The referenced file is read whole and left in
    /// place — ownership stays with whichever side created it.
    async fn resolve_payload(&self, envelope: &ReplyEnvelope) -> Result<Option<String>> {
        if let Some(value) = envelope.result_field("value") {
            return Ok(Some(value.to_string()));
        }

        let Some(raw) = envelope.result_field("url") else {
            return Ok(None);
        };

        let url = Url::parse(raw)
            .map_err(|e| Error::protocol(format!("reply carried unparseable url {raw:?}: {e}")))?;

        if url.scheme() != "file" {
            self.sink.error_reported(&format!(
                "reply url has unsupported scheme {:?}: {raw}",
                url.scheme()
            ));
            return Ok(None);
        }

        let path = url
            .to_file_path()
            .map_err(|()| Error::protocol(format!("reply file url has no local path: {raw}")))?;

        debug!(path = %path.display(), "reading file-backed payload");
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(Some(contents))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use crate::bus::testing::MockBus;
    use crate::report::testing::CollectSink;

    fn channel(bus: Arc<MockBus>, sink: Arc<CollectSink>) -> CommandChannel {
        CommandChannel::new(bus, "c1".to_string(), sink)
    }

    #[tokio::test]
    async fn test_ok_with_inline_value() {
        let bus = Arc::new(MockBus::new());
        bus.push_reply(ReplyEnvelope::ok(Some("grey")));
        let sink = Arc::new(CollectSink::new());

        let result = channel(Arc::clone(&bus), Arc::clone(&sink))
            .call(CallKind::Get, "cmap", 10)
            .await
            .unwrap();

        assert_eq!(
            result,
            CommandResult::Ok {
                payload: Some("grey".to_string())
            }
        );

        let calls = bus.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].peer, "c1");
        assert_eq!(calls[0].mtype, "ds9.get");
        assert_eq!(calls[0].timeout_secs, 10);
        assert_eq!(calls[0].command, "cmap");
    }

    #[tokio::test]
    async fn test_ok_without_value() {
        let bus = Arc::new(MockBus::new());
        bus.push_reply(ReplyEnvelope::ok(None));
        let sink = Arc::new(CollectSink::new());

        let result = channel(bus, sink)
            .call(CallKind::Set, "frame new", 10)
            .await
            .unwrap();

        assert_eq!(result, CommandResult::Ok { payload: None });
    }

    #[tokio::test]
    async fn test_remote_error_is_not_a_fault() {
        let bus = Arc::new(MockBus::new());
        bus.push_reply(ReplyEnvelope::error("unknown command"));
        let sink = Arc::new(CollectSink::new());

        let result = channel(bus, sink)
            .call(CallKind::Get, "bogus", 10)
            .await
            .unwrap();

        assert_eq!(
            result,
            CommandResult::Error {
                message: "DS9 reported: unknown command".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_warning_with_and_without_message() {
        let bus = Arc::new(MockBus::new());
        let mut warn = ReplyEnvelope::error("deprecated");
        warn.status = "samp.warning".to_string();
        bus.push_reply(warn);

        let mut bare = ReplyEnvelope::ok(None);
        bare.status = "samp.warning".to_string();
        bus.push_reply(bare);

        let sink = Arc::new(CollectSink::new());
        let ch = channel(bus, sink);

        let first = ch.call(CallKind::Set, "cmap old", 10).await.unwrap();
        assert_eq!(
            first,
            CommandResult::Warning {
                message: "DS9 reported: deprecated".to_string(),
                payload: None
            }
        );

        let second = ch.call(CallKind::Set, "cmap old", 10).await.unwrap();
        assert_eq!(
            second,
            CommandResult::Warning {
                message: super::super::UNKNOWN_ERROR.to_string(),
                payload: None
            }
        );
    }

    #[tokio::test]
    async fn test_unrecognized_status_is_transport_fault() {
        let bus = Arc::new(MockBus::new());
        let mut odd = ReplyEnvelope::ok(None);
        odd.status = "samp.whatever".to_string();
        bus.push_reply(odd);
        let sink = Arc::new(CollectSink::new());

        let err = channel(bus, sink)
            .call(CallKind::Get, "cmap", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_empty_command_rejected_before_traffic() {
        let bus = Arc::new(MockBus::new());
        let sink = Arc::new(CollectSink::new());

        let err = channel(Arc::clone(&bus), sink)
            .call(CallKind::Set, "   ", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(bus.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_zero_timeout_forwarded_unbounded() {
        let bus = Arc::new(MockBus::new());
        bus.push_reply(ReplyEnvelope::ok(None));
        let sink = Arc::new(CollectSink::new());

        channel(Arc::clone(&bus), sink)
            .call(CallKind::Get, "cmap", 0)
            .await
            .unwrap();

        assert_eq!(bus.calls.lock()[0].timeout_secs, 0);
    }

    #[tokio::test]
    async fn test_timeout_fault_propagates() {
        let bus = Arc::new(MockBus::new());
        bus.push_fault(Error::call_timeout(10));
        let sink = Arc::new(CollectSink::new());

        let err = channel(bus, sink)
            .call(CallKind::Get, "cmap", 10)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_file_url_payload_resolved() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "payload line").unwrap();

        let bus = Arc::new(MockBus::new());
        let mut reply = ReplyEnvelope::ok(None);
        let url = Url::from_file_path(file.path()).unwrap();
        reply
            .result
            .as_mut()
            .unwrap()
            .insert("url".to_string(), url.to_string());
        bus.push_reply(reply);
        let sink = Arc::new(CollectSink::new());

        let result = channel(bus, sink)
            .call(CallKind::Get, "regions", 10)
            .await
            .unwrap();

        assert_eq!(result.into_payload(), Some("payload line".to_string()));
        // The channel never deletes the file.
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn test_foreign_scheme_reported_not_raised() {
        let bus = Arc::new(MockBus::new());
        let mut reply = ReplyEnvelope::ok(None);
        reply
            .result
            .as_mut()
            .unwrap()
            .insert("url".to_string(), "http://example.com/data".to_string());
        bus.push_reply(reply);
        let sink = Arc::new(CollectSink::new());

        let result = channel(bus, Arc::clone(&sink))
            .call(CallKind::Get, "regions", 10)
            .await
            .unwrap();

        assert_eq!(result, CommandResult::Ok { payload: None });
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error:"));
        assert!(events[0].contains("http"));
    }

    #[tokio::test]
    async fn test_inline_value_wins_over_url() {
        let bus = Arc::new(MockBus::new());
        let mut reply = ReplyEnvelope::ok(Some("inline"));
        reply
            .result
            .as_mut()
            .unwrap()
            .insert("url".to_string(), "file:///nonexistent".to_string());
        bus.push_reply(reply);
        let sink = Arc::new(CollectSink::new());

        let result = channel(bus, sink)
            .call(CallKind::Get, "cmap", 10)
            .await
            .unwrap();

        assert_eq!(result.into_payload(), Some("inline".to_string()));
    }
}
