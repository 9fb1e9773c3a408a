//! Warning sink collaborator for refresh diagnostics

use std::sync::Mutex;

/// Receives warning-level diagnostics from the refresh engine.
///
/// The store never fails a read over a bad file edit; it reports the
/// condition here and keeps serving the last-known-good contents. The
/// default sink forwards to the `tracing` subscriber; tests typically
/// inject a [`RecordingSink`] and assert on the captured messages.
pub trait WarningSink: Send + Sync {
    /// Record one warning message.
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing::warn!`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Discards all warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&self, _message: &str) {}
}

/// Buffers warnings in memory for later inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl WarningSink for RecordingSink {
    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.warn("first");
        sink.warn("second");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_null_sink_discards() {
        // Just exercise the no-op path
        NullSink.warn("dropped");
    }
}
