//! Structured run events and the per-run log sink.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One unit of run output, serialized as a single NDJSON line on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Incidental textual output from the crew.
    Log { message: String },
    /// The run is blocked waiting for a human value tagged with `id`.
    InputRequired { id: String, prompt: String },
    /// Terminal: the crew finished normally.
    FinalResult { result: String },
    /// Terminal: the crew failed.
    Error { message: String },
}

/// Per-run structured log sink.
///
/// Each run gets its own logger writing to its own event channel, so log
/// capture is per-run and thread-safe by construction — no shared global
/// output sink to redirect.
#[derive(Clone)]
pub struct RunLogger {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl RunLogger {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    /// Emit text as `log` events, one per line.
    /// Blank and whitespace-only lines are suppressed.
    pub fn line(&self, text: &str) {
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let _ = self.tx.send(RunEvent::Log { message: line.to_string() });
        }
    }

    /// Emit a structured event as-is.
    pub fn event(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_to_wire_shape() {
        let log = serde_json::to_string(&RunEvent::Log { message: "step1 done".into() }).unwrap();
        assert_eq!(log, r#"{"type":"log","message":"step1 done"}"#);

        let input = serde_json::to_string(&RunEvent::InputRequired {
            id: "t-1".into(),
            prompt: "Pick one".into(),
        })
        .unwrap();
        assert_eq!(input, r#"{"type":"input_required","id":"t-1","prompt":"Pick one"}"#);

        let final_result =
            serde_json::to_string(&RunEvent::FinalResult { result: "done".into() }).unwrap();
        assert_eq!(final_result, r#"{"type":"final_result","result":"done"}"#);

        let error = serde_json::to_string(&RunEvent::Error { message: "boom".into() }).unwrap();
        assert_eq!(error, r#"{"type":"error","message":"boom"}"#);
    }

    #[test]
    fn logger_splits_lines_and_drops_blanks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = RunLogger::new(tx);

        logger.line("first\n\n   \nsecond\n");
        logger.line("   ");

        assert_eq!(rx.try_recv().unwrap(), RunEvent::Log { message: "first".into() });
        assert_eq!(rx.try_recv().unwrap(), RunEvent::Log { message: "second".into() });
        assert!(rx.try_recv().is_err());
    }
}
