//! Events pushed from a batch run to its caller.
//!
//! The orchestrator calls an [`EventSink`] synchronously from its worker task.
//! Sinks that feed a UI thread are responsible for marshalling the calls over
//! themselves; [`ChannelSink`] does this with an unbounded tokio channel.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiver of progress, log and completion notifications.
pub trait EventSink: Send + Sync {
    /// Overall progress, 0 to 100, counting files attempted.
    fn on_progress(&self, percent: u8);

    /// One human-readable log line.
    fn on_log(&self, line: &str);

    /// Terminal notification, sent exactly once per run.
    fn on_complete(&self, processed: usize, cancelled: bool);
}

/// A sink notification as a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Progress { percent: u8 },
    Log { line: String },
    Completed { processed: usize, cancelled: bool },
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Sink that forwards every notification into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: BatchEvent) {
        if self.tx.send(event).is_err() {
            debug!("No receiver for batch event");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_progress(&self, percent: u8) {
        self.send(BatchEvent::Progress { percent });
    }

    fn on_log(&self, line: &str) {
        self.send(BatchEvent::Log {
            line: line.to_string(),
        });
    }

    fn on_complete(&self, processed: usize, cancelled: bool) {
        self.send(BatchEvent::Completed {
            processed,
            cancelled,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.on_log("Copying a.mp4");
        sink.on_progress(50);
        sink.on_complete(1, false);

        assert_eq!(
            rx.recv().await,
            Some(BatchEvent::Log {
                line: "Copying a.mp4".to_string()
            })
        );
        assert_eq!(rx.recv().await, Some(BatchEvent::Progress { percent: 50 }));
        let last = rx.recv().await.unwrap();
        assert!(last.is_terminal());
    }

    #[test]
    fn test_channel_sink_without_receiver_does_not_panic() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_progress(10);
    }

    #[test]
    fn test_event_serialization() {
        let event = BatchEvent::Completed {
            processed: 3,
            cancelled: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"completed","processed":3,"cancelled":true}"#);
    }
}
