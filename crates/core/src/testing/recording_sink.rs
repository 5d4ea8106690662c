//! Event sink that records everything it receives.

use std::sync::{Mutex, PoisonError};

use crate::batch::CancelHandle;
use crate::events::{BatchEvent, EventSink};

/// Records events for test assertions.
///
/// Can optionally cancel a run as soon as a log line containing a given
/// substring arrives, which makes mid-run cancellation deterministic.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BatchEvent>>,
    cancel_trigger: Option<(String, CancelHandle)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `handle` when a log line containing `needle` is received.
    pub fn cancel_on_log(needle: &str, handle: CancelHandle) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_trigger: Some((needle.to_string(), handle)),
        }
    }

    fn push(&self, event: BatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// All events received so far.
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Log lines received so far.
    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Log { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Progress percentages received so far.
    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { percent } => Some(percent),
                _ => None,
            })
            .collect()
    }

    /// Every completion event as `(processed, cancelled)`.
    pub fn completions(&self) -> Vec<(usize, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Completed {
                    processed,
                    cancelled,
                } => Some((processed, cancelled)),
                _ => None,
            })
            .collect()
    }

    /// The single completion event, if exactly one was received.
    pub fn completion(&self) -> Option<(usize, bool)> {
        match self.completions().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Whether any log line contains `needle`.
    pub fn has_log_containing(&self, needle: &str) -> bool {
        self.logs().iter().any(|line| line.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn on_progress(&self, percent: u8) {
        self.push(BatchEvent::Progress { percent });
    }

    fn on_log(&self, line: &str) {
        self.push(BatchEvent::Log {
            line: line.to_string(),
        });
        if let Some((needle, handle)) = &self.cancel_trigger {
            if line.contains(needle.as_str()) {
                handle.cancel();
            }
        }
    }

    fn on_complete(&self, processed: usize, cancelled: bool) {
        self.push(BatchEvent::Completed {
            processed,
            cancelled,
        });
    }
}
