//! Error types for batch runs.

use std::path::PathBuf;
use thiserror::Error;

use crate::process::ProcessError;

/// Errors that stop a batch from starting or from finishing.
///
/// Per-file failures are not errors at this level: they are reported as log
/// events and the run moves on to the next file.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Input folder missing or not a directory.
    #[error("Input folder not found: {path}")]
    InputDirMissing { path: PathBuf },

    /// Output folder missing or not a directory.
    #[error("Output folder not found: {path}")]
    OutputDirMissing { path: PathBuf },

    /// Input and output resolve to the same folder.
    #[error("Input and output folders are the same: {path}")]
    SameDirectory { path: PathBuf },

    /// Target channel count outside the supported range.
    #[error("Invalid channel count {value}: expected {min} to {max}")]
    InvalidChannelCount { value: u32, min: u32, max: u32 },

    /// Output folder has files and the policy says abort.
    #[error("Output folder is not empty: {path}")]
    OutputNotEmpty { path: PathBuf },

    /// An external tool could not be run.
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// Another run is active on this orchestrator.
    #[error("A batch run is already in progress")]
    AlreadyRunning,

    /// The input folder could not be listed.
    #[error("Failed to list input folder: {path}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing output files could not be removed.
    #[error("Failed to clear output folder: {path}")]
    OutputCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A child process could not be reaped.
    #[error("Process management failed: {0}")]
    Process(#[from] ProcessError),

    /// The worker task panicked or was aborted.
    #[error("Batch worker failed: {0}")]
    TaskFailed(String),
}

impl BatchError {
    /// Creates a tool unavailable error.
    pub fn tool_unavailable(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error was raised before the run started.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InputDirMissing { .. }
                | Self::OutputDirMissing { .. }
                | Self::SameDirectory { .. }
                | Self::InvalidChannelCount { .. }
                | Self::OutputNotEmpty { .. }
                | Self::ToolUnavailable { .. }
        )
    }
}
