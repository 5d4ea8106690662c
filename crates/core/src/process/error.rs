//! Error types for the process module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running an external program.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Program binary not found.
    #[error("Program not found: {program}")]
    NotFound { program: PathBuf },

    /// The program could not be started.
    #[error("Failed to start {program}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure.
    #[error("{program} exited with code {code:?}")]
    ToolFailed { program: PathBuf, code: Option<i32> },

    /// The child could not be confirmed dead after a termination request.
    #[error("Failed to terminate process {pid:?}: {reason}")]
    TerminateFailed { pid: Option<u32>, reason: String },

    /// I/O error while talking to the child.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Maps a spawn error, distinguishing a missing binary from other failures.
    pub fn spawn(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let program = program.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { program }
        } else {
            Self::SpawnFailed { program, source }
        }
    }

    /// Creates a terminate failure error.
    pub fn terminate_failed(pid: Option<u32>, reason: impl Into<String>) -> Self {
        Self::TerminateFailed {
            pid,
            reason: reason.into(),
        }
    }

    /// Whether this error may leave a child process running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TerminateFailed { .. })
    }
}
