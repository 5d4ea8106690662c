//! Error types for the probe module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing a file's channel count.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// FFprobe ran but exited unsuccessfully.
    #[error("ffprobe exited with code {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    /// The file has no audio stream to inspect.
    #[error("No audio stream found")]
    NoAudioStream,

    /// FFprobe output was not a single channel count.
    #[error("Unexpected ffprobe output: {output:?}")]
    InvalidOutput { output: String },

    /// I/O error while running the probe.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Creates a tool failure error from an exit code and captured stderr.
    pub fn tool_failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            code,
            stderr: stderr.into().trim().to_string(),
        }
    }

    /// Creates an invalid output error.
    pub fn invalid_output(output: impl Into<String>) -> Self {
        Self::InvalidOutput {
            output: output.into(),
        }
    }

    /// Whether the probe tool itself is unusable, as opposed to the file being bad.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_trims_stderr() {
        let err = ProbeError::tool_failed(Some(1), "  moov atom not found\n");
        assert_eq!(
            err.to_string(),
            "ffprobe exited with code Some(1): moov atom not found"
        );
    }

    #[test]
    fn test_is_tool_missing() {
        let err = ProbeError::ToolNotFound {
            path: PathBuf::from("ffprobe"),
        };
        assert!(err.is_tool_missing());
        assert!(!ProbeError::NoAudioStream.is_tool_missing());
    }
}
