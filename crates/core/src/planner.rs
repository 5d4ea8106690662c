//! Per-file action planning.
//!
//! A file whose audio already has the target channel count is copied byte for
//! byte; anything else is remuxed with only its audio re-encoded.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do with one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
    /// Duplicate the file unchanged.
    Copy { src: PathBuf, dst: PathBuf },
    /// Copy the video stream and re-encode audio to `target_channels`.
    Transcode {
        src: PathBuf,
        dst: PathBuf,
        target_channels: u32,
    },
}

/// Decides between a copy and a transcode from the probed and target channel counts.
pub fn plan(
    src: impl Into<PathBuf>,
    dst: impl Into<PathBuf>,
    current_channels: u32,
    target_channels: u32,
) -> FileAction {
    let (src, dst) = (src.into(), dst.into());
    if current_channels == target_channels {
        FileAction::Copy { src, dst }
    } else {
        FileAction::Transcode {
            src,
            dst,
            target_channels,
        }
    }
}
