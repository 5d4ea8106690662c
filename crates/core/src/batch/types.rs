//! Types for batch runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::OutputPolicy;

/// Smallest accepted target channel count.
pub const MIN_CHANNELS: u32 = 1;

/// Largest accepted target channel count.
pub const MAX_CHANNELS: u32 = 8;

/// One batch conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique identifier for this run.
    pub run_id: String,
    /// Folder holding the proxies to conform.
    pub input_dir: PathBuf,
    /// Folder receiving the conformed proxies.
    pub output_dir: PathBuf,
    /// Channel count every output file must end up with.
    pub target_channels: u32,
    /// What to do if `output_dir` already holds files.
    #[serde(default)]
    pub output_policy: OutputPolicy,
}

impl ConversionJob {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        target_channels: u32,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            target_channels,
            output_policy: OutputPolicy::default(),
        }
    }

    pub fn with_output_policy(mut self, policy: OutputPolicy) -> Self {
        self.output_policy = policy;
        self
    }
}

/// An input file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Full path of the input file.
    pub path: PathBuf,
    /// Same file name under the output folder.
    pub output_path: PathBuf,
    /// Lowercased extension without the dot.
    pub extension: String,
}

impl MediaFile {
    pub fn new(path: PathBuf, output_dir: &Path) -> Option<Self> {
        let file_name = path.file_name()?;
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        let output_path = output_dir.join(file_name);
        Some(Self {
            path,
            output_path,
            extension,
        })
    }

    /// File name for log lines.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Listing,
    Probing,
    Planning,
    Executing,
    Completed,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    /// Files that were listed for the run.
    pub total_files: usize,
    /// Files copied or transcoded successfully.
    pub completed_count: usize,
    /// Whether the run stopped early on request.
    pub was_cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Mutable bookkeeping for one run, owned by the worker task.
#[derive(Debug)]
pub(crate) struct RunState {
    pub phase: RunPhase,
    pub total: usize,
    pub current_index: usize,
    pub processed: usize,
    pub last_percent: Option<u8>,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            total: 0,
            current_index: 0,
            processed: 0,
            last_percent: None,
            started_at: Utc::now(),
        }
    }

    pub fn enter(&mut self, phase: RunPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, index = self.current_index, "Run phase change");
        self.phase = phase;
    }

    /// Percentage of files attempted once the file at `index` is done.
    pub fn percent_after(&self, index: usize) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (((index + 1) * 100) / self.total).min(100) as u8
    }

    pub fn outcome(&self, run_id: &str) -> RunOutcome {
        RunOutcome {
            run_id: run_id.to_string(),
            total_files: self.total,
            completed_count: self.processed,
            was_cancelled: self.phase == RunPhase::Cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_defaults() {
        let job = ConversionJob::new("/in", "/out", 2);
        assert_eq!(job.target_channels, 2);
        assert_eq!(job.output_policy, OutputPolicy::SkipCheck);
        assert!(uuid::Uuid::parse_str(&job.run_id).is_ok());

        let other = ConversionJob::new("/in", "/out", 2);
        assert_ne!(job.run_id, other.run_id);
    }

    #[test]
    fn test_media_file_output_path() {
        let file = MediaFile::new(PathBuf::from("/in/A001C003.MOV"), Path::new("/out")).unwrap();
        assert_eq!(file.output_path, PathBuf::from("/out/A001C003.MOV"));
        assert_eq!(file.extension, "mov");
        assert_eq!(file.display_name(), "A001C003.MOV");
    }

    #[test]
    fn test_media_file_without_extension() {
        assert!(MediaFile::new(PathBuf::from("/in/README"), Path::new("/out")).is_none());
    }

    #[test]
    fn test_percent_after() {
        let mut state = RunState::new();
        state.total = 3;
        assert_eq!(state.percent_after(0), 33);
        assert_eq!(state.percent_after(1), 66);
        assert_eq!(state.percent_after(2), 100);
    }

    #[test]
    fn test_percent_with_no_files() {
        let state = RunState::new();
        assert_eq!(state.percent_after(0), 100);
    }

    #[test]
    fn test_outcome_reflects_phase() {
        let mut state = RunState::new();
        state.total = 4;
        state.processed = 2;
        state.enter(RunPhase::Cancelled);
        let outcome = state.outcome("run-1");
        assert!(outcome.was_cancelled);
        assert_eq!(outcome.completed_count, 2);
        assert_eq!(outcome.total_files, 4);
        assert!(outcome.finished_at >= outcome.started_at);
        assert!(RunPhase::Cancelled.is_terminal());
        assert!(!RunPhase::Probing.is_terminal());
    }
}
