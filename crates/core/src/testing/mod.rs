//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the probe and process traits
//! plus a recording event sink, so batch runs can be exercised without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use proxymate_core::testing::{fixtures, MockProbe, MockProcessRunner, RecordingSink};
//!
//! let probe = MockProbe::new();
//! probe.set_channels("b.mov", 6).await;
//! let runner = MockProcessRunner::new();
//! let orchestrator = fixtures::orchestrator(&probe, &runner);
//! ```

mod mock_probe;
mod mock_runner;
mod recording_sink;

pub use mock_probe::MockProbe;
pub use mock_runner::{MockProcessRunner, MockScript};
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::{MockProbe, MockProcessRunner};
    use crate::batch::BatchOrchestrator;
    use crate::config::{BatchConfig, ToolsConfig};

    /// Create a temp folder holding small placeholder files with the given names.
    pub fn media_folder(names: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for name in names {
            write_placeholder(&dir.path().join(name), name);
        }
        dir
    }

    /// Create an empty temp folder.
    pub fn empty_folder() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    /// Write a placeholder "media" file whose bytes identify it.
    pub fn write_placeholder(path: &Path, label: &str) {
        std::fs::write(path, format!("placeholder media for {}", label))
            .expect("Failed to write placeholder");
    }

    /// Orchestrator wired to the given mocks with default settings.
    pub fn orchestrator(probe: &MockProbe, runner: &MockProcessRunner) -> BatchOrchestrator {
        orchestrator_with_config(BatchConfig::default(), probe, runner)
    }

    /// Orchestrator wired to the given mocks.
    pub fn orchestrator_with_config(
        config: BatchConfig,
        probe: &MockProbe,
        runner: &MockProcessRunner,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(
            config,
            ToolsConfig::default(),
            Arc::new(probe.clone()),
            Arc::new(runner.clone()),
        )
    }
}
