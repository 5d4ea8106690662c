//! Trait definitions for the process module.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::command::CommandLine;
use super::error::ProcessError;

/// Exit state of a finished child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or `None` when the child was ended by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signalled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// A started child process.
///
/// Output is consumed through [`next_line`](ProcessHandle::next_line), a finite
/// sequence that cannot be restarted: once it yields `None` it keeps doing so.
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, if the child is still known to the runtime.
    fn id(&self) -> Option<u32>;

    /// Next line of merged stdout/stderr, or `None` once both streams are closed.
    async fn next_line(&mut self) -> Result<Option<String>, ProcessError>;

    /// Asks the child to stop, escalating to a kill after `grace`, and reaps it.
    ///
    /// Returns only once the child has exited. An error here means the child
    /// may still be alive.
    async fn terminate(&mut self, grace: Duration) -> Result<ProcessExit, ProcessError>;

    /// Waits for the child to exit.
    async fn wait(&mut self) -> Result<ProcessExit, ProcessError>;
}

/// Launches external programs.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Returns the name of this runner implementation.
    fn name(&self) -> &str;

    /// Starts `command` with stdin closed and output captured.
    async fn start(&self, command: &CommandLine) -> Result<Box<dyn ProcessHandle>, ProcessError>;

    /// Checks that `program` can be executed (runs `program -version`).
    async fn check_available(&self, program: &Path) -> Result<(), ProcessError>;
}
