//! External process execution.
//!
//! The batch run drives ffmpeg through the [`ProcessRunner`] and
//! [`ProcessHandle`] traits so that tests can substitute a scripted process.
//! [`TokioProcessRunner`] is the real implementation: it merges stdout and
//! stderr into a single line stream and terminates gracefully (SIGTERM, grace
//! period, then kill) so that no child outlives the run.

mod command;
mod error;
mod tokio_runner;
mod traits;

pub use command::{build_transcode_command, CommandLine};
pub use error::ProcessError;
pub use tokio_runner::{LineSplitter, TokioProcessRunner};
pub use traits::{ProcessExit, ProcessHandle, ProcessRunner};
