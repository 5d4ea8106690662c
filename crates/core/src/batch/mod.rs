//! Batch conversion of a folder of proxy files.
//!
//! The [`BatchOrchestrator`] lists the input folder, probes each file's audio,
//! copies files that already match the target channel count and runs ffmpeg
//! on the rest. Files are handled strictly one at a time on a single worker
//! task. A run can be cancelled from any thread through a [`CancelHandle`];
//! the flag is checked before each file and after each line of ffmpeg output.

mod cancel;
mod copy;
mod error;
mod folders;
mod orchestrator;
mod types;

pub use cancel::CancelHandle;
pub use copy::copy_preserving_times;
pub use error::BatchError;
pub use folders::{clear_output_dir, has_allowed_extension, list_media_files, normalize_extensions};
pub use orchestrator::{BatchOrchestrator, RunHandle};
pub use types::{ConversionJob, MediaFile, RunOutcome, RunPhase, MAX_CHANNELS, MIN_CHANNELS};
