//! Audio channel probing.
//!
//! A [`ChannelProbe`] answers one question about a media file: how many
//! channels its first audio stream carries. The production implementation,
//! [`FfprobeProbe`], shells out to ffprobe and reads a single bare integer
//! from its output.

mod error;
mod ffprobe;
mod traits;

pub use error::ProbeError;
pub use ffprobe::{parse_channel_output, FfprobeProbe};
pub use traits::ChannelProbe;
