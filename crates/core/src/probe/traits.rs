//! Trait definitions for the probe module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ProbeError;

/// Something that can report the audio channel count of a media file.
#[async_trait]
pub trait ChannelProbe: Send + Sync {
    /// Returns the name of this probe implementation.
    fn name(&self) -> &str;

    /// Returns the channel count of the first audio stream in `path`.
    async fn probe_channels(&self, path: &Path) -> Result<u32, ProbeError>;

    /// Validates that the probe is properly configured and ready.
    async fn validate(&self) -> Result<(), ProbeError>;
}
