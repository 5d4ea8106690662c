//! Mock channel probe for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::probe::{ChannelProbe, ProbeError};

#[derive(Debug, Clone)]
enum ProbeBehavior {
    Channels(u32),
    NoAudio,
    Fail(String),
}

/// Mock implementation of the ChannelProbe trait.
///
/// Results are keyed by file name, so tests can configure them before the
/// temp folders exist. Unknown files report the default channel count.
#[derive(Debug, Clone)]
pub struct MockProbe {
    results: Arc<RwLock<HashMap<String, ProbeBehavior>>>,
    default_channels: Arc<RwLock<u32>>,
    probed: Arc<RwLock<Vec<PathBuf>>>,
    unavailable: Arc<AtomicBool>,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    /// Create a new mock probe reporting stereo for every file.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            default_channels: Arc::new(RwLock::new(2)),
            probed: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report `channels` for the file named `file_name`.
    pub async fn set_channels(&self, file_name: &str, channels: u32) {
        self.results
            .write()
            .await
            .insert(file_name.to_string(), ProbeBehavior::Channels(channels));
    }

    /// Make probing `file_name` fail as if ffprobe exited with an error.
    pub async fn set_failure(&self, file_name: &str, stderr: &str) {
        self.results
            .write()
            .await
            .insert(file_name.to_string(), ProbeBehavior::Fail(stderr.to_string()));
    }

    /// Make `file_name` look like it has no audio stream.
    pub async fn set_no_audio(&self, file_name: &str) {
        self.results
            .write()
            .await
            .insert(file_name.to_string(), ProbeBehavior::NoAudio);
    }

    /// Set the channel count reported for unconfigured files.
    pub async fn set_default_channels(&self, channels: u32) {
        *self.default_channels.write().await = channels;
    }

    /// Make `validate` report a missing ffprobe.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every path probed so far, in order.
    pub async fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.read().await.clone()
    }

    /// File names probed so far, in order.
    pub async fn probed_names(&self) -> Vec<String> {
        self.probed
            .read()
            .await
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

#[async_trait]
impl ChannelProbe for MockProbe {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_channels(&self, path: &Path) -> Result<u32, ProbeError> {
        self.probed.write().await.push(path.to_path_buf());

        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.results.read().await.get(&key) {
            Some(ProbeBehavior::Channels(channels)) => Ok(*channels),
            Some(ProbeBehavior::NoAudio) => Err(ProbeError::NoAudioStream),
            Some(ProbeBehavior::Fail(stderr)) => Err(ProbeError::tool_failed(Some(1), stderr.clone())),
            None => Ok(*self.default_channels.read().await),
        }
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProbeError::ToolNotFound {
                path: PathBuf::from("ffprobe"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_channels() {
        let probe = MockProbe::new();
        assert_eq!(probe.probe_channels(Path::new("/in/a.mp4")).await.unwrap(), 2);
        probe.set_default_channels(6).await;
        assert_eq!(probe.probe_channels(Path::new("/in/b.mp4")).await.unwrap(), 6);
        assert_eq!(probe.probed_names().await, vec!["a.mp4", "b.mp4"]);
    }

    #[tokio::test]
    async fn test_configured_results() {
        let probe = MockProbe::new();
        probe.set_channels("surround.mov", 6).await;
        probe.set_failure("broken.mp4", "Invalid data found").await;
        probe.set_no_audio("silent.mp4").await;

        assert_eq!(
            probe.probe_channels(Path::new("/x/surround.mov")).await.unwrap(),
            6
        );
        assert!(matches!(
            probe.probe_channels(Path::new("/x/broken.mp4")).await,
            Err(ProbeError::ToolFailed { .. })
        ));
        assert!(matches!(
            probe.probe_channels(Path::new("/x/silent.mp4")).await,
            Err(ProbeError::NoAudioStream)
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let probe = MockProbe::new();
        assert!(probe.validate().await.is_ok());
        probe.set_unavailable(true);
        assert!(probe.validate().await.unwrap_err().is_tool_missing());
    }
}
