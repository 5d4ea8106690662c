//! FFprobe-based channel probe.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::ProbeError;
use super::traits::ChannelProbe;

/// Channel probe backed by the ffprobe binary.
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
}

impl FfprobeProbe {
    /// Creates a probe that runs the ffprobe binary at `ffprobe_path`.
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Creates a probe that resolves `ffprobe` from `PATH`.
    pub fn with_defaults() -> Self {
        Self::new("ffprobe")
    }

    /// Builds the ffprobe arguments that print only the first audio stream's channel count.
    fn build_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=channels",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_os_string());
        args
    }

    fn map_spawn_error(&self, e: std::io::Error) -> ProbeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProbeError::ToolNotFound {
                path: self.ffprobe_path.clone(),
            }
        } else {
            ProbeError::Io(e)
        }
    }
}

/// Parses ffprobe's unwrapped, key-less output into a channel count.
///
/// Empty output means ffprobe found no audio stream. Anything other than a
/// single integer token is rejected.
pub fn parse_channel_output(output: &str) -> Result<u32, ProbeError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::NoAudioStream);
    }

    let mut tokens = trimmed.split_whitespace();
    let token = tokens
        .next()
        .ok_or_else(|| ProbeError::invalid_output(trimmed))?;
    if tokens.next().is_some() {
        return Err(ProbeError::invalid_output(trimmed));
    }

    token
        .parse::<u32>()
        .map_err(|_| ProbeError::invalid_output(trimmed))
}

#[async_trait]
impl ChannelProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe_channels(&self, path: &Path) -> Result<u32, ProbeError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ProbeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let args = Self::build_args(path);
        debug!(ffprobe = ?self.ffprobe_path, ?args, "Probing audio channels");

        let output = Command::new(&self.ffprobe_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(ProbeError::tool_failed(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        parse_channel_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(ProbeError::tool_failed(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_selects_first_audio_stream() {
        let args = FfprobeProbe::build_args(Path::new("/proxies/A001.mov"));
        assert_eq!(args[..4], ["-v", "error", "-select_streams", "a:0"]);
        assert!(args.iter().any(|a| a == "stream=channels"));
        assert!(args.iter().any(|a| a == "default=noprint_wrappers=1:nokey=1"));
        assert_eq!(args.last().unwrap(), "/proxies/A001.mov");
    }

    #[test]
    fn test_parse_channel_output() {
        assert_eq!(parse_channel_output("2\n").unwrap(), 2);
        assert_eq!(parse_channel_output("  6  ").unwrap(), 6);
    }

    #[test]
    fn test_parse_empty_output_is_no_audio() {
        assert!(matches!(
            parse_channel_output(""),
            Err(ProbeError::NoAudioStream)
        ));
        assert!(matches!(
            parse_channel_output("\n\n"),
            Err(ProbeError::NoAudioStream)
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_channel_output("N/A"),
            Err(ProbeError::InvalidOutput { .. })
        ));
        assert!(matches!(
            parse_channel_output("-2"),
            Err(ProbeError::InvalidOutput { .. })
        ));
        assert!(matches!(
            parse_channel_output("2\n6"),
            Err(ProbeError::InvalidOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_input() {
        let probe = FfprobeProbe::with_defaults();
        let err = probe
            .probe_channels(Path::new("/nonexistent/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_probe_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"not really a movie").unwrap();

        let probe = FfprobeProbe::new("/nonexistent/bin/ffprobe");
        let err = probe.probe_channels(&clip).await.unwrap_err();
        assert!(err.is_tool_missing());

        let err = probe.validate().await.unwrap_err();
        assert!(err.is_tool_missing());
    }
}
