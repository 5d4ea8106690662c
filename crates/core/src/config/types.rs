use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// External tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary used for transcoding.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to the ffprobe binary used for channel probing.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Audio encoder passed to `-c:a` when transcoding.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Additional ffmpeg arguments, inserted just before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            audio_codec: default_audio_codec(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

/// Batch run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// File extensions picked up from the input folder (case-insensitive, dot optional).
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    /// How long a cancelled ffmpeg gets to exit after SIGTERM before it is killed.
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,

    /// Delete the output file of a cancelled or failed transcode.
    #[serde(default)]
    pub remove_partial_output: bool,

    /// What to do when the output folder already has files in it.
    #[serde(default)]
    pub output_policy: OutputPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
            terminate_grace_ms: default_terminate_grace_ms(),
            remove_partial_output: false,
            output_policy: OutputPolicy::default(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "mov".to_string()]
}

fn default_terminate_grace_ms() -> u64 {
    5000
}

/// Pre-run decision for an output folder that is not empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPolicy {
    /// Refuse to start the run.
    Abort,
    /// Delete the files already in the output folder, then run.
    Overwrite,
    /// Run without looking at the output folder.
    #[default]
    SkipCheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tools.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.tools.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.tools.audio_codec, "aac");
        assert_eq!(config.batch.allowed_extensions, vec!["mp4", "mov"]);
        assert_eq!(config.batch.terminate_grace_ms, 5000);
        assert!(!config.batch.remove_partial_output);
        assert_eq!(config.batch.output_policy, OutputPolicy::SkipCheck);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
ffprobe_path = "/opt/ffmpeg/bin/ffprobe"
audio_codec = "libfdk_aac"
extra_ffmpeg_args = ["-hide_banner"]

[batch]
allowed_extensions = ["mp4", "mov", "mxf"]
terminate_grace_ms = 250
remove_partial_output = true
output_policy = "abort"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.tools.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.tools.audio_codec, "libfdk_aac");
        assert_eq!(config.tools.extra_ffmpeg_args, vec!["-hide_banner"]);
        assert_eq!(config.batch.allowed_extensions.len(), 3);
        assert_eq!(config.batch.terminate_grace_ms, 250);
        assert!(config.batch.remove_partial_output);
        assert_eq!(config.batch.output_policy, OutputPolicy::Abort);
    }

    #[test]
    fn test_unknown_output_policy_fails() {
        let toml = r#"
[batch]
output_policy = "ask"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.batch.terminate_grace_ms, config.batch.terminate_grace_ms);
        assert_eq!(parsed.batch.output_policy, OutputPolicy::SkipCheck);
    }
}
