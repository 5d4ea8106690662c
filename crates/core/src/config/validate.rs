use super::{types::Config, ConfigError};
use crate::batch::normalize_extensions;

/// Validate configuration
/// Currently validates:
/// - At least one non-empty input extension
/// - Tool paths and audio codec are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.batch.allowed_extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "batch.allowed_extensions cannot be empty".to_string(),
        ));
    }

    // Judge entries exactly as the batch run will see them
    let normalized = normalize_extensions(&config.batch.allowed_extensions);
    if normalized.len() != config.batch.allowed_extensions.len() {
        return Err(ConfigError::ValidationError(
            "batch.allowed_extensions cannot contain blank entries".to_string(),
        ));
    }

    if config.tools.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.tools.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.ffprobe_path cannot be empty".to_string(),
        ));
    }

    if config.tools.audio_codec.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.audio_codec cannot be empty".to_string(),
        ));
    }

    Ok(())
}
