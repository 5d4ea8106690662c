//! Command lines for external tools.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;

/// A program plus its arguments.
///
/// Arguments are kept as OS strings so file names that are not valid UTF-8
/// reach the tool unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

fn quote(part: &str) -> String {
    if part.is_empty() || part.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", part.replace('"', "\\\""))
    } else {
        part.to_string()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// Builds the ffmpeg command that remuxes video untouched and re-encodes audio
/// to `target_channels`.
pub fn build_transcode_command(
    tools: &ToolsConfig,
    input_path: &Path,
    output_path: &Path,
    target_channels: u32,
) -> CommandLine {
    CommandLine::new(&tools.ffmpeg_path)
        // Never wait on a prompt, overwrite whatever is at the output path
        .args(["-nostdin", "-y"])
        .arg("-i")
        .arg(input_path)
        .args(["-c:v", "copy"])
        .arg("-ac")
        .arg(target_channels.to_string())
        .arg("-c:a")
        .arg(tools.audio_codec.clone())
        .args(tools.extra_ffmpeg_args.iter().cloned())
        .arg(output_path)
}
