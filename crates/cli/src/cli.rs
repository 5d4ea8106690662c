use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use proxymate_core::{BatchEvent, Config, ConversionJob, OutputPolicy};

const DEFAULT_CONFIG_PATH: &str = "proxymate.toml";

#[derive(Parser, Debug)]
#[command(name = "proxymate")]
#[command(author, version, about = "Conform a folder of proxy files to one audio channel count")]
pub struct Cli {
    /// Folder holding the source proxies
    #[arg(short, long)]
    pub input: PathBuf,

    /// Folder receiving the conformed proxies
    #[arg(short, long)]
    pub output: PathBuf,

    /// Audio channel count every output file should have
    #[arg(short, long)]
    pub channels: u32,

    /// Path to config file (defaults to $PROXYMATE_CONFIG, then built-in settings)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// What to do when the output folder already holds files
    #[arg(long, value_enum)]
    pub output_policy: Option<PolicyArg>,

    /// File extension to process; may be repeated (replaces the configured list)
    #[arg(short, long = "extension")]
    pub extensions: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Write diagnostic logs to stderr as JSON
    #[arg(long)]
    pub log_json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Abort,
    Overwrite,
    SkipCheck,
}

impl From<PolicyArg> for OutputPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Abort => OutputPolicy::Abort,
            PolicyArg::Overwrite => OutputPolicy::Overwrite,
            PolicyArg::SkipCheck => OutputPolicy::SkipCheck,
        }
    }
}

impl Cli {
    /// Config file to load. A missing file means built-in settings.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(|| std::env::var_os("PROXYMATE_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Overlays command-line settings on the loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if !self.extensions.is_empty() {
            config.batch.allowed_extensions = self.extensions.clone();
        }
        if let Some(policy) = self.output_policy {
            config.batch.output_policy = policy.into();
        }
    }

    pub fn job(&self, config: &Config) -> ConversionJob {
        ConversionJob::new(&self.input, &self.output, self.channels)
            .with_output_policy(config.batch.output_policy)
    }
}

/// Where a rendered event should be printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Renders one event for the terminal.
pub fn render_event(event: &BatchEvent, json: bool) -> (Stream, String) {
    if json {
        let line = serde_json::to_string(event).unwrap_or_else(|e| {
            format!("{{\"type\":\"log\",\"line\":\"unserializable event: {}\"}}", e)
        });
        return (Stream::Stdout, line);
    }
    match event {
        BatchEvent::Progress { percent } => (Stream::Stderr, format!("Progress: {}%", percent)),
        BatchEvent::Log { line } => (Stream::Stdout, line.clone()),
        BatchEvent::Completed {
            processed,
            cancelled: true,
        } => (
            Stream::Stderr,
            format!("Cancelled after {} file(s)", processed),
        ),
        BatchEvent::Completed { processed, .. } => {
            (Stream::Stderr, format!("Completed: {} file(s)", processed))
        }
    }
}
