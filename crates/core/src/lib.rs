pub mod batch;
pub mod config;
pub mod events;
pub mod planner;
pub mod probe;
pub mod process;
pub mod testing;

pub use batch::{
    BatchError, BatchOrchestrator, CancelHandle, ConversionJob, MediaFile, RunHandle, RunOutcome,
    RunPhase,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, BatchConfig,
    Config, ConfigError, OutputPolicy, ToolsConfig,
};
pub use events::{BatchEvent, ChannelSink, EventSink};
pub use planner::{plan, FileAction};
pub use probe::{ChannelProbe, FfprobeProbe, ProbeError};
pub use process::{CommandLine, ProcessError, ProcessRunner, TokioProcessRunner};
