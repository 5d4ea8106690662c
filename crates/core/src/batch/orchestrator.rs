//! Batch orchestrator implementation.
//!
//! Drives one run through `Listing -> (Probing -> Planning -> Executing)* ->
//! Completed | Cancelled`, reporting through an [`EventSink`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{BatchConfig, Config, OutputPolicy, ToolsConfig};
use crate::events::EventSink;
use crate::planner::{plan, FileAction};
use crate::probe::{ChannelProbe, FfprobeProbe};
use crate::process::{
    build_transcode_command, ProcessError, ProcessHandle, ProcessRunner, TokioProcessRunner,
};

use super::cancel::CancelHandle;
use super::copy::copy_preserving_times;
use super::error::BatchError;
use super::folders::{clear_output_dir, dir_has_entries, list_media_files, normalize_extensions};
use super::types::{
    ConversionJob, MediaFile, RunOutcome, RunPhase, RunState, MAX_CHANNELS, MIN_CHANNELS,
};

/// How often a silent ffmpeg is checked for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// How a single file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Marks the orchestrator busy for as long as it lives.
struct ActiveRun {
    active: Arc<AtomicBool>,
    current_cancel: Arc<Mutex<Option<CancelHandle>>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.current_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.active.store(false, Ordering::SeqCst);
    }
}

/// A run executing on its own task.
pub struct RunHandle {
    run_id: String,
    cancel: CancelHandle,
    task: JoinHandle<Result<RunOutcome, BatchError>>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Request cancellation of this run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to end.
    pub async fn wait(self) -> Result<RunOutcome, BatchError> {
        self.task
            .await
            .map_err(|e| BatchError::TaskFailed(e.to_string()))?
    }
}

/// Converts folders of proxies to a target audio channel count.
///
/// One orchestrator runs at most one batch at a time; starting another while
/// one is active fails with [`BatchError::AlreadyRunning`].
pub struct BatchOrchestrator {
    config: BatchConfig,
    tools: ToolsConfig,
    allowed_extensions: Vec<String>,
    probe: Arc<dyn ChannelProbe>,
    runner: Arc<dyn ProcessRunner>,

    // Runtime state
    active: Arc<AtomicBool>,
    current_cancel: Arc<Mutex<Option<CancelHandle>>>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: BatchConfig,
        tools: ToolsConfig,
        probe: Arc<dyn ChannelProbe>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let allowed_extensions = normalize_extensions(&config.allowed_extensions);
        Self {
            config,
            tools,
            allowed_extensions,
            probe,
            runner,
            active: Arc::new(AtomicBool::new(false)),
            current_cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an orchestrator that uses the real ffprobe and ffmpeg from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.batch.clone(),
            config.tools.clone(),
            Arc::new(FfprobeProbe::new(config.tools.ffprobe_path.clone())),
            Arc::new(TokioProcessRunner::new()),
        )
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Validates `job` and starts it on a new task.
    ///
    /// Configuration problems are returned here and no run is started.
    pub async fn start_run(
        self: &Arc<Self>,
        job: ConversionJob,
        sink: Arc<dyn EventSink>,
    ) -> Result<RunHandle, BatchError> {
        let cancel = CancelHandle::new();
        let guard = self.claim(cancel.clone())?;
        self.preflight(&job).await?;

        let this = Arc::clone(self);
        let run_id = job.run_id.clone();
        let task_cancel = cancel.clone();
        let span = info_span!("batch_run", run_id = %job.run_id);
        let task = tokio::spawn(
            async move {
                let result = this.execute(&job, sink.as_ref(), &task_cancel).await;
                drop(guard);
                result
            }
            .instrument(span),
        );

        Ok(RunHandle {
            run_id,
            cancel,
            task,
        })
    }

    /// Runs `job` to the end on the current task.
    pub async fn run(
        &self,
        job: &ConversionJob,
        sink: &dyn EventSink,
        cancel: &CancelHandle,
    ) -> Result<RunOutcome, BatchError> {
        let _guard = self.claim(cancel.clone())?;
        self.preflight(job).await?;
        let span = info_span!("batch_run", run_id = %job.run_id);
        self.execute(job, sink, cancel).instrument(span).await
    }

    /// Cancels the active run, if any. Safe to call repeatedly.
    pub fn cancel_run(&self) {
        let current = self
            .current_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(handle) => {
                if handle.cancel() {
                    info!("Cancellation requested");
                }
            }
            None => debug!("Cancel requested with no active run"),
        }
    }

    fn claim(&self, cancel: CancelHandle) -> Result<ActiveRun, BatchError> {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("Batch run already in progress");
            return Err(BatchError::AlreadyRunning);
        }
        *self
            .current_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel);
        Ok(ActiveRun {
            active: Arc::clone(&self.active),
            current_cancel: Arc::clone(&self.current_cancel),
        })
    }

    /// Checks everything that must hold before any file is touched.
    async fn preflight(&self, job: &ConversionJob) -> Result<(), BatchError> {
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&job.target_channels) {
            return Err(BatchError::InvalidChannelCount {
                value: job.target_channels,
                min: MIN_CHANNELS,
                max: MAX_CHANNELS,
            });
        }

        let input = canonical_dir(&job.input_dir).await.ok_or_else(|| {
            BatchError::InputDirMissing {
                path: job.input_dir.clone(),
            }
        })?;
        let output = canonical_dir(&job.output_dir).await.ok_or_else(|| {
            BatchError::OutputDirMissing {
                path: job.output_dir.clone(),
            }
        })?;
        if input == output {
            return Err(BatchError::SameDirectory { path: input });
        }

        self.probe
            .validate()
            .await
            .map_err(|e| BatchError::tool_unavailable("ffprobe", e))?;
        self.runner
            .check_available(&self.tools.ffmpeg_path)
            .await
            .map_err(|e| BatchError::tool_unavailable("ffmpeg", e))?;

        self.apply_output_policy(job).await
    }

    async fn apply_output_policy(&self, job: &ConversionJob) -> Result<(), BatchError> {
        let output = &job.output_dir;
        match job.output_policy {
            OutputPolicy::SkipCheck => Ok(()),
            OutputPolicy::Abort => {
                let occupied = dir_has_entries(output).await.map_err(|e| {
                    BatchError::OutputCleanup {
                        path: output.clone(),
                        source: e,
                    }
                })?;
                if occupied {
                    return Err(BatchError::OutputNotEmpty {
                        path: output.clone(),
                    });
                }
                Ok(())
            }
            OutputPolicy::Overwrite => {
                let removed = clear_output_dir(output).await.map_err(|e| {
                    BatchError::OutputCleanup {
                        path: output.clone(),
                        source: e,
                    }
                })?;
                if removed > 0 {
                    info!(removed, ?output, "Cleared output folder");
                }
                Ok(())
            }
        }
    }

    /// Runs the listed files and always finishes with exactly one completion event.
    async fn execute(
        &self,
        job: &ConversionJob,
        sink: &dyn EventSink,
        cancel: &CancelHandle,
    ) -> Result<RunOutcome, BatchError> {
        let mut state = RunState::new();
        info!(
            input = ?job.input_dir,
            output = ?job.output_dir,
            target_channels = job.target_channels,
            "Batch run started"
        );

        match self.process_files(job, sink, cancel, &mut state).await {
            Ok(()) => {
                let cancelled = state.phase == RunPhase::Cancelled;
                sink.on_complete(state.processed, cancelled);
                info!(
                    processed = state.processed,
                    total = state.total,
                    cancelled,
                    "Batch run finished"
                );
                Ok(state.outcome(&job.run_id))
            }
            Err(e) => {
                error!(error = %e, "Batch run aborted");
                sink.on_log(&format!("Run aborted: {}", e));
                sink.on_complete(state.processed, cancel.is_cancelled());
                Err(e)
            }
        }
    }

    async fn process_files(
        &self,
        job: &ConversionJob,
        sink: &dyn EventSink,
        cancel: &CancelHandle,
        state: &mut RunState,
    ) -> Result<(), BatchError> {
        state.enter(RunPhase::Listing);
        let files = list_media_files(&job.input_dir, &job.output_dir, &self.allowed_extensions)
            .await
            .map_err(|e| BatchError::Listing {
                path: job.input_dir.clone(),
                source: e,
            })?;
        state.total = files.len();
        sink.on_log(&format!("Found {} file(s) to process", files.len()));

        for (index, file) in files.iter().enumerate() {
            state.current_index = index;
            if cancel.is_cancelled() {
                self.mark_cancelled(sink, state);
                return Ok(());
            }

            let outcome = self.process_file(job, file, sink, cancel, state).await?;
            if outcome == FileOutcome::Cancelled {
                self.mark_cancelled(sink, state);
                return Ok(());
            }

            let percent = state.percent_after(index);
            state.last_percent = Some(percent);
            sink.on_progress(percent);
        }

        state.enter(RunPhase::Completed);
        if state.last_percent != Some(100) {
            state.last_percent = Some(100);
            sink.on_progress(100);
        }
        sink.on_log(&format!(
            "Done: {} of {} file(s) processed",
            state.processed, state.total
        ));
        Ok(())
    }

    /// Probes, plans and executes one file. Per-file failures are logged, not returned.
    async fn process_file(
        &self,
        job: &ConversionJob,
        file: &MediaFile,
        sink: &dyn EventSink,
        cancel: &CancelHandle,
        state: &mut RunState,
    ) -> Result<FileOutcome, BatchError> {
        let name = file.display_name();

        state.enter(RunPhase::Probing);
        let channels = match self.probe.probe_channels(&file.path).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(file = %name, error = %e, "Probe failed, skipping file");
                sink.on_log(&format!("Failed to analyze {}: {}", name, e));
                return Ok(FileOutcome::Failed);
            }
        };
        debug!(file = %name, channels, "Probed file");

        state.enter(RunPhase::Planning);
        let action = plan(&file.path, &file.output_path, channels, job.target_channels);

        state.enter(RunPhase::Executing);
        let outcome = match action {
            FileAction::Copy { src, dst } => {
                sink.on_log(&format!("Copying {} (already {} channels)", name, channels));
                match copy_preserving_times(&src, &dst).await {
                    Ok(bytes) => {
                        debug!(file = %name, bytes, "Copied file");
                        FileOutcome::Completed
                    }
                    Err(e) => {
                        warn!(file = %name, error = %e, "Copy failed, skipping file");
                        sink.on_log(&format!("Failed to copy {}: {}", name, e));
                        FileOutcome::Failed
                    }
                }
            }
            FileAction::Transcode {
                src,
                dst,
                target_channels,
            } => match self
                .transcode(&name, &src, &dst, target_channels, sink, cancel)
                .await
            {
                Ok(outcome) => outcome,
                // A child that may still be alive ends the run
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(file = %name, error = %e, "Transcode failed, skipping file");
                    sink.on_log(&format!("ffmpeg failed for {}: {}", name, e));
                    self.discard_partial(&dst, sink).await;
                    FileOutcome::Failed
                }
            },
        };

        if outcome == FileOutcome::Completed {
            state.processed += 1;
        }
        Ok(outcome)
    }

    /// Runs ffmpeg for one file, forwarding its output and watching for cancellation.
    ///
    /// Non-fatal errors leave no child behind; the caller reports them as a
    /// failed file.
    async fn transcode(
        &self,
        name: &str,
        src: &Path,
        dst: &Path,
        target_channels: u32,
        sink: &dyn EventSink,
        cancel: &CancelHandle,
    ) -> Result<FileOutcome, ProcessError> {
        if cancel.is_cancelled() {
            return Ok(FileOutcome::Cancelled);
        }

        let command = build_transcode_command(&self.tools, src, dst, target_channels);
        sink.on_log(&format!("Processing {} -> {}ch", name, target_channels));
        sink.on_log(&command.to_string());

        let mut handle = match self.runner.start(&command).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to start ffmpeg");
                sink.on_log(&format!("Failed to start ffmpeg for {}: {}", name, e));
                return Ok(FileOutcome::Failed);
            }
        };
        let grace = Duration::from_millis(self.config.terminate_grace_ms);

        loop {
            if cancel.is_cancelled() {
                return self
                    .stop_for_cancel(handle.as_mut(), name, dst, grace, sink)
                    .await;
            }
            match timeout(CANCEL_POLL, handle.next_line()).await {
                // Quiet child; go around and look at the cancel flag again
                Err(_) => continue,
                Ok(Ok(Some(line))) => sink.on_log(&line),
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    warn!(file = %name, error = %e, "Lost ffmpeg output");
                    sink.on_log(&format!("Lost ffmpeg output for {}: {}", name, e));
                    break;
                }
            }
        }

        // The output stream is gone but the child may still be running
        let waited = loop {
            if cancel.is_cancelled() {
                return self
                    .stop_for_cancel(handle.as_mut(), name, dst, grace, sink)
                    .await;
            }
            if let Ok(result) = timeout(CANCEL_POLL, handle.wait()).await {
                break result;
            }
        };

        match waited {
            Ok(exit) if exit.success() => Ok(FileOutcome::Completed),
            Ok(exit) => {
                warn!(file = %name, %exit, "ffmpeg failed");
                sink.on_log(&format!("ffmpeg failed for {} ({})", name, exit));
                self.discard_partial(dst, sink).await;
                Ok(FileOutcome::Failed)
            }
            Err(e) => {
                // Exit status unknown: make sure the child is gone before moving on
                warn!(file = %name, error = %e, "Failed to wait for ffmpeg");
                handle.terminate(grace).await?;
                Err(e)
            }
        }
    }

    async fn stop_for_cancel(
        &self,
        handle: &mut dyn ProcessHandle,
        name: &str,
        dst: &Path,
        grace: Duration,
        sink: &dyn EventSink,
    ) -> Result<FileOutcome, ProcessError> {
        let exit = handle.terminate(grace).await?;
        info!(file = %name, %exit, "ffmpeg terminated on cancellation");
        sink.on_log("FFmpeg process terminated.");
        self.discard_partial(dst, sink).await;
        Ok(FileOutcome::Cancelled)
    }

    async fn discard_partial(&self, dst: &Path, sink: &dyn EventSink) {
        if !self.config.remove_partial_output {
            return;
        }
        match tokio::fs::remove_file(dst).await {
            Ok(()) => sink.on_log(&format!("Removed partial output {}", dst.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = ?dst, error = %e, "Failed to remove partial output");
                sink.on_log(&format!(
                    "Failed to remove partial output {}: {}",
                    dst.display(),
                    e
                ));
            }
        }
    }

    fn mark_cancelled(&self, sink: &dyn EventSink, state: &mut RunState) {
        state.enter(RunPhase::Cancelled);
        info!(
            index = state.current_index,
            processed = state.processed,
            "Batch run cancelled"
        );
        sink.on_log("Processing cancelled by user.");
    }
}

async fn canonical_dir(path: &Path) -> Option<std::path::PathBuf> {
    let canonical = tokio::fs::canonicalize(path).await.ok()?;
    let metadata = tokio::fs::metadata(&canonical).await.ok()?;
    metadata.is_dir().then_some(canonical)
}
