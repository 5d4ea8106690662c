//! Tokio-backed process runner.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::command::CommandLine;
use super::error::ProcessError;
use super::traits::{ProcessExit, ProcessHandle, ProcessRunner};

/// Lines buffered between the pipe readers and the consumer.
const LINE_BUFFER: usize = 256;

/// Splits a byte stream into text lines on `\n` or `\r`.
///
/// ffmpeg redraws its status line with bare carriage returns, so `\r` has to
/// end a line too. Blank lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take_pending() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flushes a trailing line that had no terminator.
    pub fn finish(&mut self) -> Option<String> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<std::io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut splitter = LineSplitter::new();

    loop {
        let (lines, consumed) = match reader.fill_buf().await {
            Ok([]) => break,
            Ok(chunk) => (splitter.push(chunk), chunk.len()),
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };
        reader.consume(consumed);

        for line in lines {
            if tx.send(Ok(line)).await.is_err() {
                return;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        let _ = tx.send(Ok(line)).await;
    }
}

/// Process runner that spawns real children through tokio.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn name(&self) -> &str {
        "tokio"
    }

    async fn start(&self, command: &CommandLine) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::spawn(&command.program, e))?;

        debug!(pid = ?child.id(), program = ?command.program, "Spawned child process");

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx));
        }

        Ok(Box::new(TokioProcessHandle { child, lines: rx }))
    }

    async fn check_available(&self, program: &Path) -> Result<(), ProcessError> {
        let status = Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| ProcessError::spawn(program, e))?;

        if !status.success() {
            return Err(ProcessError::ToolFailed {
                program: program.to_path_buf(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

struct TokioProcessHandle {
    child: Child,
    lines: mpsc::Receiver<std::io::Result<String>>,
}

impl TokioProcessHandle {
    /// Sends the polite stop request: SIGTERM on unix, a kill elsewhere.
    fn request_stop(&mut self) -> Result<(), ProcessError> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let Some(pid) = self.child.id() else {
                return Ok(());
            };
            let raw = i32::try_from(pid).map_err(|_| {
                ProcessError::terminate_failed(Some(pid), "pid out of range")
            })?;
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(e) => Err(ProcessError::terminate_failed(Some(pid), e.to_string())),
            }
        }

        #[cfg(not(unix))]
        {
            let pid = self.child.id();
            self.child
                .start_kill()
                .map_err(|e| ProcessError::terminate_failed(pid, e.to_string()))
        }
    }
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn next_line(&mut self) -> Result<Option<String>, ProcessError> {
        match self.lines.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(ProcessError::Io(e)),
            None => Ok(None),
        }
    }

    async fn terminate(&mut self, grace: Duration) -> Result<ProcessExit, ProcessError> {
        let pid = self.child.id();

        if let Some(status) = self
            .child
            .try_wait()
            .map_err(|e| ProcessError::terminate_failed(pid, e.to_string()))?
        {
            return Ok(status.into());
        }

        if let Err(e) = self.request_stop() {
            warn!(?pid, error = %e, "Stop request failed, killing instead");
        } else {
            match timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(?pid, %status, "Child exited after stop request");
                    return Ok(status.into());
                }
                Ok(Err(e)) => return Err(ProcessError::terminate_failed(pid, e.to_string())),
                Err(_) => {
                    warn!(?pid, grace_ms = grace.as_millis() as u64, "Child ignored stop request, killing");
                }
            }
        }

        self.child
            .kill()
            .await
            .map_err(|e| ProcessError::terminate_failed(pid, e.to_string()))?;
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ProcessError::terminate_failed(pid, e.to_string()))?;
        Ok(status.into())
    }

    async fn wait(&mut self) -> Result<ProcessExit, ProcessError> {
        let status = self.child.wait().await?;
        Ok(status.into())
    }
}
