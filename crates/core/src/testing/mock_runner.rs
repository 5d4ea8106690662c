//! Mock process runner for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::process::{CommandLine, ProcessError, ProcessExit, ProcessHandle, ProcessRunner};

const MOCK_PID: u32 = 4242;

/// Scripted behavior of one mock ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Lines emitted on the merged output stream.
    pub lines: Vec<String>,
    /// Exit code reported by `wait`; `None` reports death by signal.
    pub exit_code: Option<i32>,
    /// Write a small file at the output path when the process exits successfully.
    pub write_output: bool,
    /// Refuse to die on `terminate`.
    pub fail_terminate: bool,
    /// Fail at spawn time.
    pub fail_spawn: bool,
    /// Keep running after the output ends, until terminated.
    pub keep_running: bool,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            lines: vec![
                "Input #0, mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                "frame=  120 fps=0.0 q=-1.0 size=    1024kB time=00:00:05.00".to_string(),
                "video:1000kB audio:80kB subtitle:0kB".to_string(),
            ],
            exit_code: Some(0),
            write_output: true,
            fail_terminate: false,
            fail_spawn: false,
            keep_running: false,
        }
    }
}

impl MockScript {
    /// A run that prints `lines` and succeeds.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A run that exits with `code` and produces no output file.
    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            write_output: false,
            ..Default::default()
        }
    }

    /// A program that cannot be spawned.
    pub fn spawn_failure() -> Self {
        Self {
            fail_spawn: true,
            ..Default::default()
        }
    }
}

/// Mock implementation of the ProcessRunner trait.
///
/// Scripts are keyed by the file name of the `-i` input. The mock tracks how
/// many children are alive so tests can assert none were left behind.
#[derive(Debug, Clone)]
pub struct MockProcessRunner {
    scripts: Arc<RwLock<HashMap<String, MockScript>>>,
    default_script: Arc<RwLock<MockScript>>,
    started: Arc<RwLock<Vec<CommandLine>>>,
    terminated: Arc<RwLock<Vec<CommandLine>>>,
    live: Arc<AtomicUsize>,
    missing: Arc<AtomicBool>,
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessRunner {
    /// Create a new mock runner where every process succeeds.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            default_script: Arc::new(RwLock::new(MockScript::default())),
            started: Arc::new(RwLock::new(Vec::new())),
            terminated: Arc::new(RwLock::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
            missing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `script` when transcoding the input named `file_name`.
    pub async fn set_script(&self, file_name: &str, script: MockScript) {
        self.scripts
            .write()
            .await
            .insert(file_name.to_string(), script);
    }

    /// Use `script` for inputs without their own script.
    pub async fn set_default_script(&self, script: MockScript) {
        *self.default_script.write().await = script;
    }

    /// Make `check_available` report a missing program.
    pub fn set_missing(&self, missing: bool) {
        self.missing.store(missing, Ordering::SeqCst);
    }

    /// Every command started so far.
    pub async fn started_commands(&self) -> Vec<CommandLine> {
        self.started.read().await.clone()
    }

    /// Input file names of every command started so far.
    pub async fn started_inputs(&self) -> Vec<String> {
        self.started
            .read()
            .await
            .iter()
            .filter_map(input_name)
            .collect()
    }

    /// Every command that was asked to terminate.
    pub async fn terminated_commands(&self) -> Vec<CommandLine> {
        self.terminated.read().await.clone()
    }

    /// Children started but not yet reaped.
    pub fn live_processes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

fn input_name(command: &CommandLine) -> Option<String> {
    let position = command.args.iter().position(|a| a == "-i")?;
    let input = command.args.get(position + 1)?;
    Path::new(input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self, command: &CommandLine) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let script = match input_name(command) {
            Some(name) => self.scripts.read().await.get(&name).cloned(),
            None => None,
        };
        let script = match script {
            Some(script) => script,
            None => self.default_script.read().await.clone(),
        };

        if script.fail_spawn {
            return Err(ProcessError::spawn(
                &command.program,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }

        self.started.write().await.push(command.clone());
        self.live.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockHandle {
            command: command.clone(),
            output_path: command.args.last().map(PathBuf::from),
            lines: script.lines.iter().cloned().collect(),
            script,
            terminated: Arc::clone(&self.terminated),
            live: Arc::clone(&self.live),
            reaped: false,
        }))
    }

    async fn check_available(&self, program: &Path) -> Result<(), ProcessError> {
        if self.missing.load(Ordering::SeqCst) {
            return Err(ProcessError::NotFound {
                program: program.to_path_buf(),
            });
        }
        Ok(())
    }
}

struct MockHandle {
    command: CommandLine,
    output_path: Option<PathBuf>,
    lines: VecDeque<String>,
    script: MockScript,
    terminated: Arc<RwLock<Vec<CommandLine>>>,
    live: Arc<AtomicUsize>,
    reaped: bool,
}

impl MockHandle {
    fn reap(&mut self) {
        if !self.reaped {
            self.reaped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ProcessHandle for MockHandle {
    fn id(&self) -> Option<u32> {
        (!self.reaped).then_some(MOCK_PID)
    }

    async fn next_line(&mut self) -> Result<Option<String>, ProcessError> {
        tokio::task::yield_now().await;
        Ok(self.lines.pop_front())
    }

    async fn terminate(&mut self, _grace: Duration) -> Result<ProcessExit, ProcessError> {
        self.terminated.write().await.push(self.command.clone());
        if self.script.fail_terminate {
            return Err(ProcessError::terminate_failed(
                Some(MOCK_PID),
                "mock process refused to exit",
            ));
        }
        self.lines.clear();
        self.reap();
        Ok(ProcessExit::signalled())
    }

    async fn wait(&mut self) -> Result<ProcessExit, ProcessError> {
        if self.script.keep_running && !self.reaped {
            std::future::pending::<()>().await;
        }
        let exit = ProcessExit {
            code: self.script.exit_code,
        };
        if !self.reaped {
            self.reap();
            if exit.success() && self.script.write_output {
                if let Some(path) = &self.output_path {
                    tokio::fs::write(path, b"transcoded by mock").await?;
                }
            }
        }
        Ok(exit)
    }
}
