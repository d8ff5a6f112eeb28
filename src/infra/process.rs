//! External-process runner.
//!
//! Every external program (git, the generator, the differs) goes through a
//! [`CommandRunner`] so that exit-status policy, stderr capture and deadlines
//! are applied uniformly, and so tests can substitute a recording fake.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

const SOURCE: &str = "infra::process";

pub(crate) const METRIC_COMMAND_FAILURE: &str = "revdoc_command_failure_total";

/// A fully described invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Non-zero exit codes the caller treats as success.
    pub benign_exit_codes: Vec<i32>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            benign_exit_codes: Vec::new(),
        }
    }

    /// Build a spec from an argv vector whose first element is the program.
    pub fn from_argv(argv: &[String], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), cwd).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn allow_exit_code(mut self, code: i32) -> Self {
        self.benign_exit_codes.push(code);
        self
    }

    fn accepts(&self, code: Option<i32>) -> bool {
        match code {
            Some(0) => true,
            Some(code) => self.benign_exit_codes.contains(&code),
            None => false,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: Bytes,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    #[error("failed to start `{command}` in {cwd}: {source}")]
    Spawn {
        command: String,
        cwd: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("`{command}` failed with exit status {}\n{stderr}", exit_code_label(.exit_code))]
    Exit {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("`{command}` did not finish within {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output. Exit statuses other than zero and
    /// the command's benign codes are reported as [`ProcessError::Exit`].
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands as real child processes, each in its own process group with
/// a deadline. On expiry the whole group is killed.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let started_at = Instant::now();
        let rendered = spec.to_string();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|err| {
            record_failure(&spec.program, "spawn");
            ProcessError::Spawn {
                command: rendered.clone(),
                cwd: spec.cwd.display().to_string(),
                source: Arc::new(err),
            }
        })?;
        let pid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                record_failure(&spec.program, "wait");
                return Err(ProcessError::Spawn {
                    command: rendered,
                    cwd: spec.cwd.display().to_string(),
                    source: Arc::new(err),
                });
            }
            Err(_) => {
                kill_process_group(pid);
                record_failure(&spec.program, "timeout");
                warn!(
                    target = SOURCE,
                    op = "process::run",
                    result = "timeout",
                    command = %rendered,
                    timeout_secs = self.timeout.as_secs(),
                    "External command timed out; process group killed"
                );
                return Err(ProcessError::Timeout {
                    command: rendered,
                    after: self.timeout,
                });
            }
        };

        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        if !spec.accepts(exit_code) {
            record_failure(&spec.program, "exit");
            debug!(
                target = SOURCE,
                op = "process::run",
                result = "error",
                command = %rendered,
                cwd = %spec.cwd.display(),
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                elapsed_ms,
                "External command failed"
            );
            return Err(ProcessError::Exit {
                command: rendered,
                exit_code,
                stderr,
            });
        }

        debug!(
            target = SOURCE,
            op = "process::run",
            result = "ok",
            command = %rendered,
            cwd = %spec.cwd.display(),
            exit_code = exit_code.map(i64::from).unwrap_or(-1),
            elapsed_ms,
            "External command finished"
        );

        Ok(CommandOutput {
            exit_code,
            stdout: Bytes::from(output.stdout),
            stderr,
        })
    }
}

fn record_failure(program: &str, kind: &'static str) {
    counter!(METRIC_COMMAND_FAILURE, "program" => program.to_string(), "kind" => kind).increment(1);
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg only delivers a signal. The child was spawned with
    // process_group(0), so its pid is the id of a group we created.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            target = SOURCE,
            op = "process::kill_process_group",
            pgid,
            error = %io::Error::last_os_error(),
            "Process group already gone"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
