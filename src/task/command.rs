// src/task/command.rs

//! Leaf task that runs one external process to completion.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Task, TaskFuture, TaskOutput};
use crate::errors::{Result, RolloutError};

/// Default time a cancelled process gets between SIGINT and SIGKILL.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Runs `program args...` and fails on a non-zero exit status.
///
/// - stdout is captured and handed back in [`TaskOutput::stdout`]; the
///   enclosing sequence decides whether to log it.
/// - stderr is logged line by line at `debug` and attached to
///   [`RolloutError::CommandFailed`].
/// - On cancellation the process receives SIGINT, then gets
///   `grace_period` to exit before being killed.
#[derive(Debug, Clone)]
pub struct CommandTask {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    grace_period: Duration,
}

impl CommandTask {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Build from an argv vector (`argv[0]` is the program).
    ///
    /// Returns `None` for an empty vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The literal command line, with whitespace-containing args quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("{part:?}")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<TaskOutput> {
        let command_line = self.command_line();

        if cancel.is_cancelled() {
            return Err(RolloutError::Cancelled { task: command_line });
        }

        debug!(cmd = %command_line, "spawning process");

        let mut child = self.command().spawn().map_err(|source| RolloutError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout_reader = capture_stdout(child.stdout.take());
        let stderr_reader = capture_stderr(child.stderr.take(), command_line.clone());

        // Either the process exits on its own (normal case), or the run is
        // cancelled and we ask it to stop.
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                info!(cmd = %command_line, "cancellation requested; interrupting process");
                interrupt(&mut child, self.grace_period, &command_line).await;
                stdout_reader.abort();
                stderr_reader.abort();
                return Err(RolloutError::Cancelled { task: command_line });
            }
        };

        // A background job can inherit the pipes and keep them open after the
        // process itself exited.
        let stdout_abort = stdout_reader.abort_handle();
        let stderr_abort = stderr_reader.abort_handle();
        let (stdout, stderr) = tokio::select! {
            (stdout, stderr) = async { tokio::join!(stdout_reader, stderr_reader) } => {
                (stdout.unwrap_or_default(), stderr.unwrap_or_default())
            }
            _ = cancel.cancelled() => {
                info!(cmd = %command_line, "cancellation requested while draining output");
                stdout_abort.abort();
                stderr_abort.abort();
                return Err(RolloutError::Cancelled { task: command_line });
            }
        };

        finish(command_line, status, stdout, stderr)
    }
}

impl Task for CommandTask {
    fn name(&self) -> String {
        self.command_line()
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }
}

fn finish(
    command: String,
    status: ExitStatus,
    stdout: String,
    stderr: String,
) -> Result<TaskOutput> {
    debug!(cmd = %command, exit_code = ?status.code(), success = status.success(), "process exited");

    if status.success() {
        Ok(TaskOutput::with_stdout(stdout))
    } else {
        Err(RolloutError::CommandFailed {
            command,
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }
}

fn capture_stdout(stdout: Option<ChildStdout>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stdout) = stdout {
            let _ = stdout.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

// Always consume stderr so the pipe never fills up and blocks the child.
fn capture_stderr(stderr: Option<ChildStderr>, command: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut collected = String::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(cmd = %command, "stderr: {}", line);
                collected.push_str(&line);
                collected.push('\n');
            }
        }
        collected
    })
}

/// SIGINT, wait up to `grace`, then SIGKILL.
async fn interrupt(child: &mut Child, grace: Duration, command: &str) {
    if send_interrupt(child) {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(cmd = %command, exit_code = ?status.code(), "process exited after interrupt");
                return;
            }
            Ok(Err(e)) => {
                warn!(cmd = %command, error = %e, "failed waiting for interrupted process");
            }
            Err(_) => {
                warn!(cmd = %command, grace_secs = grace.as_secs_f64(), "grace period elapsed; killing process");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(cmd = %command, error = %e, "failed to kill process on cancellation");
    }
}

#[cfg(unix)]
fn send_interrupt(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        // Already reaped.
        return false;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: `pid` is our own un-reaped child, so it cannot have been recycled.
    unsafe { libc::kill(pid, libc::SIGINT) == 0 }
}

#[cfg(not(unix))]
fn send_interrupt(_child: &Child) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_args_with_spaces() {
        let task = CommandTask::new("rsync", ["-e", "ssh", "--rsync-path", "sudo -u app -i rsync"]);
        assert_eq!(
            task.command_line(),
            r#"rsync -e ssh --rsync-path "sudo -u app -i rsync""#
        );
    }

    #[test]
    fn from_argv_splits_program() {
        let argv = vec!["sudo".to_string(), "systemctl".to_string(), "status".to_string()];
        let task = CommandTask::from_argv(&argv).unwrap();
        assert_eq!(task.program(), "sudo");
        assert_eq!(task.args(), ["systemctl", "status"]);
        assert!(CommandTask::from_argv(&[]).is_none());
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = CommandTask::new("definitely-not-a-real-program", Vec::<String>::new())
            .run(cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "{err}");
    }
}
