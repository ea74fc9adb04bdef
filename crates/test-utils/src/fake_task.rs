use std::sync::{Arc, Mutex};
use std::time::Duration;

use rollout::errors::RolloutError;
use rollout::task::{Task, TaskFuture, TaskOutput};
use tokio_util::sync::CancellationToken;

/// Shared, ordered record of what fake tasks did.
///
/// Entries look like `"start build"` / `"end build"`.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn started(&self, name: &str) -> bool {
        self.contains(&format!("start {name}"))
    }

    pub fn finished(&self, name: &str) -> bool {
        self.contains(&format!("end {name}"))
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }

    /// Position of `entry` in the log, if present.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }

    /// True when `first` was recorded before `second`.
    ///
    /// Panics if either entry is missing, so an absent step can't pass as
    /// "earlier".
    pub fn recorded_before(&self, first: &str, second: &str) -> bool {
        let at = |entry: &str| {
            self.position(entry).unwrap_or_else(|| {
                panic!("{entry:?} missing from run log: {:?}", self.entries())
            })
        };
        at(first) < at(second)
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Succeed,
    Fail(String),
    /// Block until cancelled, then report `Cancelled`.
    UntilCancelled,
}

/// A task that records its lifecycle in a [`RunLog`] instead of doing IO.
#[derive(Debug, Clone)]
pub struct FakeTask {
    name: String,
    log: RunLog,
    delay: Duration,
    outcome: Outcome,
    stdout: Option<String>,
}

impl FakeTask {
    /// Succeeds immediately.
    pub fn ok(name: &str, log: &RunLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            delay: Duration::ZERO,
            outcome: Outcome::Succeed,
            stdout: None,
        }
    }

    /// Fails with `CommandFailed { command: name, code: 1, stderr: message }`.
    pub fn failing(mut self, message: &str) -> Self {
        self.outcome = Outcome::Fail(message.to_string());
        self
    }

    /// Waits for cancellation, then returns `Cancelled`.
    pub fn until_cancelled(mut self) -> Self {
        self.outcome = Outcome::UntilCancelled;
        self
    }

    /// Sleep before finishing. The sleep ignores cancellation, like a step
    /// that is already past the point of no return.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = Some(stdout.to_string());
        self
    }

    /// The error a failing fake produces, for comparisons in tests.
    pub fn expected_error(name: &str, message: &str) -> RolloutError {
        RolloutError::CommandFailed {
            command: name.to_string(),
            code: Some(1),
            stderr: message.to_string(),
        }
    }

    async fn execute(&self, cancel: CancellationToken) -> rollout::errors::Result<TaskOutput> {
        self.log.record(format!("start {}", self.name));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match &self.outcome {
            Outcome::Succeed => Ok(TaskOutput {
                stdout: self.stdout.clone(),
            }),
            Outcome::Fail(message) => Err(Self::expected_error(&self.name, message)),
            Outcome::UntilCancelled => {
                cancel.cancelled().await;
                Err(RolloutError::Cancelled {
                    task: self.name.clone(),
                })
            }
        };

        self.log.record(format!("end {}", self.name));
        result
    }
}

impl Task for FakeTask {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }
}
