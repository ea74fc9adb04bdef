// src/task/logging.rs

//! Progress markers inside a sequence.

use std::fmt;

use tokio_util::sync::CancellationToken;

use super::{Task, TaskFuture, TaskOutput};

type Callback = Box<dyn Fn() + Send + Sync>;

/// Leaf task wrapping a side-effecting callback, typically a `tracing` call.
///
/// Never fails and ignores cancellation; nothing the workflow depends on
/// should go through it.
pub struct LoggingTask {
    label: String,
    callback: Callback,
}

impl LoggingTask {
    pub fn new<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for LoggingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Task for LoggingTask {
    fn name(&self) -> String {
        format!("log({})", self.label)
    }

    fn run(&self, _cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(async move {
            (self.callback)();
            Ok(TaskOutput::empty())
        })
    }
}
