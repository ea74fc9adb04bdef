// src/task/sequence.rs

//! Ordered, fail-fast group.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{BoxedTask, Task, TaskFuture, TaskOutput};
use crate::errors::{Result, RolloutError};

/// Runs children strictly in insertion order.
///
/// The first failing child ends the group: later children never run and the
/// child's error is returned unchanged. Captured stdout of each successful
/// child is logged here rather than inside the child.
#[derive(Default)]
pub struct Sequence {
    label: Option<String>,
    tasks: Vec<BoxedTask>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence whose [`Task::name`] is `label` instead of the child count.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            tasks: Vec::new(),
        }
    }

    pub fn push(&mut self, task: impl Task + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Builder-style [`Sequence::push`].
    pub fn with(mut self, task: impl Task + 'static) -> Self {
        self.push(task);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<TaskOutput> {
        for (index, child) in self.tasks.iter().enumerate() {
            let name = child.name();

            if cancel.is_cancelled() {
                info!(task = %name, index, "run cancelled; not starting task");
                return Err(RolloutError::Cancelled { task: name });
            }

            info!(task = %name, index, "start task");
            match child.run(cancel.clone()).await {
                Ok(output) => match output.stdout.as_deref().map(str::trim) {
                    Some(stdout) if !stdout.is_empty() => {
                        info!(task = %name, index, output = %stdout, "done task");
                    }
                    _ => info!(task = %name, index, "done task"),
                },
                Err(err) => {
                    error!(task = %name, index, error = %err, "task failed");
                    return Err(err);
                }
            }
        }

        Ok(TaskOutput::empty())
    }
}

impl Task for Sequence {
    fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("sequence({} tasks)", self.tasks.len()),
        }
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }

    fn children(&self) -> Vec<&dyn Task> {
        self.tasks.iter().map(|t| t.as_ref() as &dyn Task).collect()
    }
}
