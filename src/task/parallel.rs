// src/task/parallel.rs

//! Concurrent fan-out / join group.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Task, TaskFuture, TaskOutput};
use crate::errors::{Result, RolloutError};

/// Runs every child concurrently on its own Tokio task.
///
/// - All children are spawned before any is awaited.
/// - The first error to arrive is the group's result and cancels a scope
///   derived from the caller's token, so siblings can stop early without
///   cancelling anything outside this group.
/// - `run` only returns once every child has finished; nothing is detached.
/// - A panicking child is reported as [`RolloutError::TaskPanicked`] naming it.
#[derive(Default)]
pub struct Parallel {
    tasks: Vec<Arc<dyn Task>>,
}

impl Parallel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: impl Task + 'static) {
        self.tasks.push(Arc::new(task));
    }

    /// Builder-style [`Parallel::push`].
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
        let scope = cancel.child_token();
        let mut set = JoinSet::new();
        let mut names: HashMap<Id, String> = HashMap::with_capacity(self.tasks.len());

        for child in &self.tasks {
            let child = Arc::clone(child);
            let token = scope.clone();
            let name = child.name();
            let handle = set.spawn(async move { child.run(token).await });
            names.insert(handle.id(), name);
        }

        let mut first_error: Option<RolloutError> = None;

        while let Some(joined) = set.join_next_with_id().await {
            let (name, result) = match joined {
                Ok((id, result)) => (names.remove(&id).unwrap_or_default(), result),
                Err(join_err) => {
                    let name = names.remove(&join_err.id()).unwrap_or_default();
                    let err = RolloutError::TaskPanicked(format!("{name}: {join_err}"));
                    (name, Err(err))
                }
            };

            match result {
                Ok(_) => debug!(task = %name, "parallel child finished"),
                Err(err) if first_error.is_none() => {
                    error!(task = %name, error = %err, "parallel child failed; cancelling siblings");
                    scope.cancel();
                    first_error = Some(err);
                }
                Err(err) => {
                    info!(task = %name, error = %err, "parallel child stopped after earlier failure");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(TaskOutput::empty()),
        }
    }
}

impl Task for Parallel {
    fn name(&self) -> String {
        let names: Vec<String> = self.tasks.iter().map(|t| t.name()).collect();
        format!("parallel({})", names.join(", "))
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }

    fn children(&self) -> Vec<&dyn Task> {
        self.tasks.iter().map(|t| t.as_ref()).collect()
    }
}
