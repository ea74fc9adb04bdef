// src/task/mod.rs

//! Task composition core.
//!
//! A deploy is expressed as a tree of [`Task`]s:
//! - [`CommandTask`] runs one external process.
//! - [`LoggingTask`] runs a side-effecting callback and never fails.
//! - [`Sequence`] runs children in order and stops at the first failure.
//! - [`Parallel`] runs children concurrently, cancels the rest on the first
//!   failure and waits for every child before returning.
//!
//! Notification leaves live in [`crate::notify`] and implement the same trait.
//!
//! Every `run` receives a [`CancellationToken`]. Leaves must return promptly
//! with [`RolloutError::Cancelled`](crate::errors::RolloutError::Cancelled)
//! once it fires.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;

pub mod command;
pub mod logging;
pub mod parallel;
pub mod sequence;

pub use command::CommandTask;
pub use logging::LoggingTask;
pub use parallel::Parallel;
pub use sequence::Sequence;

/// What a successful task hands back to its enclosing group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Captured standard output, for tasks that run a process.
    pub stdout: Option<String>,
}

impl TaskOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: Some(stdout.into()),
        }
    }
}

/// Future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskOutput>> + Send + 'a>>;

/// Owned, type-erased task.
pub type BoxedTask = Box<dyn Task>;

/// A named, cancelable unit of work.
///
/// `run` performs the task's side effects; it is not idempotent, and callers
/// run each instance at most once.
pub trait Task: Send + Sync {
    /// Human-readable identifier used in logs. Not required to be unique.
    fn name(&self) -> String;

    /// Execute the task until it finishes, fails, or `cancel` fires.
    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_>;

    /// Direct children, for composite tasks. Used to render the workflow tree.
    fn children(&self) -> Vec<&dyn Task> {
        Vec::new()
    }
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        (**self).run(cancel)
    }

    fn children(&self) -> Vec<&dyn Task> {
        (**self).children()
    }
}

/// Render `task` and its descendants as an indented outline, one task per line.
pub fn render_tree(task: &dyn Task) -> String {
    let mut out = String::new();
    render_into(task, 0, &mut out);
    out
}

fn render_into(task: &dyn Task, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str("- ");
    out.push_str(&task.name());
    out.push('\n');
    for child in task.children() {
        render_into(child, depth + 1, out);
    }
}
