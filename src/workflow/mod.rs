// src/workflow/mod.rs

//! The deploy workflow tree.
//!
//! ```text
//! sequence
//! ├─ build
//! ├─ announce "Start deploy"
//! ├─ parallel
//! │  └─ per target: log, copy..., remote command..., log
//! ├─ announce "Finished deploy"
//! └─ record deployment
//! ```
//!
//! Leaves come from a [`StepFactory`], so the shape can be exercised with
//! fake leaves while production uses [`ProductionSteps`].

use tracing::info;

use crate::task::{BoxedTask, LoggingTask, Parallel, Sequence};

pub mod steps;

pub use steps::ProductionSteps;

pub const START_TITLE: &str = "Start deploy";
pub const FINISH_TITLE: &str = "Finished deploy";

/// Source of the workflow's leaf tasks.
pub trait StepFactory {
    /// Local build run once before any copy.
    fn build(&self) -> BoxedTask;

    /// Chat notification with the given title.
    fn announce(&self, title: &str) -> BoxedTask;

    /// Artifact copies to `target`, in order.
    fn copy_steps(&self, target: &str) -> Vec<BoxedTask>;

    /// Commands run on `target` after the copies, in order.
    fn remote_steps(&self, target: &str) -> Vec<BoxedTask>;

    /// Monitoring deployment record.
    fn record_deployment(&self) -> BoxedTask;
}

/// Assemble the full workflow for `targets`.
pub fn build_workflow(steps: &dyn StepFactory, targets: &[String]) -> Sequence {
    let mut deploys = Parallel::new();
    for target in targets {
        deploys.push(deploy_to(steps, target));
    }

    Sequence::labeled(format!("deploy({})", targets.join(", ")))
        .with(steps.build())
        .with(steps.announce(START_TITLE))
        .with(deploys)
        .with(steps.announce(FINISH_TITLE))
        .with(steps.record_deployment())
}

/// Per-target sequence: copies then remote commands, bracketed by log lines.
pub fn deploy_to(steps: &dyn StepFactory, target: &str) -> Sequence {
    let mut seq = Sequence::labeled(format!("deploy to {target}"));

    let host = target.to_string();
    seq.push(LoggingTask::new(format!("start deploy to {target}"), move || {
        info!(host = %host, "start deploy");
    }));

    for step in steps.copy_steps(target) {
        seq.push(step);
    }
    for step in steps.remote_steps(target) {
        seq.push(step);
    }

    let host = target.to_string();
    seq.push(LoggingTask::new(format!("done deploy to {target}"), move || {
        info!(host = %host, "DONE: deploy");
    }));

    seq
}
