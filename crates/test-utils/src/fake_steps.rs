use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rollout::task::BoxedTask;
use rollout::workflow::StepFactory;

use crate::fake_task::{FakeTask, RunLog};

/// A `StepFactory` whose leaves are [`FakeTask`]s.
///
/// Leaf names:
/// - `build`
/// - `announce <title>`
/// - `copy <target> <n>` / `remote <target> <n>` (n counts from 0)
/// - `record`
pub struct FakeSteps {
    log: RunLog,
    copies_per_target: usize,
    remotes_per_target: usize,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl FakeSteps {
    pub fn new(log: &RunLog) -> Self {
        Self {
            log: log.clone(),
            copies_per_target: 2,
            remotes_per_target: 2,
            failing: HashSet::new(),
            delays: HashMap::new(),
        }
    }

    /// Make the leaf called `name` fail with `remote exit status 1`.
    pub fn fail_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn delay_on(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    fn leaf(&self, name: String) -> BoxedTask {
        let mut task = FakeTask::ok(&name, &self.log);
        if let Some(delay) = self.delays.get(&name) {
            task = task.delayed(*delay);
        }
        if self.failing.contains(&name) {
            task = task.failing("remote exit status 1");
        }
        Box::new(task)
    }
}

impl StepFactory for FakeSteps {
    fn build(&self) -> BoxedTask {
        self.leaf("build".to_string())
    }

    fn announce(&self, title: &str) -> BoxedTask {
        self.leaf(format!("announce {title}"))
    }

    fn copy_steps(&self, target: &str) -> Vec<BoxedTask> {
        (0..self.copies_per_target)
            .map(|n| self.leaf(format!("copy {target} {n}")))
            .collect()
    }

    fn remote_steps(&self, target: &str) -> Vec<BoxedTask> {
        (0..self.remotes_per_target)
            .map(|n| self.leaf(format!("remote {target} {n}")))
            .collect()
    }

    fn record_deployment(&self) -> BoxedTask {
        self.leaf("record".to_string())
    }
}
