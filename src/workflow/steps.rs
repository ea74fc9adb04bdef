// src/workflow/steps.rs

//! Production leaves: real processes and real webhooks.

use crate::config::ConfigFile;
use crate::notify::newrelic::DeploymentRecord;
use crate::notify::slack::deploy_message;
use crate::notify::{DeployInfo, PostSlack, RecordDeployment};
use crate::remote;
use crate::task::{BoxedTask, CommandTask};

use super::StepFactory;

pub struct ProductionSteps<'a> {
    cfg: &'a ConfigFile,
    info: DeployInfo,
    client: reqwest::Client,
}

impl<'a> ProductionSteps<'a> {
    pub fn new(cfg: &'a ConfigFile, info: DeployInfo, client: reqwest::Client) -> Self {
        Self { cfg, info, client }
    }

    pub fn info(&self) -> &DeployInfo {
        &self.info
    }
}

impl StepFactory for ProductionSteps<'_> {
    fn build(&self) -> BoxedTask {
        let build = &self.cfg.build;
        let mut task = CommandTask::new(build.program.clone(), build.args.iter().cloned())
            .grace_period(self.cfg.deploy.grace_period());
        if let Some(dir) = &build.dir {
            task = task.current_dir(dir);
        }
        Box::new(task)
    }

    fn announce(&self, title: &str) -> BoxedTask {
        let message = deploy_message(self.cfg, title, &self.info);
        Box::new(PostSlack::new(
            self.client.clone(),
            &self.cfg.slack,
            title,
            message,
        ))
    }

    fn copy_steps(&self, target: &str) -> Vec<BoxedTask> {
        let deploy = &self.cfg.deploy;
        deploy
            .sync
            .iter()
            .map(|entry| Box::new(remote::copy_task(deploy, target, entry)) as BoxedTask)
            .collect()
    }

    fn remote_steps(&self, target: &str) -> Vec<BoxedTask> {
        let deploy = &self.cfg.deploy;
        deploy
            .remote
            .iter()
            .map(|argv| Box::new(remote::exec_task(deploy, target, argv)) as BoxedTask)
            .collect()
    }

    fn record_deployment(&self) -> BoxedTask {
        Box::new(RecordDeployment::new(
            self.client.clone(),
            &self.cfg.newrelic,
            DeploymentRecord::from_info(&self.info),
        ))
    }
}
