// src/remote.rs

//! Remote-host collaborator.
//!
//! Copying goes through rsync and remote commands through ssh; both are plain
//! [`CommandTask`]s, so failures surface the remote exit status.

use crate::config::{DeploySection, SyncEntry};
use crate::task::CommandTask;

/// `rsync <args> <from> <host>:<to>`
pub fn copy_task(deploy: &DeploySection, host: &str, entry: &SyncEntry) -> CommandTask {
    let mut args = deploy.rsync_args.clone();
    args.push(entry.from.clone());
    args.push(format!("{host}:{}", entry.to));

    CommandTask::new(deploy.rsync_program.clone(), args).grace_period(deploy.grace_period())
}

/// `ssh -n <host> <argv...>`
///
/// `-n` keeps ssh from reading our stdin while several hosts run in parallel.
pub fn exec_task(deploy: &DeploySection, host: &str, argv: &[String]) -> CommandTask {
    let args = ["-n".to_string(), host.to_string()]
        .into_iter()
        .chain(argv.iter().cloned());

    CommandTask::new(deploy.ssh_program.clone(), args).grace_period(deploy.grace_period())
}
