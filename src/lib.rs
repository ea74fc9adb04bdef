// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod git;
pub mod logging;
pub mod notify;
pub mod remote;
pub mod task;
pub mod workflow;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::git::GitRepo;
use crate::notify::{invoking_user, DeployInfo};
use crate::task::{render_tree, Task};
use crate::workflow::{build_workflow, ProductionSteps};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + env overrides)
/// - git metadata for the revision being deployed
/// - the workflow tree
/// - Ctrl-C handling (cancels the root token)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::load(args.config.as_deref()).context("loading configuration")?;

    let revision = GitRepo::current()
        .revision(&cfg.git.remote)
        .await
        .context("reading revision metadata")?;

    let info = DeployInfo {
        user: invoking_user(),
        revision,
        targets: args.targets.clone(),
    };
    info!(
        user = %info.user,
        revision = %info.revision.descriptive,
        branch = %info.revision.branch,
        targets = ?info.targets,
        "preparing deploy"
    );

    let steps = ProductionSteps::new(&cfg, info, reqwest::Client::new());
    let workflow = build_workflow(&steps, &args.targets);

    if args.dry_run {
        print_dry_run(&workflow);
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Ctrl-C → cancel every running task.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; cancelling deploy");
            cancel.cancel();
        });
    }

    workflow.run(cancel).await?;

    info!("deploy finished");
    Ok(())
}

/// Print the assembled workflow without running it.
fn print_dry_run(workflow: &dyn Task) {
    println!("rollout dry-run");
    println!();
    print!("{}", render_tree(workflow));

    debug!("dry-run complete (no execution)");
}
