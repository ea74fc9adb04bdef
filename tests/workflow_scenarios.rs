use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rollout::errors::RolloutError;
use rollout::task::{render_tree, Task};
use rollout::workflow::build_workflow;
use rollout_test_utils::fake_steps::FakeSteps;
use rollout_test_utils::fake_task::RunLog;
use rollout_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn targets(hosts: &[&str]) -> Vec<String> {
    hosts.iter().map(|h| h.to_string()).collect()
}

#[tokio::test]
async fn successful_deploy_runs_every_step_in_order() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let steps = FakeSteps::new(&log);
    let workflow = build_workflow(&steps, &targets(&["host-a", "host-b"]));

    with_timeout(workflow.run(CancellationToken::new())).await?;

    let before = |a: &str, b: &str| log.recorded_before(a, b);

    assert!(before("end build", "start announce Start deploy"));
    for host in ["host-a", "host-b"] {
        assert!(before("end announce Start deploy", &format!("start copy {host} 0")));
        assert!(before(&format!("end copy {host} 1"), &format!("start remote {host} 0")));
        assert!(before(&format!("end remote {host} 1"), "start announce Finished deploy"));
    }
    assert!(before("end announce Finished deploy", "start record"));
    assert!(log.finished("record"));
    Ok(())
}

#[tokio::test]
async fn failing_host_aborts_remaining_workflow_but_other_host_completes() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    // host-a is still inside its last remote step when host-b fails; fake
    // steps ignore cancellation once started, so it runs to completion.
    let steps = FakeSteps::new(&log)
        .delay_on("remote host-a 1", Duration::from_millis(80))
        .delay_on("remote host-b 0", Duration::from_millis(20))
        .fail_on("remote host-b 0");
    let workflow = build_workflow(&steps, &targets(&["host-a", "host-b"]));

    let err = with_timeout(workflow.run(CancellationToken::new()))
        .await
        .unwrap_err();

    match &err {
        RolloutError::CommandFailed { command, code, .. } => {
            assert_eq!(command, "remote host-b 0");
            assert_eq!(*code, Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(log.finished("copy host-a 1"));
    assert!(log.finished("remote host-a 1"));
    assert!(!log.started("remote host-b 1"));
    assert!(!log.started("announce Finished deploy"));
    assert!(!log.started("record"));
    Ok(())
}

#[tokio::test]
async fn failing_build_deploys_nothing() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let steps = FakeSteps::new(&log).fail_on("build");
    let workflow = build_workflow(&steps, &targets(&["host-a"]));

    let err = workflow.run(CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("build"), "{err}");
    assert_eq!(log.entries(), ["start build", "end build"]);
    Ok(())
}

#[tokio::test]
async fn cancelled_run_stops_before_notifications() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let steps = FakeSteps::new(&log).delay_on("copy host-a 0", Duration::from_millis(50));
    let workflow = build_workflow(&steps, &targets(&["host-a"]));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let err = with_timeout(workflow.run(cancel)).await.unwrap_err();

    assert!(err.is_cancelled(), "{err}");
    assert!(log.finished("copy host-a 0"));
    assert!(!log.started("copy host-a 1"));
    assert!(!log.started("record"));
    Ok(())
}

#[test]
fn tree_lists_per_target_sequences() {
    let log = RunLog::new();
    let steps = FakeSteps::new(&log);
    let workflow = build_workflow(&steps, &targets(&["h1"]));

    let tree = render_tree(&workflow);
    let expected = "\
- deploy(h1)
  - build
  - announce Start deploy
  - parallel(deploy to h1)
    - deploy to h1
      - log(start deploy to h1)
      - copy h1 0
      - copy h1 1
      - remote h1 0
      - remote h1 1
      - log(done deploy to h1)
  - announce Finished deploy
  - record
";
    assert_eq!(tree, expected);
    assert!(log.entries().is_empty(), "rendering must not run anything");
}
