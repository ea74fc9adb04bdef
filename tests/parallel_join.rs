use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rollout::errors::RolloutError;
use rollout::task::{Parallel, Sequence, Task, TaskFuture, TaskOutput};
use rollout_test_utils::fake_task::{FakeTask, RunLog};
use rollout_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn succeeds_when_every_child_succeeds() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(FakeTask::ok("a", &log).delayed(Duration::from_millis(30)))
        .with(FakeTask::ok("b", &log))
        .with(FakeTask::ok("c", &log).delayed(Duration::from_millis(10)));

    with_timeout(group.run(CancellationToken::new())).await?;

    for name in ["a", "b", "c"] {
        assert!(log.finished(name), "{name} should have finished");
    }
    Ok(())
}

#[tokio::test]
async fn starts_all_children_before_any_finishes() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(FakeTask::ok("slow-1", &log).delayed(Duration::from_millis(50)))
        .with(FakeTask::ok("slow-2", &log).delayed(Duration::from_millis(50)));

    with_timeout(group.run(CancellationToken::new())).await?;

    let entries = log.entries();
    let first_end = entries.iter().position(|e| e.starts_with("end")).unwrap();
    let starts_before_end = entries[..first_end]
        .iter()
        .filter(|e| e.starts_with("start"))
        .count();
    assert_eq!(starts_before_end, 2, "{entries:?}");
    Ok(())
}

#[tokio::test]
async fn reports_failing_child_and_lets_finished_sibling_complete() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(FakeTask::ok("a", &log))
        .with(FakeTask::ok("b", &log).delayed(Duration::from_millis(20)).failing("exit 1"));

    let err = with_timeout(group.run(CancellationToken::new()))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, RolloutError::CommandFailed { command, .. } if command == "b"),
        "{err}"
    );
    assert!(log.finished("a"));
    assert!(log.finished("b"));
    Ok(())
}

#[tokio::test]
async fn failure_cancels_siblings_and_join_waits_for_them() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(FakeTask::ok("waiter", &log).until_cancelled())
        .with(FakeTask::ok("fails", &log).delayed(Duration::from_millis(10)).failing("nope"));

    let err = with_timeout(group.run(CancellationToken::new()))
        .await
        .unwrap_err();

    // The failure wins over the sibling's later `Cancelled`.
    assert!(!err.is_cancelled(), "{err}");
    // The sibling saw the cancellation and finished before run returned.
    assert!(log.finished("waiter"));
    assert!(log.recorded_before("end fails", "end waiter"));
    Ok(())
}

#[tokio::test]
async fn failure_does_not_cancel_the_callers_token() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new().with(FakeTask::ok("x", &log).failing("bad"));

    let root = CancellationToken::new();
    assert!(group.run(root.clone()).await.is_err());
    assert!(!root.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn root_cancellation_reaches_nested_children() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(Sequence::new().with(FakeTask::ok("deep", &log).until_cancelled()))
        .with(FakeTask::ok("flat", &log).until_cancelled());

    let root = CancellationToken::new();
    let canceller = {
        let root = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            root.cancel();
        })
    };

    let err = with_timeout(group.run(root)).await.unwrap_err();
    canceller.await?;

    assert!(err.is_cancelled(), "{err}");
    assert!(log.finished("deep"));
    assert!(log.finished("flat"));
    Ok(())
}

#[tokio::test]
async fn empty_group_succeeds_and_names_children() -> TestResult {
    let log = RunLog::new();
    assert!(Parallel::new().run(CancellationToken::new()).await.is_ok());

    let group = Parallel::new()
        .with(FakeTask::ok("a", &log))
        .with(FakeTask::ok("b", &log));
    assert_eq!(group.name(), "parallel(a, b)");
    Ok(())
}

struct Exploding;

impl Task for Exploding {
    fn name(&self) -> String {
        "exploding".to_string()
    }

    fn run(&self, _cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(explode())
    }
}

async fn explode() -> rollout::errors::Result<TaskOutput> {
    panic!("boom")
}

#[tokio::test]
async fn panicking_child_is_reported_by_name() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let group = Parallel::new()
        .with(FakeTask::ok("steady", &log))
        .with(Exploding);

    let err = with_timeout(group.run(CancellationToken::new()))
        .await
        .unwrap_err();

    match &err {
        RolloutError::TaskPanicked(message) => {
            assert!(message.starts_with("exploding: "), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.finished("steady"));
    Ok(())
}
