//! Supervisor lifecycle, console routing and task ordering.

use std::sync::{Arc, Mutex};

use minecloud_wrapper::models::Status;
use minecloud_wrapper::supervisor::task::{StepFuture, Task, TaskStep};
use minecloud_wrapper::AppError;

use tokio::io::AsyncWriteExt;

use super::test_helpers::{Harness, STEP_TIMEOUT};

/// Task that records every line it sees and finishes on `until`.
struct Recorder {
    name: &'static str,
    until: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn new(name: &'static str, until: &'static str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let task = Self {
            name,
            until,
            seen: Arc::clone(&seen),
        };
        (task, seen)
    }
}

impl Task for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async { TaskStep::Continue })
    }

    fn on_output<'a>(&'a mut self, line: &'a str) -> StepFuture<'a> {
        Box::pin(async move {
            self.seen.lock().expect("lock").push(line.to_owned());
            if line == self.until {
                TaskStep::Done
            } else {
                TaskStep::Continue
            }
        })
    }
}

/// Task that finishes during init without observing any output.
struct Instant;

impl Task for Instant {
    fn name(&self) -> &'static str {
        "Instant"
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async { TaskStep::Done })
    }

    fn on_output<'a>(&'a mut self, _line: &'a str) -> StepFuture<'a> {
        Box::pin(async { TaskStep::Continue })
    }
}

// ── Status ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_moves_from_starting_to_running_to_stopped() {
    let mut h = Harness::new();
    assert_eq!(h.supervisor.status(), Status::Starting);

    for banner in [
        "[12:00:00] [main/INFO]: Environment: authHost='https://authserver.mojang.com'",
        "[12:00:00] [Server thread/INFO]: Starting minecraft server version 1.20.4",
        "[12:00:01] [Server thread/INFO]: Loading properties",
        "[12:00:01] [Server thread/INFO]: Preparing level \"world\"",
        "[12:00:02] [Worker-Main-1/INFO]: Preparing spawn area: 83%",
    ] {
        let routed = h.emit(banner).await;
        assert_eq!(routed.owner, Some("ReadyWaitTask"));
        assert_eq!(h.supervisor.status(), Status::Starting, "after {banner:?}");
    }

    h.ready().await;
    assert_eq!(h.supervisor.status(), Status::Running);

    h.emit("[12:00:05] [Server thread/INFO]: Done (9.9s)! again").await;
    assert_eq!(h.supervisor.status(), Status::Running);

    h.terminate().await;
    assert_eq!(h.supervisor.status(), Status::Stopped);
}

#[tokio::test]
async fn exit_before_ready_goes_straight_to_stopped() {
    let mut h = Harness::new();
    h.emit("[12:00:00] [Server thread/ERROR]: Failed to bind port").await;

    h.terminate().await;
    assert_eq!(h.supervisor.status(), Status::Stopped);
}

// ── Console routing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn lines_before_ready_belong_to_ready_wait_task() {
    let mut h = Harness::new();
    let routed = h.emit("[12:00:00] [Server thread/INFO]: Starting minecraft server").await;
    assert_eq!(routed.owner, Some("ReadyWaitTask"));
}

#[tokio::test]
async fn lines_with_no_current_task_are_unowned() {
    let mut h = Harness::new();
    h.ready().await;

    let routed = h.emit("[12:01:00] [Server thread/INFO]: Steve joined the game").await;
    assert_eq!(routed.owner, None);
    assert_eq!(routed.text, "[12:01:00] [Server thread/INFO]: Steve joined the game");
}

#[tokio::test]
async fn stderr_lines_are_routed_like_stdout() {
    let mut h = Harness::new();
    h.ready().await;

    let (task, seen) = Recorder::new("Recorder", "err-done");
    h.supervisor.execute(Box::new(task)).await.expect("admitted");

    let routed = h.emit_stderr("err-done").await;
    assert_eq!(routed.owner, Some("Recorder"));
    assert_eq!(*seen.lock().expect("lock"), vec!["err-done".to_owned()]);
}

#[tokio::test]
async fn ready_marker_only_needs_to_be_a_substring() {
    let mut h = Harness::new();
    h.emit("[08:15:42] [Server thread/INFO]: Done (27.148s)! For help, type \"help\"")
        .await;
    assert_eq!(h.supervisor.status(), Status::Running);
}

// ── Ordering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_submitted_while_starting_waits_for_ready() {
    let mut h = Harness::new();

    let (task, seen) = Recorder::new("Recorder", "r-done");
    let supervisor = h.supervisor.clone();
    let admitted = tokio::spawn(async move { supervisor.execute(Box::new(task)).await });

    h.emit("still starting").await;
    assert!(!admitted.is_finished(), "task admitted before the server was ready");

    h.ready().await;
    tokio::time::timeout(STEP_TIMEOUT, admitted)
        .await
        .expect("admission timed out")
        .expect("join")
        .expect("admitted");

    h.emit("r-done").await;
    assert_eq!(*seen.lock().expect("lock"), vec!["r-done".to_owned()]);
}

#[tokio::test]
async fn tasks_own_the_console_one_at_a_time_in_submission_order() {
    let mut h = Harness::new();
    h.ready().await;

    let (first, first_seen) = Recorder::new("First", "first-done");
    let (second, second_seen) = Recorder::new("Second", "second-done");

    h.supervisor.execute(Box::new(first)).await.expect("first admitted");

    let supervisor = h.supervisor.clone();
    let second_admitted = tokio::spawn(async move { supervisor.execute(Box::new(second)).await });

    assert_eq!(h.emit("a").await.owner, Some("First"));
    assert_eq!(h.emit("first-done").await.owner, Some("First"));

    tokio::time::timeout(STEP_TIMEOUT, second_admitted)
        .await
        .expect("admission timed out")
        .expect("join")
        .expect("second admitted");

    assert_eq!(h.emit("b").await.owner, Some("Second"));
    assert_eq!(h.emit("second-done").await.owner, Some("Second"));
    assert_eq!(h.emit("c").await.owner, None);

    assert_eq!(
        *first_seen.lock().expect("lock"),
        vec!["a".to_owned(), "first-done".to_owned()]
    );
    assert_eq!(
        *second_seen.lock().expect("lock"),
        vec!["b".to_owned(), "second-done".to_owned()]
    );
}

#[tokio::test]
async fn task_finishing_in_init_never_owns_the_console() {
    let mut h = Harness::new();
    h.ready().await;

    h.supervisor.execute(Box::new(Instant)).await.expect("admitted");
    assert_eq!(h.emit("after").await.owner, None);

    let (task, seen) = Recorder::new("Recorder", "done");
    h.supervisor.execute(Box::new(task)).await.expect("next task admitted");
    h.emit("done").await;
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

// ── Raw commands ────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_writes_one_line_to_stdin() {
    let mut h = Harness::new();
    h.ready().await;

    h.supervisor.send("say hello").await.expect("send");
    assert_eq!(h.read_command().await, "say hello");
}

#[tokio::test]
async fn send_works_while_a_task_is_current() {
    let mut h = Harness::new();
    h.ready().await;

    let (task, _seen) = Recorder::new("Recorder", "never");
    h.supervisor.execute(Box::new(task)).await.expect("admitted");

    h.supervisor.send("list").await.expect("send");
    assert_eq!(h.read_command().await, "list");
}

#[tokio::test]
async fn send_rejects_empty_and_multiline_commands() {
    let h = Harness::new();

    let empty = h.supervisor.send("").await;
    assert!(matches!(empty, Err(AppError::InvalidCommand(_))));

    let multiline = h.supervisor.send("say a\nstop").await;
    assert!(matches!(multiline, Err(AppError::InvalidCommand(_))));
}

// ── Stopped supervisor ──────────────────────────────────────────────────────

#[tokio::test]
async fn operations_after_exit_fail_with_not_running() {
    let mut h = Harness::new();
    h.ready().await;
    h.terminate().await;

    assert!(matches!(h.supervisor.send("list").await, Err(AppError::NotRunning(_))));
    assert!(matches!(h.supervisor.save().await, Err(AppError::NotRunning(_))));
    assert!(matches!(h.supervisor.stop().await, Err(AppError::NotRunning(_))));
    assert!(matches!(h.supervisor.snapshot().await, Err(AppError::NotRunning(_))));
    assert!(matches!(
        h.supervisor.execute(Box::new(Instant)).await,
        Err(AppError::NotRunning(_))
    ));
}

#[tokio::test]
async fn current_task_without_termination_handler_is_abandoned() {
    let mut h = Harness::new();
    h.ready().await;

    let supervisor = h.supervisor.clone();
    let save = tokio::spawn(async move { supervisor.save().await });
    assert_eq!(h.read_command().await, "save-all");

    h.terminate().await;
    let outcome = tokio::time::timeout(STEP_TIMEOUT, save)
        .await
        .expect("save never resolved")
        .expect("join");
    assert!(matches!(outcome, Err(AppError::Abandoned(_))), "got {outcome:?}");
}

#[tokio::test]
async fn queued_task_is_rejected_when_the_server_exits() {
    let mut h = Harness::new();
    h.ready().await;

    let (current, _seen) = Recorder::new("Current", "never");
    h.supervisor.execute(Box::new(current)).await.expect("admitted");

    let supervisor = h.supervisor.clone();
    let queued = tokio::spawn(async move { supervisor.save().await });
    tokio::task::yield_now().await;

    h.terminate().await;
    let outcome = tokio::time::timeout(STEP_TIMEOUT, queued)
        .await
        .expect("queued save never resolved")
        .expect("join");
    assert!(matches!(outcome, Err(AppError::NotRunning(_))), "got {outcome:?}");
}

#[tokio::test]
async fn output_written_just_before_exit_is_still_routed() {
    let mut h = Harness::new();
    h.ready().await;

    let supervisor = h.supervisor.clone();
    let save = tokio::spawn(async move { supervisor.save().await });
    assert_eq!(h.read_command().await, "save-all");

    // Exit right behind the marker without waiting for it to be routed.
    h.stdout
        .write_all(b"[12:10:00] [Server thread/INFO]: Saved the game\n")
        .await
        .expect("write stdout");
    h.terminate().await;

    let outcome = tokio::time::timeout(STEP_TIMEOUT, save)
        .await
        .expect("save never resolved")
        .expect("join");
    assert!(outcome.is_ok(), "got {outcome:?}");
}

#[tokio::test]
async fn streams_left_open_after_exit_do_not_hold_up_shutdown() {
    let mut h = Harness::new();
    h.ready().await;

    let supervisor = h.supervisor.clone();
    let save = tokio::spawn(async move { supervisor.save().await });
    assert_eq!(h.read_command().await, "save-all");

    // Exit while stdout and stderr stay open, as when a child process
    // inherited them.
    h.terminated.cancel();

    let outcome = tokio::time::timeout(STEP_TIMEOUT, save)
        .await
        .expect("save never resolved")
        .expect("join");
    assert!(matches!(outcome, Err(AppError::Abandoned(_))), "got {outcome:?}");
}
