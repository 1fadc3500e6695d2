//! Task protocol.
//!
//! A [`Task`] is a bounded, stateful interaction with the server that owns the
//! console output stream while it is current. The coordinator calls
//! [`Task::init`] once on admission and [`Task::on_output`] for every console
//! line until one of them returns [`TaskStep::Done`]. If the server exits
//! while the task is current, [`Task::on_terminate`] gets one chance to
//! deliver a result.
//!
//! Tasks started by a caller report back through a [`ResultSlot`] /
//! [`TaskHandle`] pair: the slot delivers at most once, and the handle
//! resolves to exactly one outcome.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// What the coordinator should do with a task after one of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStep {
    /// Keep the task current; route it the next console line.
    Continue,
    /// The task is finished; release the console.
    Done,
}

/// Boxed future returned by task steps.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = TaskStep> + Send + 'a>>;

/// A unit of interaction with the server that temporarily owns console output.
///
/// Steps run on the coordinator; while a step is pending no console line is
/// routed and no other task is admitted.
pub trait Task: Send {
    /// Short name used in logs and console line attribution.
    fn name(&self) -> &'static str;

    /// Run once when the task is admitted.
    ///
    /// Returning [`TaskStep::Done`] completes the task without it ever
    /// observing output.
    fn init(&mut self) -> StepFuture<'_>;

    /// Observe one console line.
    fn on_output<'a>(&'a mut self, line: &'a str) -> StepFuture<'a>;

    /// Called if the server exits while this task is current.
    ///
    /// Return `true` if the task handled termination (usually by delivering
    /// its result). The default returns `false`; the coordinator then drops
    /// the task and its submitter observes [`AppError::Abandoned`].
    fn on_terminate(&mut self) -> bool {
        false
    }
}

/// Sending half of a task's single-shot result.
#[derive(Debug)]
pub struct ResultSlot {
    task: &'static str,
    tx: Option<oneshot::Sender<Result<()>>>,
}

/// Receiving half of a task's single-shot result.
#[derive(Debug)]
pub struct TaskHandle {
    task: &'static str,
    rx: oneshot::Receiver<Result<()>>,
}

/// Create a connected [`ResultSlot`] / [`TaskHandle`] pair for `task`.
#[must_use]
pub fn result_channel(task: &'static str) -> (ResultSlot, TaskHandle) {
    let (tx, rx) = oneshot::channel();
    (
        ResultSlot { task, tx: Some(tx) },
        TaskHandle { task, rx },
    )
}

impl ResultSlot {
    /// Deliver the task's outcome. Later calls are ignored.
    pub fn deliver(&mut self, outcome: Result<()>) {
        let Some(tx) = self.tx.take() else {
            warn!(task = self.task, "result already delivered, ignoring");
            return;
        };

        match &outcome {
            Ok(()) => debug!(task = self.task, "task succeeded"),
            Err(err) => debug!(task = self.task, %err, "task failed"),
        }

        if tx.send(outcome).is_err() {
            debug!(task = self.task, "submitter went away before the result was delivered");
        }
    }

    /// Whether a result has been delivered through this slot.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.tx.is_none()
    }
}

impl TaskHandle {
    /// Wait for the task's outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the task delivered, or [`AppError::Abandoned`] if the
    /// task was dropped without delivering a result.
    pub async fn outcome(self) -> Result<()> {
        self.rx.await.map_err(|_| {
            AppError::Abandoned(format!("{} ended without delivering a result", self.task))
        })?
    }
}
