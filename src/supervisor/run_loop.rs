//! The coordinator loop.
//!
//! One coordinator task owns the notion of the current task. It alone reads
//! the console line stream and decides which task observes each line, so
//! console ownership is structural: a new task is only read from the
//! admission queue while no task is current.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::ConsoleLine;
use crate::supervisor::task::{Task, TaskStep};

/// Log target for server console output.
pub const CONSOLE_TARGET: &str = "minecloud_wrapper::console";

/// How long output is still routed after the process exited.
///
/// A grandchild that inherited the pipes can keep them open indefinitely.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A task waiting to be admitted, with the signal that tells its submitter
/// admission happened.
pub(crate) struct Admission {
    pub(crate) task: Box<dyn Task>,
    pub(crate) admitted: oneshot::Sender<()>,
}

/// The task currently owning console output.
struct Current {
    task: Box<dyn Task>,
    id: Uuid,
}

pub(crate) struct Coordinator {
    initial: Option<Box<dyn Task>>,
    current: Option<Current>,
    lines: mpsc::UnboundedReceiver<String>,
    admissions: mpsc::Receiver<Admission>,
    terminated: CancellationToken,
    observers: broadcast::Sender<ConsoleLine>,
}

impl Coordinator {
    pub(crate) fn new(
        initial: Box<dyn Task>,
        lines: mpsc::UnboundedReceiver<String>,
        admissions: mpsc::Receiver<Admission>,
        terminated: CancellationToken,
        observers: broadcast::Sender<ConsoleLine>,
    ) -> Self {
        Self {
            initial: Some(initial),
            current: None,
            lines,
            admissions,
            terminated,
            observers,
        }
    }

    /// Run until the server terminates.
    ///
    /// Each iteration waits on, in priority order: the next console line, the
    /// terminal signal, and (only while no task is current) the next
    /// admission. Lines are therefore always drained before a new task is
    /// admitted.
    pub(crate) async fn run(mut self) {
        if let Some(initial) = self.initial.take() {
            self.install(initial, Uuid::new_v4()).await;
        }

        let mut lines_open = true;
        let mut admissions_open = true;

        loop {
            tokio::select! {
                biased;

                line = self.lines.recv(), if lines_open => match line {
                    Some(line) => self.route(line).await,
                    None => {
                        debug!("console streams closed");
                        lines_open = false;
                    }
                },

                () = self.terminated.cancelled() => {
                    if lines_open {
                        self.drain().await;
                    }
                    break;
                }

                admission = self.admissions.recv(), if admissions_open && self.current.is_none() => {
                    match admission {
                        Some(admission) => self.admit(admission).await,
                        None => {
                            debug!("every supervisor handle dropped, no further admissions");
                            admissions_open = false;
                        }
                    }
                }
            }
        }

        self.shut_down();
    }

    /// Hand `line` to the current task, then log and publish it.
    async fn route(&mut self, line: String) {
        let owner = match self.current.as_mut() {
            Some(current) => {
                let name = current.task.name();
                if current.task.on_output(&line).await == TaskStep::Done {
                    debug!(task = name, task_id = %current.id, "task released the console");
                    self.current = None;
                }
                Some(name)
            }
            None => None,
        };

        info!(target: CONSOLE_TARGET, owner = owner.unwrap_or("none"), "{line}");

        // No subscribers is the common case.
        let _ = self.observers.send(ConsoleLine { text: line, owner });
    }

    /// Route the output the process wrote before exiting, until both streams
    /// reach EOF or [`DRAIN_TIMEOUT`] elapses.
    async fn drain(&mut self) {
        let deadline = tokio::time::sleep(DRAIN_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                line = self.lines.recv() => match line {
                    Some(line) => self.route(line).await,
                    None => {
                        debug!("console streams drained after exit");
                        return;
                    }
                },

                () = &mut deadline => {
                    warn!(
                        timeout = ?DRAIN_TIMEOUT,
                        "console streams still open after exit, dropping further output"
                    );
                    return;
                }
            }
        }
    }

    async fn admit(&mut self, admission: Admission) {
        let Admission { task, admitted } = admission;
        let id = Uuid::new_v4();

        info!(task = task.name(), task_id = %id, "task admitted");
        if admitted.send(()).is_err() {
            debug!(task = task.name(), task_id = %id, "submitter stopped waiting; running task anyway");
        }

        self.install(task, id).await;
    }

    /// Run `task`'s init step and make it current unless it already finished.
    async fn install(&mut self, mut task: Box<dyn Task>, id: Uuid) {
        match task.init().await {
            TaskStep::Done => {
                debug!(task = task.name(), task_id = %id, "task completed during init");
            }
            TaskStep::Continue => {
                self.current = Some(Current { task, id });
            }
        }
    }

    /// Give the current task its termination callback and reject everything
    /// still queued.
    fn shut_down(mut self) {
        if let Some(mut current) = self.current.take() {
            let name = current.task.name();
            if current.task.on_terminate() {
                debug!(task = name, task_id = %current.id, "task handled server termination");
            } else {
                warn!(
                    task = name,
                    task_id = %current.id,
                    "server terminated while task was current; abandoning it"
                );
            }
        }

        self.admissions.close();
        while let Ok(admission) = self.admissions.try_recv() {
            warn!(task = admission.task.name(), "dropping queued task, server is not running");
        }

        info!("supervisor loop finished");
    }
}
