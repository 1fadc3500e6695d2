//! The server process supervisor.
//!
//! A [`Supervisor`] is a cloneable handle to one supervised server process.
//! Behind it run:
//!
//! - two console reader tasks (stdout, stderr) feeding one line stream,
//! - the console writer task owning stdin,
//! - the coordinator ([`run_loop`]) routing lines to the current [`Task`],
//! - for spawned processes, the exit monitor that fires the terminal signal.
//!
//! All of them communicate through channels. The only shared state is the
//! "finished starting" flag (written by the coordinator) and the terminal
//! [`CancellationToken`] (fired by the exit monitor).

pub mod run_loop;
pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WrapperConfig;
use crate::console::{reader, writer, Console};
use crate::launch::{java_launch_spec, memory, spawner, LaunchSpec};
use crate::models::{ConsoleLine, Status};
use crate::tasks::{ReadyWaitTask, SaveTask, SnapshotTask, StopTask, TaskSettings};
use crate::{AppError, Result};

use self::run_loop::{Admission, Coordinator};
use self::task::{Task, TaskHandle};

/// Tasks that may wait in the admission queue before submitters block.
const ADMISSION_QUEUE_DEPTH: usize = 1;

/// Console lines buffered per observer before it starts lagging.
const OBSERVER_CAPACITY: usize = 256;

/// Handle to a supervised server process.
///
/// Cloning the handle is cheap; every clone refers to the same process.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    console: Console,
    admissions: mpsc::Sender<Admission>,
    started: Arc<AtomicBool>,
    terminated: CancellationToken,
    kill: CancellationToken,
    observers: broadcast::Sender<ConsoleLine>,
    settings: TaskSettings,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("status", &self.status())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Size the heap, build the `java` command line for `config` and spawn it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Launch` or `AppError::Config` if the process cannot
    /// be started. Launch failure is fatal; nothing is left running.
    pub fn launch(config: &WrapperConfig) -> Result<Self> {
        let memory_mib = memory::resolve_memory_mib(config.memory_mib)?;
        let spec = java_launch_spec(config, memory_mib)?;
        Self::spawn(&spec, config.task_settings(), config.kill_grace())
    }

    /// Spawn the process described by `spec` and supervise it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Launch` if the process cannot be spawned.
    pub fn spawn(spec: &LaunchSpec, settings: TaskSettings, kill_grace: Duration) -> Result<Self> {
        let process = spawner::spawn_server(spec)?;
        let terminated = CancellationToken::new();

        let supervisor = Self::attach(
            process.stdin,
            process.stdout,
            process.stderr,
            settings,
            terminated.clone(),
        );

        // The monitor owns the child; dropping its handle detaches it.
        drop(spawner::monitor_exit(
            process.child,
            supervisor.kill_requested(),
            terminated,
            kill_grace,
        ));

        Ok(supervisor)
    }

    /// Supervise an already running process given its stdio streams.
    ///
    /// The caller owns process exit detection and must cancel `terminated`
    /// once the process is gone. [`Supervisor::kill_requested`] fires when
    /// [`Supervisor::kill`] is called.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<W, O, E>(
        stdin: W,
        stdout: O,
        stderr: E,
        settings: TaskSettings,
        terminated: CancellationToken,
    ) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        tokio::spawn(reader::run_reader("stdout", stdout, line_tx.clone()));
        tokio::spawn(reader::run_reader("stderr", stderr, line_tx));

        let (console, requests) = Console::channel();
        tokio::spawn(writer::run_writer(stdin, requests, terminated.clone()));

        let started = Arc::new(AtomicBool::new(false));
        let (admissions_tx, admissions_rx) = mpsc::channel(ADMISSION_QUEUE_DEPTH);
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);

        let ready = ReadyWaitTask::new(settings.markers.ready.clone(), Arc::clone(&started));
        let coordinator = Coordinator::new(
            Box::new(ready),
            line_rx,
            admissions_rx,
            terminated.clone(),
            observers.clone(),
        );
        tokio::spawn(coordinator.run());

        Self {
            inner: Arc::new(Inner {
                console,
                admissions: admissions_tx,
                started,
                terminated,
                kill: CancellationToken::new(),
                observers,
                settings,
            }),
        }
    }

    /// Current status, derived from the terminal signal and the started flag.
    ///
    /// Transitions are monotonic: `starting → running → stopped`.
    #[must_use]
    pub fn status(&self) -> Status {
        if self.inner.terminated.is_cancelled() {
            Status::Stopped
        } else if self.inner.started.load(Ordering::Acquire) {
            Status::Running
        } else {
            Status::Starting
        }
    }

    /// Write a raw command to the server console.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotRunning`] if the server has stopped.
    /// - [`AppError::InvalidCommand`] / [`AppError::Io`] from the write.
    pub async fn send(&self, command: &str) -> Result<()> {
        self.ensure_running()?;
        self.inner.console.send(command).await
    }

    /// Submit `task` and wait until the coordinator admits it.
    ///
    /// While another task is current the call blocks; submissions are
    /// admitted in order. Delivery of the task's result is up to the task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotRunning`] if the server has stopped, or stops
    /// before the task is admitted.
    pub async fn execute(&self, task: Box<dyn Task>) -> Result<()> {
        self.ensure_running()?;

        let name = task.name();
        let (admitted, on_admitted) = oneshot::channel();
        self.inner
            .admissions
            .send(Admission { task, admitted })
            .await
            .map_err(|_| AppError::NotRunning(format!("{name} rejected, server has stopped")))?;

        on_admitted
            .await
            .map_err(|_| AppError::NotRunning(format!("{name} dropped, server has stopped")))
    }

    /// Submit `task` and wait for the single result delivered to `handle`.
    ///
    /// # Errors
    ///
    /// Returns the task's error, [`AppError::NotRunning`] if it was never
    /// admitted, or [`AppError::Abandoned`] if the server exited while the
    /// task was current and the task did not handle termination.
    pub async fn run_task(&self, task: Box<dyn Task>, handle: TaskHandle) -> Result<()> {
        self.execute(task).await?;
        handle.outcome().await
    }

    /// Stop the server and wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns the stdin write error if the `stop` command cannot be sent.
    pub async fn stop(&self) -> Result<()> {
        let (task, handle) = StopTask::new(self.console());
        self.run_task(Box::new(task), handle).await
    }

    /// Save the world and wait for the server to confirm it.
    ///
    /// # Errors
    ///
    /// Returns the stdin write error if `save-all` cannot be sent.
    pub async fn save(&self) -> Result<()> {
        let (task, handle) = SaveTask::new(self.console(), &self.inner.settings.markers);
        self.run_task(Box::new(task), handle).await
    }

    /// Copy a consistent snapshot of the world to the snapshot directory.
    ///
    /// # Errors
    ///
    /// Returns stdin write errors or `AppError::Snapshot` if the copy fails.
    pub async fn snapshot(&self) -> Result<()> {
        let (task, handle) = SnapshotTask::new(self.console(), &self.inner.settings);
        self.run_task(Box::new(task), handle).await
    }

    /// Receive every console line after it has been routed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleLine> {
        self.inner.observers.subscribe()
    }

    /// Ask for the server process to be terminated.
    pub fn kill(&self) {
        info!("server kill requested");
        self.inner.kill.cancel();
    }

    /// Token fired by [`Supervisor::kill`].
    #[must_use]
    pub fn kill_requested(&self) -> CancellationToken {
        self.inner.kill.clone()
    }

    /// Wait until the server process has terminated.
    pub async fn wait_terminated(&self) {
        self.inner.terminated.cancelled().await;
    }

    /// Console handle for building custom tasks.
    #[must_use]
    pub fn console(&self) -> Console {
        self.inner.console.clone()
    }

    /// Settings the built-in tasks are created with.
    #[must_use]
    pub fn settings(&self) -> &TaskSettings {
        &self.inner.settings
    }

    fn ensure_running(&self) -> Result<()> {
        if self.inner.terminated.is_cancelled() {
            Err(AppError::NotRunning("server has stopped".into()))
        } else {
            Ok(())
        }
    }
}
