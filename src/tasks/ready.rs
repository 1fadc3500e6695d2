//! Wait for the server to finish starting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::supervisor::task::{StepFuture, Task, TaskStep};

/// Current from launch until the ready marker appears.
///
/// Internal to the supervisor; it has no submitter and no result.
#[derive(Debug)]
pub struct ReadyWaitTask {
    marker: String,
    started: Arc<AtomicBool>,
}

impl ReadyWaitTask {
    /// Task that sets `started` once a line containing `marker` is seen.
    #[must_use]
    pub fn new(marker: String, started: Arc<AtomicBool>) -> Self {
        Self { marker, started }
    }
}

impl Task for ReadyWaitTask {
    fn name(&self) -> &'static str {
        "ReadyWaitTask"
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async { TaskStep::Continue })
    }

    fn on_output<'a>(&'a mut self, line: &'a str) -> StepFuture<'a> {
        Box::pin(async move {
            if line.contains(&self.marker) {
                self.started.store(true, Ordering::Release);
                info!("server finished starting");
                TaskStep::Done
            } else {
                TaskStep::Continue
            }
        })
    }

    fn on_terminate(&mut self) -> bool {
        warn!("server exited before it finished starting");
        true
    }
}
