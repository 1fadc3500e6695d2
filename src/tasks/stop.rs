//! Stop the server.

use tracing::info;

use crate::console::Console;
use crate::supervisor::task::{result_channel, ResultSlot, StepFuture, Task, TaskHandle, TaskStep};

/// Console command that shuts the server down.
pub const STOP_COMMAND: &str = "stop";

/// Sends `stop` and succeeds when the server process exits.
///
/// The task never looks for a textual confirmation: process exit is the
/// success signal, delivered from [`Task::on_terminate`].
#[derive(Debug)]
pub struct StopTask {
    console: Console,
    result: ResultSlot,
}

impl StopTask {
    /// Create the task and the handle its outcome is delivered to.
    #[must_use]
    pub fn new(console: Console) -> (Self, TaskHandle) {
        let (result, handle) = result_channel("StopTask");
        (Self { console, result }, handle)
    }
}

impl Task for StopTask {
    fn name(&self) -> &'static str {
        "StopTask"
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async move {
            match self.console.send(STOP_COMMAND).await {
                Ok(()) => {
                    info!("stop requested, waiting for server exit");
                    TaskStep::Continue
                }
                Err(err) => {
                    self.result.deliver(Err(err));
                    TaskStep::Done
                }
            }
        })
    }

    fn on_output<'a>(&'a mut self, _line: &'a str) -> StepFuture<'a> {
        Box::pin(async { TaskStep::Continue })
    }

    fn on_terminate(&mut self) -> bool {
        self.result.deliver(Ok(()));
        true
    }
}
