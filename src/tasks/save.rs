//! Save the world.

use crate::config::Markers;
use crate::console::Console;
use crate::supervisor::task::{result_channel, ResultSlot, StepFuture, Task, TaskHandle, TaskStep};

/// Console command that flushes the world to disk.
pub const SAVE_COMMAND: &str = "save-all";

/// Sends `save-all` and succeeds on the save-completion marker.
///
/// Has no termination handler: if the server dies mid-save the submitter
/// observes [`AppError::Abandoned`](crate::AppError::Abandoned).
#[derive(Debug)]
pub struct SaveTask {
    console: Console,
    saved_marker: String,
    result: ResultSlot,
}

impl SaveTask {
    /// Create the task and the handle its outcome is delivered to.
    #[must_use]
    pub fn new(console: Console, markers: &Markers) -> (Self, TaskHandle) {
        let (result, handle) = result_channel("SaveTask");
        let task = Self {
            console,
            saved_marker: markers.saved.clone(),
            result,
        };
        (task, handle)
    }
}

impl Task for SaveTask {
    fn name(&self) -> &'static str {
        "SaveTask"
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async move {
            if let Err(err) = self.console.send(SAVE_COMMAND).await {
                self.result.deliver(Err(err));
                return TaskStep::Done;
            }
            TaskStep::Continue
        })
    }

    fn on_output<'a>(&'a mut self, line: &'a str) -> StepFuture<'a> {
        Box::pin(async move {
            if line.contains(&self.saved_marker) {
                self.result.deliver(Ok(()));
                TaskStep::Done
            } else {
                TaskStep::Continue
            }
        })
    }
}
