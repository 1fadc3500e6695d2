//! Console writer task.
//!
//! The writer task is the only owner of the server's stdin. Commands reach it
//! through a bounded [`mpsc`] channel, each paired with a [`oneshot`] reply
//! slot, so every submitter learns the outcome of its own write and writes
//! are applied to stdin strictly in submission order.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Depth of the command queue in front of the writer task.
///
/// Submitters beyond this depth wait in [`Console::send`] until the writer
/// catches up.
const COMMAND_QUEUE_DEPTH: usize = 1;

/// One command waiting to be written, with the slot for its outcome.
#[derive(Debug)]
pub struct WriteRequest {
    command: String,
    reply: oneshot::Sender<Result<()>>,
}

/// Cloneable handle for writing commands to the server console.
#[derive(Debug, Clone)]
pub struct Console {
    tx: mpsc::Sender<WriteRequest>,
}

impl Console {
    /// Create a console handle and the receiving end for [`run_writer`].
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<WriteRequest>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    /// Write `command` followed by a newline to the server's stdin.
    ///
    /// Suspends until this command's write has completed. Writes are never
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidCommand`] if `command` is empty or contains a
    ///   line break.
    /// - [`AppError::Io`] if the write to stdin fails.
    /// - [`AppError::NotRunning`] if the writer task has stopped.
    pub async fn send(&self, command: &str) -> Result<()> {
        validate_command(command)?;

        let (reply, outcome) = oneshot::channel();
        let request = WriteRequest {
            command: command.to_owned(),
            reply,
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| AppError::NotRunning("console writer has stopped".into()))?;

        outcome
            .await
            .map_err(|_| AppError::NotRunning("console writer stopped before writing".into()))?
    }
}

/// Console writer task. Applies queued commands to `stdin` one at a time.
///
/// The task exits when:
/// - `cancel` fires (the server process has terminated), or
/// - every [`Console`] handle has been dropped.
///
/// Commands still queued when `cancel` fires are dropped; their submitters
/// observe [`AppError::NotRunning`].
pub async fn run_writer<W>(
    stdin: W,
    mut requests: mpsc::Receiver<WriteRequest>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut stdin = stdin;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("console writer: cancellation received, stopping");
                break;
            }

            request = requests.recv() => {
                let Some(request) = request else {
                    debug!("console writer: command channel closed, stopping");
                    break;
                };

                let outcome = write_line(&mut stdin, &request.command).await;
                match outcome {
                    Ok(()) => debug!(command = %request.command, "console writer: command written"),
                    Err(ref err) => {
                        warn!(command = %request.command, %err, "console writer: write to stdin failed");
                    }
                }

                if request.reply.send(outcome).is_err() {
                    debug!("console writer: submitter went away before the outcome was delivered");
                }
            }
        }
    }
}

fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(AppError::InvalidCommand("command is empty".into()));
    }
    if command.contains(['\n', '\r']) {
        return Err(AppError::InvalidCommand(
            "command must be a single line".into(),
        ));
    }
    Ok(())
}

async fn write_line<W>(stdin: &mut W, command: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = Vec::with_capacity(command.len() + 1);
    bytes.extend_from_slice(command.as_bytes());
    bytes.push(b'\n');

    stdin
        .write_all(&bytes)
        .await
        .map_err(|err| AppError::Io(format!("write failed: {err}")))?;
    stdin
        .flush()
        .await
        .map_err(|err| AppError::Io(format!("flush failed: {err}")))
}
