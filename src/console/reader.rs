//! Console reader tasks.
//!
//! Each reader drains one output stream of the server (stdout or stderr)
//! through a [`FramedRead`] backed by [`ConsoleCodec`] and forwards every line
//! onto the shared output channel. The channel is unbounded so a reader never
//! stops consuming while the coordinator is busy.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::console::codec::ConsoleCodec;

/// Read lines from `stream` until EOF and forward them through `line_tx`.
///
/// `label` names the stream in log output (`stdout` or `stderr`).
///
/// A read error ends this reader only. The supervisor's liveness is decided by
/// process exit, not by the end of its output streams.
pub async fn run_reader<R>(label: &'static str, stream: R, line_tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(stream, ConsoleCodec::new());

    while let Some(item) = framed.next().await {
        match item {
            Ok(line) => {
                if line_tx.send(line).is_err() {
                    debug!(stream = label, "console reader: line channel closed, stopping");
                    return;
                }
            }
            Err(err) => {
                warn!(stream = label, %err, "console reader: read failed, stopping");
                return;
            }
        }
    }

    debug!(stream = label, "console reader: EOF");
}
