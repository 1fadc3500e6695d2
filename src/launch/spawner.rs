//! Server process spawner.
//!
//! Spawns the server with all three stdio streams piped and
//! `kill_on_drop(true)`, and runs the exit monitor that turns process exit
//! into the supervisor's terminal signal.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::launch::LaunchSpec;
use crate::{AppError, Result};

/// A freshly spawned server process with its captured stdio.
#[derive(Debug)]
pub struct ServerProcess {
    /// Child handle. Owned by the exit monitor once the supervisor starts.
    pub child: Child,
    /// Server stdin; owned by the console writer.
    pub stdin: ChildStdin,
    /// Server stdout; drained by a console reader.
    pub stdout: ChildStdout,
    /// Server stderr; drained by a console reader.
    pub stderr: ChildStderr,
}

/// Spawn the process described by `spec`.
///
/// # Errors
///
/// - `AppError::Launch("failed to spawn …")`: OS spawn failure (missing
///   executable, bad working directory, …).
/// - `AppError::Launch("failed to capture …")`: a stdio pipe was not created.
pub fn spawn_server(spec: &LaunchSpec) -> Result<ServerProcess> {
    info!(
        program = %spec.program.to_string_lossy(),
        args = ?spec.args,
        dir = %spec.current_dir.display(),
        "launching server process"
    );

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.current_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            AppError::Launch(format!(
                "failed to spawn {}: {err}",
                spec.program.to_string_lossy()
            ))
        })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Launch("failed to capture server stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Launch("failed to capture server stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Launch("failed to capture server stderr".into()))?;

    info!(pid = child.id(), "server process started");

    Ok(ServerProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Spawn a background task that owns `child` until it exits.
///
/// When `kill` fires the process is asked to stop (`SIGTERM` on Unix) and
/// force-killed if it is still alive after `grace`. In every case
/// `terminated` is cancelled once the process has been reaped; it is the only
/// place that fires it.
#[must_use]
pub fn monitor_exit(
    mut child: Child,
    kill: CancellationToken,
    terminated: CancellationToken,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = tokio::select! {
            result = child.wait() => result,
            () = kill.cancelled() => {
                info!("kill requested, terminating server process");
                terminate(&mut child, grace).await
            }
        };

        match result {
            Ok(status) => info!(status = %describe(status), "server process exited"),
            Err(err) => warn!(%err, "error waiting for server process"),
        }

        terminated.cancel();
    })
}

/// Ask the process to exit, escalating to a forced kill after `grace`.
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    if request_exit(child) {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(result) => return result,
            Err(_elapsed) => {
                warn!(?grace, "server process ignored SIGTERM, killing");
            }
        }
    }

    child.kill().await?;
    child.wait().await
}

/// Send `SIGTERM`. Returns `false` when the signal could not be delivered.
#[cfg(unix)]
fn request_exit(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => true,
        Err(err) => {
            warn!(pid, %err, "failed to send SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child) -> bool {
    false
}

fn describe(status: ExitStatus) -> String {
    if status.success() {
        "exited normally (code 0)".to_owned()
    } else {
        status.code().map_or_else(
            || "terminated by signal".to_owned(),
            |c| format!("exited with code {c}"),
        )
    }
}
