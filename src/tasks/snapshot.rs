//! Snapshot the world directory while the server is running.
//!
//! Autosave is switched off and a full save forced so the files on disk are
//! consistent and stay untouched during the copy:
//!
//! 1. `save-off`, `save-all flush`
//! 2. on the save marker: copy the world, then `save-on`
//! 3. on the autosave marker: done
//!
//! The task is only complete after step 3; the save marker alone never
//! delivers a result.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::console::Console;
use crate::supervisor::task::{result_channel, ResultSlot, StepFuture, Task, TaskHandle, TaskStep};
use crate::tasks::TaskSettings;
use crate::{AppError, Result};

/// Disables autosave.
pub const SAVE_OFF_COMMAND: &str = "save-off";
/// Forces a full save of every chunk.
pub const SAVE_FLUSH_COMMAND: &str = "save-all flush";
/// Re-enables autosave.
pub const SAVE_ON_COMMAND: &str = "save-on";

/// Which marker the task is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingSave,
    AwaitingAutosave,
}

/// Copies the world to the snapshot directory between a forced save and
/// re-enabling autosave.
#[derive(Debug)]
pub struct SnapshotTask {
    console: Console,
    saved_marker: String,
    autosave_marker: String,
    world_dir: PathBuf,
    snapshot_dir: PathBuf,
    phase: Phase,
    result: ResultSlot,
}

impl SnapshotTask {
    /// Create the task and the handle its outcome is delivered to.
    #[must_use]
    pub fn new(console: Console, settings: &TaskSettings) -> (Self, TaskHandle) {
        let (result, handle) = result_channel("SnapshotTask");
        let task = Self {
            console,
            saved_marker: settings.markers.saved.clone(),
            autosave_marker: settings.markers.autosave_enabled.clone(),
            world_dir: settings.world_dir.clone(),
            snapshot_dir: settings.snapshot_dir.clone(),
            phase: Phase::AwaitingSave,
            result,
        };
        (task, handle)
    }

    /// Send `command`, delivering the error if the write fails.
    async fn send_or_fail(&mut self, command: &str) -> bool {
        match self.console.send(command).await {
            Ok(()) => true,
            Err(err) => {
                warn!(command, %err, "snapshot: console write failed");
                self.result.deliver(Err(err));
                false
            }
        }
    }

    async fn on_saved(&mut self) -> TaskStep {
        match copy_world(&self.world_dir, &self.snapshot_dir).await {
            Ok(destination) => {
                info!(destination = %destination.display(), "snapshot: world copied");
            }
            Err(err) => {
                self.result.deliver(Err(err));
                return TaskStep::Done;
            }
        }

        if !self.send_or_fail(SAVE_ON_COMMAND).await {
            return TaskStep::Done;
        }

        self.phase = Phase::AwaitingAutosave;
        TaskStep::Continue
    }
}

impl Task for SnapshotTask {
    fn name(&self) -> &'static str {
        "SnapshotTask"
    }

    fn init(&mut self) -> StepFuture<'_> {
        Box::pin(async move {
            for command in [SAVE_OFF_COMMAND, SAVE_FLUSH_COMMAND] {
                if !self.send_or_fail(command).await {
                    return TaskStep::Done;
                }
            }
            TaskStep::Continue
        })
    }

    fn on_output<'a>(&'a mut self, line: &'a str) -> StepFuture<'a> {
        Box::pin(async move {
            match self.phase {
                Phase::AwaitingSave if line.contains(&self.saved_marker) => self.on_saved().await,
                Phase::AwaitingAutosave if line.contains(&self.autosave_marker) => {
                    self.result.deliver(Ok(()));
                    TaskStep::Done
                }
                _ => TaskStep::Continue,
            }
        })
    }
}

/// Copy `world_dir` into `<snapshot_dir>/<world name>`.
///
/// Runs on the blocking pool; the caller is suspended until the copy has
/// finished. Existing files at the destination are overwritten.
///
/// # Errors
///
/// Returns `AppError::Snapshot` if the world directory cannot be resolved or
/// has no name, the destination lies inside the world directory, or any
/// filesystem operation fails.
pub async fn copy_world(world_dir: &Path, snapshot_dir: &Path) -> Result<PathBuf> {
    let world_dir = world_dir.to_path_buf();
    let snapshot_dir = snapshot_dir.to_path_buf();

    let (destination, files) = tokio::task::spawn_blocking(move || {
        let (source, destination) = resolve_destination(&world_dir, &snapshot_dir)?;
        let files = copy_dir_all(&source, &destination).map_err(|err| {
            AppError::Snapshot(format!(
                "copy {} -> {} failed: {err}",
                source.display(),
                destination.display()
            ))
        })?;
        Ok::<_, AppError>((destination, files))
    })
    .await
    .map_err(|err| AppError::Snapshot(format!("copy task failed: {err}")))??;

    info!(files, "snapshot: copy complete");
    Ok(destination)
}

/// Resolve the copy source and destination, rejecting a destination inside
/// the world directory however either path is spelled.
fn resolve_destination(world_dir: &Path, snapshot_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let world_dir = fs::canonicalize(world_dir).map_err(|err| {
        AppError::Snapshot(format!("cannot resolve world dir {}: {err}", world_dir.display()))
    })?;
    let snapshot_dir = resolve_existing_prefix(snapshot_dir).map_err(|err| {
        AppError::Snapshot(format!(
            "cannot resolve snapshot dir {}: {err}",
            snapshot_dir.display()
        ))
    })?;

    let world_name = world_dir.file_name().ok_or_else(|| {
        AppError::Snapshot(format!("world dir {} has no name", world_dir.display()))
    })?;
    let destination = snapshot_dir.join(world_name);

    if destination.starts_with(&world_dir) {
        return Err(AppError::Snapshot(format!(
            "snapshot destination {} is inside the world dir",
            destination.display()
        )));
    }

    Ok((world_dir, destination))
}

/// Make `path` absolute and lexically normal, then canonicalize its deepest
/// existing ancestor. The snapshot directory may not exist yet.
fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut normal = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut existing = normal.as_path();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(err);
                };
                missing.push(name);
                existing = parent;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Recursively copy `src` into `dst`, returning the number of files copied.
fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir_all(dst)?;

    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());

        if file_type.is_dir() {
            copied += copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
            copied += 1;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}
