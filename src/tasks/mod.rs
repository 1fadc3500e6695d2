//! Built-in tasks.
//!
//! | Task              | Commands                          | Completes on                          |
//! |-------------------|-----------------------------------|---------------------------------------|
//! | [`ReadyWaitTask`] | none                              | ready marker                          |
//! | [`StopTask`]      | `stop`                            | server exit                           |
//! | [`SaveTask`]      | `save-all`                        | save marker                           |
//! | [`SnapshotTask`]  | `save-off`, `save-all flush`, `save-on` | save marker, copy, autosave marker |

pub mod ready;
pub mod save;
pub mod snapshot;
pub mod stop;

use std::path::PathBuf;

use crate::config::Markers;

pub use ready::ReadyWaitTask;
pub use save::SaveTask;
pub use snapshot::SnapshotTask;
pub use stop::StopTask;

/// Inputs the built-in tasks are created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    /// Console marker lines.
    pub markers: Markers,
    /// World data directory copied by snapshots.
    pub world_dir: PathBuf,
    /// Directory snapshots are written into.
    pub snapshot_dir: PathBuf,
}
