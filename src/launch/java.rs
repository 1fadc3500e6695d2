//! The server command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::WrapperConfig;
use crate::{AppError, Result};

/// G1 tuning flags passed to every launch.
///
/// Mostly from Aikar's recommended flags for Minecraft servers.
pub const JVM_TUNING_OPTIONS: &[&str] = &[
    "-XX:+UseG1GC",
    "-XX:+ParallelRefProcEnabled",
    "-XX:MaxGCPauseMillis=200",
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+DisableExplicitGC",
    "-XX:-OmitStackTraceInFastThrow",
    "-XX:+AlwaysPreTouch",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:G1HeapWastePercent=5",
    "-XX:G1MixedGCCountTarget=8",
    "-XX:InitiatingHeapOccupancyPercent=15",
    "-XX:G1MixedGCLiveThresholdPercent=90",
    "-XX:G1RSetUpdatingPauseTimePercent=5",
    "-XX:SurvivorRatio=32",
    "-XX:MaxTenuringThreshold=1",
];

/// A fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable to run.
    pub program: OsString,
    /// Arguments, in order.
    pub args: Vec<OsString>,
    /// Working directory of the process.
    pub current_dir: PathBuf,
}

impl LaunchSpec {
    /// Invocation of `program` with `args` in `current_dir`.
    pub fn new<P, I, A>(program: P, args: I, current_dir: impl Into<PathBuf>) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: current_dir.into(),
        }
    }
}

/// Split a world directory into the server's `--universe` (parent directory)
/// and `--world` (directory name) arguments.
///
/// A trailing separator is ignored; a bare relative name has universe `.`.
///
/// # Errors
///
/// Returns `AppError::Config` if `dir` has no final component (empty, `/`,
/// `.` or `..`).
pub fn universe_and_world(dir: &Path) -> Result<(PathBuf, String)> {
    let world = dir
        .file_name()
        .ok_or_else(|| AppError::Config(format!("world_dir {} has no world name", dir.display())))?
        .to_string_lossy()
        .into_owned();

    let universe = match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((universe, world))
}

/// Build the `java` invocation for `config` with a heap of `memory_mib`.
///
/// The JAR and world paths are made absolute because the process runs from
/// `server_dir`.
///
/// # Errors
///
/// Returns `AppError::Config` if a path cannot be made absolute or the world
/// directory has no name.
pub fn java_launch_spec(config: &WrapperConfig, memory_mib: u64) -> Result<LaunchSpec> {
    let jar = absolute(&config.jar)?;
    let world_dir = absolute(&config.world_dir)?;
    let (universe, world) = universe_and_world(&world_dir)?;

    let mut args: Vec<OsString> = vec![
        format!("-Xms{memory_mib}M").into(),
        format!("-Xmx{memory_mib}M").into(),
    ];
    args.extend(JVM_TUNING_OPTIONS.iter().map(OsString::from));
    args.extend([
        OsString::from("-jar"),
        jar.into_os_string(),
        OsString::from("--universe"),
        universe.into_os_string(),
        OsString::from("--world"),
        OsString::from(world),
        OsString::from("nogui"),
    ]);

    Ok(LaunchSpec {
        program: OsString::from(&config.java),
        args,
        current_dir: config.server_dir.clone(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|err| AppError::Config(format!("cannot resolve {}: {err}", path.display())))
}
