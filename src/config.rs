//! Wrapper configuration parsing and validation.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::tasks::TaskSettings;
use crate::{AppError, Result};

fn default_address() -> String {
    "0.0.0.0:8080".into()
}

fn default_java() -> String {
    "java".into()
}

fn default_kill_grace_seconds() -> u64 {
    30
}

fn default_ready_marker() -> String {
    "[Server thread/INFO]: Done".into()
}

fn default_saved_marker() -> String {
    "[Server thread/INFO]: Saved the game".into()
}

fn default_autosave_enabled_marker() -> String {
    "[Server thread/INFO]: Automatic saving is now enabled".into()
}

/// Console substrings that mark server milestones.
///
/// The defaults match the vanilla server's log format. Modded servers that
/// reformat their log lines can override them in the `[markers]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Markers {
    /// Emitted once the server has finished starting.
    #[serde(default = "default_ready_marker")]
    pub ready: String,
    /// Emitted when a `save-all` completes.
    #[serde(default = "default_saved_marker")]
    pub saved: String,
    /// Emitted after `save-on` re-enables autosave.
    #[serde(default = "default_autosave_enabled_marker")]
    pub autosave_enabled: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            ready: default_ready_marker(),
            saved: default_saved_marker(),
            autosave_enabled: default_autosave_enabled_marker(),
        }
    }
}

/// Wrapper configuration parsed from `wrapper.toml` and command-line flags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WrapperConfig {
    /// Socket address the HTTP front end binds to.
    #[serde(default = "default_address")]
    pub address: String,
    /// Java executable used to launch the server.
    #[serde(default = "default_java")]
    pub java: String,
    /// Server JAR file.
    #[serde(default)]
    pub jar: PathBuf,
    /// Working directory for the server process.
    #[serde(default)]
    pub server_dir: PathBuf,
    /// World data directory.
    #[serde(default)]
    pub world_dir: PathBuf,
    /// Destination directory for world snapshots.
    #[serde(default)]
    pub snapshot_dir: PathBuf,
    /// Heap size in MiB; when absent 80% of available memory is claimed.
    #[serde(default)]
    pub memory_mib: Option<u64>,
    /// Seconds to wait after `SIGTERM` before force-killing the server.
    #[serde(default = "default_kill_grace_seconds")]
    pub kill_grace_seconds: u64,
    /// Console marker lines.
    #[serde(default)]
    pub markers: Markers,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            java: default_java(),
            jar: PathBuf::new(),
            server_dir: PathBuf::new(),
            world_dir: PathBuf::new(),
            snapshot_dir: PathBuf::new(),
            memory_mib: None,
            kill_grace_seconds: default_kill_grace_seconds(),
            markers: Markers::default(),
        }
    }
}

impl WrapperConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file path without validating it.
    ///
    /// Used when command-line flags are layered on top before validation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML.
    pub fn load_unvalidated(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("failed to read config {}: {err}", path.display()))
        })?;
        Self::parse_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config = Self::parse_toml_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration without validating it.
    ///
    /// Used when command-line flags are layered on top of a partial file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the TOML is malformed.
    pub fn parse_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Check that every required setting is present and well-formed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        for (name, path) in [
            ("jar", &self.jar),
            ("server_dir", &self.server_dir),
            ("world_dir", &self.world_dir),
            ("snapshot_dir", &self.snapshot_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(AppError::Config(format!("{name} must be set")));
            }
        }

        if self.java.trim().is_empty() {
            return Err(AppError::Config("java must not be empty".into()));
        }

        if self.memory_mib == Some(0) {
            return Err(AppError::Config(
                "memory_mib must be greater than zero".into(),
            ));
        }

        for (name, marker) in [
            ("markers.ready", &self.markers.ready),
            ("markers.saved", &self.markers.saved),
            ("markers.autosave_enabled", &self.markers.autosave_enabled),
        ] {
            if marker.is_empty() {
                return Err(AppError::Config(format!("{name} must not be empty")));
            }
        }

        Ok(())
    }

    /// Parsed HTTP bind address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `address` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .map_err(|err| AppError::Config(format!("invalid address {:?}: {err}", self.address)))
    }

    /// Grace period between `SIGTERM` and a forced kill.
    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_seconds)
    }

    /// Settings consumed by the built-in tasks.
    #[must_use]
    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            markers: self.markers.clone(),
            world_dir: self.world_dir.clone(),
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }
}
