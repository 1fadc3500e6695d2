//! Error types shared across the wrapper.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The server process could not be started.
    Launch(String),
    /// Reading from or writing to the server console failed.
    Io(String),
    /// A console command was empty or spanned several lines.
    InvalidCommand(String),
    /// The operation was requested after the server process stopped.
    NotRunning(String),
    /// A task was dropped at shutdown before it delivered a result.
    Abandoned(String),
    /// Copying the world directory for a snapshot failed.
    Snapshot(String),
    /// HTTP front end failed to bind or serve.
    Http(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Self::NotRunning(msg) => write!(f, "not running: {msg}"),
            Self::Abandoned(msg) => write!(f, "abandoned: {msg}"),
            Self::Snapshot(msg) => write!(f, "snapshot: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
