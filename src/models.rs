//! Wire-level types shared by the supervisor, the HTTP front end and `ctl`.

use serde::{Deserialize, Serialize};

/// Externally visible server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Process launched, ready marker not yet seen.
    Starting,
    /// Ready marker seen and the process is alive.
    Running,
    /// Process has exited. Terminal.
    Stopped,
}

impl Status {
    /// Lowercase name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET /status`.
///
/// The field is capitalised because the control plane parses the payload
/// produced by the previous wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Current status.
    #[serde(rename = "Status")]
    pub status: Status,
}

/// Error body returned by every failing HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// A console line as seen by observers of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    /// Line text without its terminator.
    pub text: String,
    /// Name of the task that observed the line, if one was current.
    pub owner: Option<&'static str>,
}
