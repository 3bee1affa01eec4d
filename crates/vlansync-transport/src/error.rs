// ── Transport error types ──
//
// Every failure a transport can report. All variants are recoverable:
// the reconciler maps them onto a per-device `TransportFailed` outcome.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    #[error("{host}: command timed out after {timeout_secs}s")]
    Timeout { host: String, timeout_secs: u64 },

    #[error("{host}: authentication failed: {message}")]
    AuthFailure { host: String, message: String },

    #[error("{host}: cannot connect: {reason}")]
    ConnectFailure { host: String, reason: String },

    #[error("{host}: command exited with status {exit_code}: {stderr}")]
    CommandFailed {
        host: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("{host}: I/O error: {message}")]
    Io { host: String, message: String },
}

impl TransportError {
    /// Short machine-readable label, used in logs and report tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::AuthFailure { .. } => "auth_failure",
            Self::ConnectFailure { .. } => "connect_failure",
            Self::CommandFailed { .. } => "command_failed",
            Self::Io { .. } => "io",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
