//! CLI error types with miette diagnostics.
//!
//! Maps config, store and reconciliation failures into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vlansync_config::ConfigError;
use vlansync_core::{DeviceOutcome, ReconcileSummary, StoreError};
use vlansync_transport::TransportError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Startup ──────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(vlansync::config),
        help(
            "Check the configuration file and VLANSYNC_* environment variables.\n\
             Run: vlansync config show"
        )
    )]
    Config(#[from] ConfigError),

    #[error("No devices found in the inventory")]
    #[diagnostic(
        code(vlansync::no_devices),
        help(
            "Every inventory entry needs a name, host and device_type.\n\
             Run: vlansync devices list -v"
        )
    )]
    NoDevices,

    #[error("Store error: {0}")]
    #[diagnostic(
        code(vlansync::store),
        help("Check store.path in the configuration and that the file is writable.")
    )]
    Store(#[from] StoreError),

    // ── Lookup ───────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(vlansync::not_found),
        help("Run: vlansync {list_command}")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Reconciliation ───────────────────────────────────────────────

    #[error("Authentication failed on all {devices} device(s)")]
    #[diagnostic(
        code(vlansync::auth_failed),
        help(
            "Set credentials per host in the inventory, or export\n\
             VLANSYNC_USERNAME and VLANSYNC_PASSWORD."
        )
    )]
    AuthFailed { devices: usize },

    #[error("Could not connect to any of {devices} device(s)")]
    #[diagnostic(
        code(vlansync::connection_failed),
        help("Check host addresses and ports in the inventory, and that ssh can reach them.")
    )]
    ConnectionFailed { devices: usize },

    #[error("Command timed out on all {devices} device(s)")]
    #[diagnostic(
        code(vlansync::timeout),
        help("Raise poller.command_timeout_secs or pass --timeout.")
    )]
    Timeout { devices: usize },

    #[error("{failed} of {total} device(s) failed to reconcile")]
    #[diagnostic(
        code(vlansync::partial_failure),
        help("See the report above; rerun with -v for per-device logs.")
    )]
    PartialFailure { failed: usize, total: usize },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vlansync::validation))]
    Validation { field: String, reason: String },

    #[error("Refusing to {action} without confirmation")]
    #[diagnostic(
        code(vlansync::confirmation_required),
        help("Pass --yes (-y) when not running interactively.")
    )]
    NotConfirmed { action: String },

    // ── Generic ──────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(vlansync::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::NotConfirmed { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// The error a finished pass should exit with, if any device failed.
    ///
    /// When every attempted device failed with the same kind of transport
    /// error the exit code names that kind; any other mix of failures is a
    /// partial failure.
    pub fn from_summary(summary: &ReconcileSummary) -> Option<Self> {
        let failed = summary.failures();
        if failed == 0 {
            return None;
        }

        let attempted: Vec<&DeviceOutcome> = summary
            .reports
            .iter()
            .map(|r| &r.outcome)
            .filter(|o| !matches!(o, DeviceOutcome::Cancelled))
            .collect();

        let families: Vec<FailureFamily> = attempted
            .iter()
            .map(|o| FailureFamily::of(o))
            .collect();
        let uniform = failed == attempted.len() && families.windows(2).all(|w| w[0] == w[1]);
        if uniform {
            let devices = attempted.len();
            match families.first() {
                Some(FailureFamily::Auth) => return Some(Self::AuthFailed { devices }),
                Some(FailureFamily::Connection) => {
                    return Some(Self::ConnectionFailed { devices });
                }
                Some(FailureFamily::Timeout) => return Some(Self::Timeout { devices }),
                Some(FailureFamily::Other) | None => {}
            }
        }

        Some(Self::PartialFailure {
            failed,
            total: summary.reports.len(),
        })
    }
}

/// Exit-code family of a device outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureFamily {
    Auth,
    Connection,
    Timeout,
    Other,
}

impl FailureFamily {
    fn of(outcome: &DeviceOutcome) -> Self {
        match outcome {
            DeviceOutcome::TransportFailed { error } => match error {
                TransportError::AuthFailure { .. } => Self::Auth,
                TransportError::ConnectFailure { .. } => Self::Connection,
                TransportError::Timeout { .. } => Self::Timeout,
                TransportError::CommandFailed { .. } | TransportError::Io { .. } => Self::Other,
            },
            _ => Self::Other,
        }
    }
}
