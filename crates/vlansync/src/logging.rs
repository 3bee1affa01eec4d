//! Tracing subscriber setup.
//!
//! Stderr always gets human-readable logs. When the config names a
//! `logging_file`, a daily-rolling non-blocking file layer is added; the
//! returned guard must live until the process exits or buffered lines are
//! lost.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use vlansync_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Filter directive when `RUST_LOG` is unset.
fn default_directive(global: &GlobalOpts, config: Option<&Config>) -> String {
    match global.verbose {
        0 if global.quiet => "error".into(),
        0 => config.map_or_else(|| "warn".into(), |c| c.poller.logging_level.clone()),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    }
}

fn build_filter(directive: &str) -> Result<EnvFilter, CliError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|e| CliError::Validation {
        field: "poller.logging_level".into(),
        reason: e.to_string(),
    })
}

/// Rolling appender for `path`, keeping `backup_count` rotated files next
/// to the live one.
fn file_appender(path: &Path, backup_count: usize) -> Result<RollingFileAppender, CliError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Validation {
            field: "poller.logging_file".into(),
            reason: format!("'{}' has no file name", path.display()),
        })?;

    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(backup_count + 1)
        .build(dir)
        .map_err(|e| CliError::Validation {
            field: "poller.logging_file".into(),
            reason: e.to_string(),
        })
}

/// Install the global subscriber.
pub fn init(global: &GlobalOpts, config: Option<&Config>) -> Result<Option<WorkerGuard>, CliError> {
    let filter = build_filter(&default_directive(global, config))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match config.and_then(Config::logging_file) {
        Some(path) => {
            let appender = file_appender(&path, config.map_or(0, |c| c.poller.backup_count))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
    Ok(guard)
}
