//! Wiring from the loaded configuration to runtime handles.

use std::sync::Arc;

use vlansync_config::{Config, StoreEngine, TransportKind};
use vlansync_core::{MemoryStore, SqliteStore, VlanStore};
use vlansync_transport::{DeviceTransport, FixtureTransport, SshTransport};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the merged configuration named by `--config`, or the discovered
/// default. Validation is left to the commands that need it.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = vlansync_config::load_config(global.config.as_deref())?;
    match &config.source_path {
        Some(path) => tracing::debug!(path = %path.display(), "configuration loaded"),
        None => tracing::debug!("no configuration file; using defaults and environment"),
    }
    Ok(config)
}

pub fn open_store(config: &Config) -> Result<Arc<dyn VlanStore>, CliError> {
    match config.store.engine {
        StoreEngine::Sqlite => {
            let path = config.store_path();
            tracing::debug!(path = %path.display(), "opening sqlite store");
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        StoreEngine::Memory => {
            tracing::warn!("memory store selected; results are discarded on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn build_transport(config: &Config) -> Result<Arc<dyn DeviceTransport>, CliError> {
    match config.transport.kind {
        TransportKind::Ssh => Ok(Arc::new(SshTransport::new(config.ssh_config()))),
        TransportKind::Fixture => {
            let dir = config.fixture_dir().ok_or_else(|| CliError::Validation {
                field: "transport.fixture_dir".into(),
                reason: "required for the fixture transport".into(),
            })?;
            Ok(Arc::new(FixtureTransport::new(dir)))
        }
    }
}
