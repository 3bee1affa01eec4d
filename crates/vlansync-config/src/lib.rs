//! Configuration for vlansync.
//!
//! A YAML (or TOML) config file, `VLANSYNC_` environment overrides,
//! inventory files and credential resolution. Produces the
//! `ReconcilerConfig`, `SshConfig` and `DeviceDescriptor`s the engine
//! consumes. The CLI layers its flag overrides on top.

pub mod inventory;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vlansync_core::ReconcilerConfig;
use vlansync_transport::{DeviceDescriptor, SshConfig};

pub use inventory::{CredentialDefaults, InventoryFile, RawHost, load_inventory, load_inventory_file};

pub const ENV_PREFIX: &str = "VLANSYNC_";

/// Inventory source kind backed by local YAML files.
pub const FILE_LIST_SOURCE: &str = "file_list";

/// Looked up in the working directory, in order, when no path is given.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "vlansync.yml",
    "vlansync.yaml",
    "vlansync.toml",
    "vlan_sync_cfg.yml",
];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("refusing to overwrite existing config at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot read inventory file {}: {source}", path.display())]
    InventoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed inventory file {}: {message}", path.display())]
    InventoryFormat { path: PathBuf, message: String },

    #[error("failed to serialize config: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Source kind (`file_list`, `remote_api_urls`, ...) → entries.
    #[serde(default)]
    pub inventory_sources: BTreeMap<String, Vec<InventorySource>>,
    /// File the config was read from; relative paths resolve against its
    /// directory.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub workers: usize,
    pub command: String,
    pub command_timeout_secs: u64,
    /// Seconds between passes; 0 runs a single pass.
    pub polling_interval_secs: u64,
    pub logging_file: Option<PathBuf>,
    pub logging_level: String,
    /// Rotated log files kept next to `logging_file`.
    pub backup_count: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            workers: vlansync_core::DEFAULT_WORKERS,
            command: "show vlan".into(),
            command_timeout_secs: vlansync_core::DEFAULT_COMMAND_TIMEOUT.as_secs(),
            polling_interval_secs: 0,
            logging_file: None,
            logging_level: "info".into(),
            backup_count: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreEngine {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub engine: StoreEngine,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            engine: StoreEngine::Sqlite,
            path: PathBuf::from("vlan_sync.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Ssh,
    Fixture,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Captured outputs for the fixture transport.
    pub fixture_dir: Option<PathBuf>,
    pub ssh_binary: String,
    pub sshpass_binary: String,
    pub strict_host_key_checking: bool,
    /// Extra `-o` options for every ssh invocation.
    pub ssh_options: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let ssh = SshConfig::default();
        Self {
            kind: TransportKind::Ssh,
            fixture_dir: None,
            ssh_binary: ssh.ssh_binary,
            sshpass_binary: ssh.sshpass_binary,
            strict_host_key_checking: ssh.strict_host_key_checking,
            ssh_options: ssh.extra_options,
        }
    }
}

/// One entry under an inventory source kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InventorySource {
    pub filename: Option<PathBuf>,
    pub url: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config file location (`~/.config/vlansync/config.yml` on Linux).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "vlansync", "vlansync").map_or_else(
        || PathBuf::from(".vlansync").join("config.yml"),
        |dirs| dirs.config_dir().join("config.yml"),
    )
}

/// First existing candidate: working-directory names, then the platform path.
pub fn discover_config_path() -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(PathBuf::from)
        .chain(std::iter::once(config_path()))
        .find(|p| p.is_file())
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from defaults, the file, then `VLANSYNC_*` variables.
///
/// An explicit path must exist. Without one, the first discovered file is
/// used, or defaults alone when there is none. Nested keys use `__`
/// (`VLANSYNC_POLLER__WORKERS=8`). Not validated; call [`Config::validate`]
/// after applying overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) if !p.is_file() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => Some(p.to_path_buf()),
        None => discover_config_path(),
    };

    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
    if let Some(ref p) = path {
        figment = if is_toml(p) {
            figment.merge(Toml::file(p))
        } else {
            figment.merge(Yaml::file(p))
        };
    }
    figment = figment.merge(
        Env::prefixed(ENV_PREFIX)
            .split("__")
            .ignore(&["username", "password", "config"]),
    );

    let mut config: Config = figment.extract()?;
    config.source_path = path;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize `config` to `path` (TOML for `.toml`, YAML otherwise).
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let text = if is_toml(path) {
        toml::to_string_pretty(config).map_err(|e| ConfigError::Serialization(e.to_string()))?
    } else {
        serde_yaml::to_string(config).map_err(|e| ConfigError::Serialization(e.to_string()))?
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Configuration written by `config init`.
pub fn starter_config() -> Config {
    let mut config = Config::default();
    config.poller.logging_file = Some(PathBuf::from("logs/vlansync.log"));
    config.inventory_sources.insert(
        FILE_LIST_SOURCE.into(),
        vec![InventorySource {
            filename: Some(PathBuf::from("inventory.yml")),
            url: None,
        }],
    );
    config
}

/// Write [`starter_config`] to `path`. Existing files are kept unless
/// `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<Config, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let config = starter_config();
    save_config(&config, path)?;
    Ok(config)
}

// ── Derived settings ────────────────────────────────────────────────

impl Config {
    /// Directory relative paths in this config resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match self.base_dir() {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.workers == 0 {
            return Err(invalid("poller.workers", "must be at least 1"));
        }
        if self.poller.command.trim().is_empty() {
            return Err(invalid("poller.command", "must not be empty"));
        }
        if self.poller.command_timeout_secs == 0 {
            return Err(invalid("poller.command_timeout_secs", "must be at least 1"));
        }
        if self.inventory_sources.is_empty() {
            return Err(invalid("inventory_sources", "no inventory sources configured"));
        }
        if let Some(entries) = self.inventory_sources.get(FILE_LIST_SOURCE) {
            if let Some(pos) = entries.iter().position(|e| e.filename.is_none()) {
                return Err(invalid(
                    &format!("inventory_sources.{FILE_LIST_SOURCE}[{pos}].filename"),
                    "is required",
                ));
            }
        }
        if self.store.engine == StoreEngine::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(invalid("store.path", "required for the sqlite engine"));
        }
        if self.transport.kind == TransportKind::Fixture && self.transport.fixture_dir.is_none() {
            return Err(invalid("transport.fixture_dir", "required for the fixture transport"));
        }
        if self.transport.kind == TransportKind::Ssh && self.transport.ssh_binary.trim().is_empty() {
            return Err(invalid("transport.ssh_binary", "must not be empty"));
        }
        Ok(())
    }

    /// Replace every inventory source with a single file. Relative paths
    /// are taken from the working directory.
    pub fn override_inventory(&mut self, path: &Path) -> Result<(), ConfigError> {
        let path = if path.is_relative() {
            std::env::current_dir()?.join(path)
        } else {
            path.to_path_buf()
        };
        self.inventory_sources.clear();
        self.inventory_sources.insert(
            FILE_LIST_SOURCE.into(),
            vec![InventorySource {
                filename: Some(path),
                url: None,
            }],
        );
        Ok(())
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            workers: self.poller.workers,
            command_timeout: Duration::from_secs(self.poller.command_timeout_secs),
        }
    }

    pub fn ssh_config(&self) -> SshConfig {
        SshConfig {
            ssh_binary: self.transport.ssh_binary.clone(),
            sshpass_binary: self.transport.sshpass_binary.clone(),
            strict_host_key_checking: self.transport.strict_host_key_checking,
            extra_options: self.transport.ssh_options.clone(),
        }
    }

    /// `None` means run a single pass.
    pub fn polling_interval(&self) -> Option<Duration> {
        (self.poller.polling_interval_secs > 0)
            .then(|| Duration::from_secs(self.poller.polling_interval_secs))
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve_path(&self.store.path)
    }

    pub fn fixture_dir(&self) -> Option<PathBuf> {
        self.transport
            .fixture_dir
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    pub fn logging_file(&self) -> Option<PathBuf> {
        self.poller
            .logging_file
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    /// Load every configured inventory source into device descriptors.
    pub fn load_inventory(
        &self,
        credentials: &CredentialDefaults,
    ) -> Result<Vec<DeviceDescriptor>, ConfigError> {
        load_inventory(&self.inventory_sources, self.base_dir(), credentials)
    }
}
