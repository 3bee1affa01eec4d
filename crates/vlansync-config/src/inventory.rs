// ── Inventory loading ──
//
// YAML inventory files list hosts under `hosts:`. Entries missing a
// name, host or device type, and repeated names, are skipped with an
// info log; an unreadable or unparseable file fails the whole load.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, info};
use vlansync_transport::{Credentials, DEFAULT_SSH_PORT, DeviceDescriptor};

use crate::{ConfigError, FILE_LIST_SOURCE, InventorySource};

/// On-disk inventory file.
#[derive(Debug, Default, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub hosts: Vec<RawHost>,
}

/// A host entry as written. Fields are optional so one bad entry does not
/// reject the file. Extra connection keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHost {
    pub name: Option<String>,
    #[serde(alias = "ip")]
    pub host: Option<String>,
    pub device_type: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Credentials applied to hosts that do not carry their own.
#[derive(Debug, Clone, Default)]
pub struct CredentialDefaults {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl CredentialDefaults {
    /// `VLANSYNC_USERNAME` / `VLANSYNC_PASSWORD`, falling back to
    /// `USERNAME` / `PASSWORD`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: [&str; 2]| {
            keys.into_iter()
                .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        };
        Self {
            username: first(["VLANSYNC_USERNAME", "USERNAME"]),
            password: first(["VLANSYNC_PASSWORD", "PASSWORD"]).map(SecretString::from),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_owned)
}

impl RawHost {
    /// Build a descriptor, or explain why the entry is unusable.
    fn into_descriptor(self, defaults: &CredentialDefaults) -> Result<DeviceDescriptor, String> {
        let name = non_empty(self.name.as_ref()).ok_or("missing name")?;
        let host = non_empty(self.host.as_ref()).ok_or("missing host")?;
        let device_type = non_empty(self.device_type.as_ref()).ok_or("missing device_type")?;
        let username = self.username.or_else(|| defaults.username.clone());

        // ssh would read these as options.
        if host.starts_with('-') {
            return Err(format!("host '{host}' starts with '-'"));
        }
        if username.as_deref().is_some_and(|u| u.starts_with('-')) {
            return Err("username starts with '-'".into());
        }

        let credentials = Credentials {
            username,
            password: self
                .password
                .map(SecretString::from)
                .or_else(|| defaults.password.clone()),
        };
        Ok(DeviceDescriptor::new(name, host, device_type)
            .with_port(self.port.unwrap_or(DEFAULT_SSH_PORT))
            .with_credentials(credentials))
    }
}

/// Parse one inventory file's hosts, without de-duplication.
fn read_hosts(path: &Path) -> Result<Vec<RawHost>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::InventoryRead {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: InventoryFile =
        serde_yaml::from_str(&text).map_err(|e| ConfigError::InventoryFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(file.hosts)
}

/// Accumulates valid, uniquely named devices across files.
#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    devices: Vec<DeviceDescriptor>,
}

impl Collector {
    fn add_file(&mut self, path: &Path, defaults: &CredentialDefaults) -> Result<(), ConfigError> {
        let hosts = read_hosts(path)?;
        debug!(path = %path.display(), hosts = hosts.len(), "read inventory file");

        for (index, raw) in hosts.into_iter().enumerate() {
            match raw.into_descriptor(defaults) {
                Ok(device) if self.seen.contains(&device.name) => {
                    info!(path = %path.display(), index, device = %device.name, "skipping duplicate device name");
                }
                Ok(device) => {
                    self.seen.insert(device.name.clone());
                    self.devices.push(device);
                }
                Err(reason) => {
                    info!(path = %path.display(), index, %reason, "skipping invalid inventory entry");
                }
            }
        }
        Ok(())
    }
}

/// Load a single inventory file.
pub fn load_inventory_file(
    path: &Path,
    defaults: &CredentialDefaults,
) -> Result<Vec<DeviceDescriptor>, ConfigError> {
    let mut collector = Collector::default();
    collector.add_file(path, defaults)?;
    Ok(collector.devices)
}

/// Load every source. Relative filenames resolve against `base_dir` when
/// given. Source kinds other than `file_list` are skipped.
pub fn load_inventory(
    sources: &BTreeMap<String, Vec<InventorySource>>,
    base_dir: Option<&Path>,
    defaults: &CredentialDefaults,
) -> Result<Vec<DeviceDescriptor>, ConfigError> {
    let mut collector = Collector::default();

    for (kind, entries) in sources {
        if kind != FILE_LIST_SOURCE {
            info!(source = %kind, "skipping unsupported inventory source");
            continue;
        }
        for entry in entries {
            let Some(filename) = entry.filename.as_deref() else {
                info!(source = %kind, "skipping inventory entry without filename");
                continue;
            };
            let path: PathBuf = match base_dir {
                Some(base) if filename.is_relative() => base.join(filename),
                _ => filename.to_path_buf(),
            };
            collector.add_file(&path, defaults)?;
        }
    }

    info!(devices = collector.devices.len(), "inventory loaded");
    Ok(collector.devices)
}
