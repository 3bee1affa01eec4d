// ── Device descriptors ──
//
// Connection parameters for one network device. Produced by inventory
// loading, consumed read-only by the reconciler and the transports.

use secrecy::SecretString;
use serde::Serialize;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Login credentials for a device.
///
/// `Debug` comes from `SecretString`, which redacts the password.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Credentials {
    /// Login user. `None` lets the SSH client pick its default.
    pub username: Option<String>,
    /// Password. `None` means key-based authentication.
    #[serde(skip)]
    pub password: Option<SecretString>,
}

/// One network device to poll.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    /// Unique device identity key (also the per-device store scope).
    pub name: String,
    /// Hostname or IP address.
    pub host: String,
    pub port: u16,
    /// Netmiko-style platform name, e.g. `cisco_ios`.
    pub device_type: String,
    pub credentials: Credentials,
}

impl DeviceDescriptor {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            device_type: device_type.into(),
            credentials: Credentials::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}
