//! Device transports for vlansync.
//!
//! A transport takes a [`DeviceDescriptor`], a CLI command and a deadline,
//! and hands back the raw text the device printed. Everything above this
//! crate treats it as an opaque "run command, get text or fail" capability.
//!
//! - **[`SshTransport`]**: shells out to the system `ssh` client (and
//!   `sshpass` when a password is configured). Exit status and stderr are
//!   classified into [`TransportError`] variants.
//! - **[`FixtureTransport`]**: replays captured output from
//!   `<dir>/<device name>.txt`. Used for offline runs and tests.

pub mod descriptor;
pub mod error;
pub mod fixture;
pub mod ssh;

use std::time::Duration;

use async_trait::async_trait;

pub use descriptor::{Credentials, DEFAULT_SSH_PORT, DeviceDescriptor};
pub use error::TransportError;
pub use fixture::FixtureTransport;
pub use ssh::{SshConfig, SshTransport};

/// Run a single command on a device and return its raw output.
///
/// Implementations must honour `timeout`; callers may additionally wrap
/// the returned future in their own deadline.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn execute(
        &self,
        device: &DeviceDescriptor,
        command: &str,
        timeout: Duration,
    ) -> Result<String, TransportError>;
}
