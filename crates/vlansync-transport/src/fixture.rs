// ── Fixture transport ──
//
// Replays captured device output from disk instead of talking to a
// device. The command is ignored: each device has exactly one capture.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::DeviceTransport;
use crate::descriptor::DeviceDescriptor;
use crate::error::TransportError;

/// Reads `<dir>/<device name>.txt` for every request.
#[derive(Debug, Clone)]
pub struct FixtureTransport {
    dir: PathBuf,
}

impl FixtureTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn capture_path(&self, device: &DeviceDescriptor) -> PathBuf {
        self.dir.join(format!("{}.txt", device.name))
    }
}

#[async_trait]
impl DeviceTransport for FixtureTransport {
    async fn execute(
        &self,
        device: &DeviceDescriptor,
        command: &str,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let path = self.capture_path(device);
        debug!(device = %device.name, command, path = %path.display(), "replaying fixture");

        match tokio::time::timeout(timeout, tokio::fs::read(&path)).await {
            Ok(Ok(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Err(TransportError::ConnectFailure {
                host: device.host.clone(),
                reason: format!("no fixture at {}", path.display()),
            }),
            Ok(Err(e)) => Err(TransportError::Io {
                host: device.host.clone(),
                message: format!("{}: {e}", path.display()),
            }),
            Err(_) => Err(TransportError::Timeout {
                host: device.host.clone(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}
