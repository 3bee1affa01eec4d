// ── SSH transport ──
//
// Runs a single exec-channel command through the system OpenSSH client.
// Password logins go through `sshpass -e` so the secret never lands on
// the command line. The child is killed if the deadline expires.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::DeviceTransport;
use crate::descriptor::DeviceDescriptor;
use crate::error::TransportError;

/// OpenSSH reserves 255 for its own failures (connect, auth, protocol).
const SSH_ERROR_EXIT: i32 = 255;
/// `sshpass`: invalid/incorrect password.
const SSHPASS_BAD_PASSWORD: i32 = 5;
/// `sshpass`: host public key is unknown.
const SSHPASS_HOST_KEY_UNKNOWN: i32 = 6;

#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Path or name of the `ssh` binary.
    pub ssh_binary: String,
    /// Path or name of the `sshpass` binary, used only for password logins.
    pub sshpass_binary: String,
    pub strict_host_key_checking: bool,
    /// Additional `-o Key=Value` options passed verbatim.
    pub extra_options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_binary: "ssh".into(),
            sshpass_binary: "sshpass".into(),
            strict_host_key_checking: false,
            extra_options: Vec::new(),
        }
    }
}

pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    fn build_command(
        &self,
        device: &DeviceDescriptor,
        command: &str,
        timeout: Duration,
    ) -> Command {
        let mut cmd = if let Some(ref password) = device.credentials.password {
            let mut c = Command::new(&self.config.sshpass_binary);
            c.arg("-e")
                .arg(&self.config.ssh_binary)
                .env("SSHPASS", password.expose_secret());
            c
        } else {
            let mut c = Command::new(&self.config.ssh_binary);
            c.args(["-o", "BatchMode=yes"]);
            c
        };

        let host_keys = if self.config.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };

        cmd.arg("-T")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)))
            .arg("-o")
            .arg(format!("StrictHostKeyChecking={host_keys}"))
            .arg("-p")
            .arg(device.port.to_string());

        for option in &self.config.extra_options {
            cmd.arg("-o").arg(option);
        }
        if let Some(ref user) = device.credentials.username {
            cmd.arg("-l").arg(user);
        }

        // Everything after `--` is destination and remote command.
        cmd.arg("--")
            .arg(&device.host)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl DeviceTransport for SshTransport {
    async fn execute(
        &self,
        device: &DeviceDescriptor,
        command: &str,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        debug!(device = %device.name, host = %device.host, command, "running command over ssh");

        let via_sshpass = device.credentials.password.is_some();
        let child = self
            .build_command(device, command, timeout)
            .spawn()
            .map_err(|e| TransportError::Io {
                host: device.host.clone(),
                message: format!("failed to start ssh client: {e}"),
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| TransportError::Io {
                host: device.host.clone(),
                message: e.to_string(),
            })?,
            // Dropping the future drops the child, which kills it.
            Err(_) => {
                return Err(TransportError::Timeout {
                    host: device.host.clone(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        if output.status.success() {
            let text = String::from_utf8_lossy(&output.stdout).into_owned();
            trace!(device = %device.name, bytes = text.len(), "ssh output received");
            return Ok(text);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(
            &device.host,
            output.status.code(),
            &stderr,
            via_sshpass,
            timeout,
        ))
    }
}

/// Map a failed ssh/sshpass exit into a [`TransportError`].
fn classify_failure(
    host: &str,
    exit_code: Option<i32>,
    stderr: &str,
    via_sshpass: bool,
    timeout: Duration,
) -> TransportError {
    let host = host.to_owned();
    let lowered = stderr.to_lowercase();
    let last_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no diagnostic output")
        .to_owned();

    let Some(code) = exit_code else {
        return TransportError::ConnectFailure {
            host,
            reason: "ssh client terminated by signal".into(),
        };
    };

    match code {
        SSHPASS_BAD_PASSWORD if via_sshpass => TransportError::AuthFailure {
            host,
            message: "password rejected".into(),
        },
        SSHPASS_HOST_KEY_UNKNOWN if via_sshpass => TransportError::ConnectFailure {
            host,
            reason: "host key unknown".into(),
        },
        SSH_ERROR_EXIT => {
            if lowered.contains("permission denied")
                || lowered.contains("authentication failed")
                || lowered.contains("too many authentication failures")
            {
                TransportError::AuthFailure {
                    host,
                    message: last_line,
                }
            } else if lowered.contains("timed out") {
                TransportError::Timeout {
                    host,
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                TransportError::ConnectFailure {
                    host,
                    reason: last_line,
                }
            }
        }
        _ => TransportError::CommandFailed {
            host,
            exit_code: code,
            stderr: stderr.trim().to_owned(),
        },
    }
}
