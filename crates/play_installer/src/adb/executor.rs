//! Command execution against a single device

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::adb::connection::AdbConnection;
use crate::config::TIMING_CONFIG;
use crate::error::{InstallerError, Result};

/// Request/response channel to a device.
///
/// Every device interaction goes through `execute`; liveness is answered by
/// `connected_serials`. Implementations handle their own transport retries.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `args` against the device `serial`, returning trimmed stdout
    async fn execute(&self, serial: &str, args: &[&str]) -> Result<String>;

    /// Serials that are currently attached and online
    async fn connected_serials(&self) -> Result<Vec<String>>;
}

/// Executes commands through the `adb` binary
#[derive(Debug, Clone)]
pub struct AdbExecutor {
    adb_path: String,
    timeout: Duration,
}

impl AdbExecutor {
    pub fn new() -> Self {
        Self::with_path("adb".to_string())
    }

    /// Create an executor with custom ADB path
    pub fn with_path(adb_path: String) -> Self {
        Self {
            adb_path,
            timeout: Duration::from_secs_f64(TIMING_CONFIG.command.command_timeout),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }
}

impl Default for AdbExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for AdbExecutor {
    async fn execute(&self, serial: &str, args: &[&str]) -> Result<String> {
        debug!("adb -s {} {}", serial, args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.adb_path)
                .arg("-s")
                .arg(serial)
                .args(args)
                .output(),
        )
        .await
        .map_err(|_| {
            InstallerError::Timeout(format!(
                "adb -s {} {} after {}s",
                serial,
                args.join(" "),
                self.timeout.as_secs_f64()
            ))
        })?
        .map_err(InstallerError::Io)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(InstallerError::CommandFailed(format!(
                "adb -s {} {}: {}",
                serial,
                args.join(" "),
                detail
            )));
        }

        Ok(stdout.trim().to_string())
    }

    async fn connected_serials(&self) -> Result<Vec<String>> {
        AdbConnection::with_path(self.adb_path.clone())
            .online_serials()
            .await
    }
}
