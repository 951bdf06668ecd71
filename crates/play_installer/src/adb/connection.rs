//! ADB connection management for local and remote devices

use crate::config::TIMING_CONFIG;
use crate::error::{InstallerError, Result};
use std::time::Duration;
use tokio::process::Command;

/// Type of ADB connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Remote,
}

/// A line of `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

impl DeviceInfo {
    /// Online and authorized
    pub fn is_online(&self) -> bool {
        self.status == "device"
    }
}

/// Parse the output of `adb devices -l`
pub fn parse_devices_output(stdout: &str) -> Vec<DeviceInfo> {
    stdout
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                return None;
            }

            let device_id = parts[0].to_string();
            let connection_type = if device_id.contains(':') {
                ConnectionType::Remote
            } else {
                ConnectionType::Usb
            };
            let model = parts[2..]
                .iter()
                .find_map(|part| part.strip_prefix("model:"))
                .map(|s| s.to_string());

            Some(DeviceInfo {
                device_id,
                status: parts[1].to_string(),
                connection_type,
                model,
            })
        })
        .collect()
}

/// Manages ADB connections to Android devices
pub struct AdbConnection {
    adb_path: String,
}

impl AdbConnection {
    /// Create a new ADB connection manager
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
        }
    }

    /// Create a new ADB connection manager with custom ADB path
    pub fn with_path(adb_path: String) -> Self {
        Self { adb_path }
    }

    /// Connect to a remote device via TCP/IP
    pub async fn connect(&self, address: &str, timeout: u64) -> Result<String> {
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:5555", address)
        };

        let output = tokio::time::timeout(
            Duration::from_secs(timeout),
            Command::new(&self.adb_path)
                .arg("connect")
                .arg(&address)
                .output(),
        )
        .await
        .map_err(|_| InstallerError::Timeout(format!("Connection timeout after {}s", timeout)))?
        .map_err(InstallerError::Io)?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        let lower = combined.to_lowercase();
        if lower.contains("already connected") {
            Ok(format!("Already connected to {}", address))
        } else if lower.contains("connected") && !lower.contains("cannot") {
            Ok(format!("Connected to {}", address))
        } else {
            Err(InstallerError::CommandFailed(combined.trim().to_string()))
        }
    }

    /// List all attached devices, whatever their state
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let timeout = TIMING_CONFIG.command.devices_timeout;
        let output = tokio::time::timeout(
            Duration::from_secs_f64(timeout),
            Command::new(&self.adb_path)
                .arg("devices")
                .arg("-l")
                .output(),
        )
        .await
        .map_err(|_| InstallerError::Timeout(format!("List devices timeout after {}s", timeout)))?
        .map_err(InstallerError::Io)?;

        if !output.status.success() {
            return Err(InstallerError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(parse_devices_output(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Serials of devices that are online
    pub async fn online_serials(&self) -> Result<Vec<String>> {
        Ok(self
            .list_devices()
            .await?
            .into_iter()
            .filter(DeviceInfo::is_online)
            .map(|d| d.device_id)
            .collect())
    }
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Quick helper to list connected devices
pub async fn list_devices() -> Result<Vec<DeviceInfo>> {
    AdbConnection::new().list_devices().await
}
