//! Error types for install automation

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why the storefront refused to install a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstallFailureKind {
    HardwareIncompatible,
    CountryRestricted,
    NetworkUnavailable,
    SignInRequired,
    Paid,
    Unknown,
}

impl fmt::Display for InstallFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HardwareIncompatible => "hardware incompatible",
            Self::CountryRestricted => "country restricted",
            Self::NetworkUnavailable => "network unavailable",
            Self::SignInRequired => "sign-in required",
            Self::Paid => "paid",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified, non-retryable install failure on one device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct NotDownloadable {
    pub kind: InstallFailureKind,
    pub device_model: String,
    pub package: String,
}

impl NotDownloadable {
    pub fn new(
        kind: InstallFailureKind,
        device_model: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            device_model: device_model.into(),
            package: package.into(),
        }
    }

    fn describe(&self) -> String {
        let (pkg, model) = (&self.package, &self.device_model);
        match self.kind {
            InstallFailureKind::HardwareIncompatible => {
                format!("App {pkg} is not compatible with {model}")
            }
            InstallFailureKind::CountryRestricted => {
                format!("App {pkg} is not available in this country on {model}")
            }
            InstallFailureKind::NetworkUnavailable => {
                format!("App {pkg} is not downloadable on {model} over the current network")
            }
            InstallFailureKind::SignInRequired => format!("App {pkg} requires sign in on {model}"),
            InstallFailureKind::Paid => format!("App {pkg} is paid on {model}"),
            InstallFailureKind::Unknown => {
                format!("Unknown error while downloading app {pkg} on {model}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Command timeout: {0}")]
    Timeout(String),

    #[error("Device lost: {0}")]
    DeviceLost(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    NotDownloadable(#[from] NotDownloadable),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InstallerError>;
