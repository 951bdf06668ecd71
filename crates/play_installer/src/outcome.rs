//! Per-device results of an install run

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::adb::Device;
use crate::error::{InstallFailureKind, InstallerError};
use crate::package::PackageInfo;

/// Why a device ended without the package ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureCause {
    NotDownloadable(InstallFailureKind),
    DeviceLost,
    CommandFailed,
    UnsupportedLanguage,
    /// Parse errors, broken transitions and crashed workers
    Internal,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDownloadable(kind) => write!(f, "not downloadable ({})", kind),
            Self::DeviceLost => f.write_str("device lost"),
            Self::CommandFailed => f.write_str("command failed"),
            Self::UnsupportedLanguage => f.write_str("unsupported language"),
            Self::Internal => f.write_str("internal error"),
        }
    }
}

/// Terminal result for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InstallOutcome {
    Success(PackageInfo),
    Failure(FailureCause, String),
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure_cause(&self) -> Option<FailureCause> {
        match self {
            Self::Success(_) => None,
            Self::Failure(cause, _) => Some(*cause),
        }
    }

    /// Map an error that ended a device's run to its outcome
    pub fn from_error(err: &InstallerError) -> Self {
        let cause = match err {
            InstallerError::NotDownloadable(e) => FailureCause::NotDownloadable(e.kind),
            InstallerError::DeviceLost(_) => FailureCause::DeviceLost,
            InstallerError::UnsupportedLanguage(_) => FailureCause::UnsupportedLanguage,
            InstallerError::CommandFailed(_) | InstallerError::Timeout(_) | InstallerError::Io(_) => {
                FailureCause::CommandFailed
            }
            InstallerError::ParseError(_) | InstallerError::InvalidTransition(_) => {
                FailureCause::Internal
            }
        };
        Self::Failure(cause, err.to_string())
    }
}

/// Outcome of one device together with timing, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device: Device,
    pub outcome: InstallOutcome,
    pub elapsed_ms: u64,
    pub finished_at: String,
}

impl DeviceReport {
    pub fn new(device: Device, outcome: InstallOutcome, elapsed: Duration) -> Self {
        Self {
            device,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_at: Local::now().to_rfc3339(),
        }
    }
}
