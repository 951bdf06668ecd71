//! play_installer: drive app installs through the Google Play Store UI over ADB
//!
//! This library provides:
//! - ADB plumbing: a command executor, device discovery and device-side operations
//! - Accessibility snapshot parsing and localized button lookup (English, Hebrew)
//! - Classification of "not downloadable" store pages
//! - A per-device install state machine with bounded retries
//! - An orchestrator that runs many devices in parallel and restores their settings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use play_installer::{discover_devices, AdbExecutor, CommandExecutor, DeviceOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> play_installer::Result<()> {
//!     let executor: Arc<dyn CommandExecutor> = Arc::new(AdbExecutor::new());
//!     let serials = executor.connected_serials().await?;
//!     let discovery = discover_devices(executor.as_ref(), &serials).await;
//!
//!     let outcomes = DeviceOrchestrator::new(executor)
//!         .run(discovery.devices, "com.example.app")
//!         .await;
//!     for (device, outcome) in &outcomes {
//!         println!("{}: {:?}", device.id, outcome);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Device access
pub mod adb;
pub mod package;

// Screen understanding
pub mod classifier;
pub mod locator;
pub mod snapshot;

// Install flow
pub mod install;
pub mod orchestrator;
pub mod outcome;
pub mod pull;

#[cfg(test)]
mod testing;

// Re-export commonly used types and functions
pub use error::{InstallFailureKind, InstallerError, NotDownloadable, Result};

// Config re-exports
pub use config::{
    label, phrase, ButtonId, CommandTimingConfig, Language, Phrase, RetryPolicy, TimingConfig,
    SUPPORTED_LANGUAGES, TIMING_CONFIG,
};

// ADB re-exports
pub use adb::{
    discover_device, discover_devices, list_devices, AdbConnection, AdbExecutor, CommandExecutor,
    ConnectionType, Device, DeviceInfo, DeviceShell, Discovery,
};

pub use classifier::classify;
pub use install::{InstallState, InstallStateMachine};
pub use locator::ButtonLocator;
pub use orchestrator::{DeviceOrchestrator, StayAwakeGuard};
pub use outcome::{DeviceReport, FailureCause, InstallOutcome};
pub use package::PackageInfo;
pub use pull::pull_package;
pub use snapshot::{AccessibilitySnapshot, Bounds, InstallProgress, SnapshotMode};
