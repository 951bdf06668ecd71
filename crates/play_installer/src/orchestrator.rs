//! Runs the install state machine across many devices at once

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adb::{CommandExecutor, Device, DeviceShell, STAY_ON_ALL_SOURCES};
use crate::config::{Language, RetryPolicy, TIMING_CONFIG};
use crate::error::{InstallerError, Result};
use crate::install::InstallStateMachine;
use crate::outcome::{DeviceReport, FailureCause, InstallOutcome};
use crate::package::PackageInfo;

/// Keeps the screen on for the lifetime of a device worker.
///
/// `release` restores the device's previous `stay_on_while_plugged_in`
/// value. If the guard is dropped without being released (the worker was
/// cancelled or panicked) the restore is spawned onto the runtime instead.
pub struct StayAwakeGuard {
    executor: Arc<dyn CommandExecutor>,
    device: Device,
    released: bool,
}

impl StayAwakeGuard {
    pub async fn acquire(executor: Arc<dyn CommandExecutor>, device: &Device) -> Result<Self> {
        DeviceShell::new(device, executor.as_ref())
            .set_stay_on_while_plugged_in(STAY_ON_ALL_SOURCES)
            .await?;
        Ok(Self {
            executor,
            device: device.clone(),
            released: false,
        })
    }

    pub async fn release(mut self) {
        self.released = true;
        restore_stay_on(self.executor.as_ref(), &self.device).await;
    }
}

impl Drop for StayAwakeGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let executor = Arc::clone(&self.executor);
        let device = self.device.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    restore_stay_on(executor.as_ref(), &device).await;
                });
            }
            Err(_) => warn!(
                "{}: no runtime left to restore stay_on_while_plugged_in",
                device.id
            ),
        }
    }
}

async fn restore_stay_on(executor: &dyn CommandExecutor, device: &Device) {
    let shell = DeviceShell::new(device, executor);
    match shell
        .set_stay_on_while_plugged_in(device.stay_on_while_plugged_in)
        .await
    {
        Ok(()) => debug!(
            "{}: restored stay_on_while_plugged_in = {}",
            device.id, device.stay_on_while_plugged_in
        ),
        Err(e) => warn!(
            "{}: failed to restore stay_on_while_plugged_in: {}",
            device.id, e
        ),
    }
}

/// Installs one package on a set of devices, one worker per device
pub struct DeviceOrchestrator {
    executor: Arc<dyn CommandExecutor>,
    policy: RetryPolicy,
    pool_size: Option<usize>,
}

impl DeviceOrchestrator {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            policy: TIMING_CONFIG.retry.clone(),
            pool_size: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Limit concurrent workers; defaults to one per device
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Install `package` on every device and map each device to its outcome
    pub async fn run(&self, devices: Vec<Device>, package: &str) -> HashMap<Device, InstallOutcome> {
        self.run_reports(devices, package)
            .await
            .into_iter()
            .map(|report| (report.device, report.outcome))
            .collect()
    }

    /// Like `run`, keeping timing per device, in completion order.
    ///
    /// Devices are keyed by serial; repeats are driven once.
    pub async fn run_reports(&self, devices: Vec<Device>, package: &str) -> Vec<DeviceReport> {
        let mut seen = HashSet::new();
        let devices: Vec<Device> = devices
            .into_iter()
            .filter(|device| {
                let first = seen.insert(device.id.clone());
                if !first {
                    warn!("{}: listed more than once, driving it once", device.id);
                }
                first
            })
            .collect();
        if devices.is_empty() {
            return Vec::new();
        }

        let pool_size = self.pool_size.unwrap_or(devices.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(pool_size));
        let run_id = Uuid::new_v4();
        info!(
            "Installing {} on {} device(s), {} at a time (run {})",
            package,
            devices.len(),
            pool_size,
            run_id
        );

        let mut pending: FuturesUnordered<_> = devices
            .into_iter()
            .map(|device| {
                let executor = Arc::clone(&self.executor);
                let semaphore = Arc::clone(&semaphore);
                let policy = self.policy.clone();
                let package = package.to_string();
                let worker_device = device.clone();
                let span = info_span!(
                    "device",
                    serial = %device.id,
                    model = %device.model,
                    run = %run_id
                );

                let handle = tokio::spawn(
                    async move {
                        let _permit = semaphore.acquire_owned().await;
                        let started = Instant::now();
                        let outcome = run_device(executor, &worker_device, &package, policy).await;
                        (outcome, started.elapsed())
                    }
                    .instrument(span),
                );

                async move { (device, handle.await) }
            })
            .collect();

        let mut reports = Vec::with_capacity(pending.len());
        while let Some((device, joined)) = pending.next().await {
            let (outcome, elapsed) = joined.unwrap_or_else(|e| {
                error!("{}: worker aborted: {}", device.id, e);
                (
                    InstallOutcome::Failure(FailureCause::Internal, format!("worker aborted: {e}")),
                    Duration::ZERO,
                )
            });

            match &outcome {
                InstallOutcome::Success(info) => info!(
                    "{} ({}): installed {} {}",
                    device.model, device.id, info.name, info.version_name
                ),
                InstallOutcome::Failure(cause, message) => warn!(
                    "{} ({}): {}: {}",
                    device.model, device.id, cause, message
                ),
            }
            reports.push(DeviceReport::new(device, outcome, elapsed));
        }
        reports
    }
}

/// Worker body for one device; never fails, every error becomes an outcome
async fn run_device(
    executor: Arc<dyn CommandExecutor>,
    device: &Device,
    package: &str,
    policy: RetryPolicy,
) -> InstallOutcome {
    match install_on_device(Arc::clone(&executor), device, package, policy).await {
        Ok(info) => InstallOutcome::Success(info),
        Err(err @ (InstallerError::CommandFailed(_) | InstallerError::Timeout(_))) => {
            let shell = DeviceShell::new(device, executor.as_ref());
            if shell.is_still_connected().await.unwrap_or(false) {
                InstallOutcome::from_error(&err)
            } else {
                InstallOutcome::from_error(&InstallerError::DeviceLost(format!(
                    "{} ({}) disconnected: {}",
                    device.model, device.id, err
                )))
            }
        }
        Err(err) => InstallOutcome::from_error(&err),
    }
}

async fn install_on_device(
    executor: Arc<dyn CommandExecutor>,
    device: &Device,
    package: &str,
    policy: RetryPolicy,
) -> Result<PackageInfo> {
    Language::from_code(&device.language)?;

    let guard = StayAwakeGuard::acquire(Arc::clone(&executor), device).await?;
    let result = install_with_screen_on(executor.as_ref(), device, package, policy).await;
    guard.release().await;
    result
}

async fn install_with_screen_on(
    executor: &dyn CommandExecutor,
    device: &Device,
    package: &str,
    policy: RetryPolicy,
) -> Result<PackageInfo> {
    let shell = DeviceShell::new(device, executor);
    if !shell.is_unlocked().await? {
        warn!("{}: screen is locked, taps may not land", device.model);
    }
    if !shell.is_package_installed(package).await? {
        shell.launch_package_screen(package).await?;
    }

    InstallStateMachine::new(device, executor, package, policy)
        .run()
        .await
}
