//! Install state machine driving one device through the Play Store UI

use tracing::{debug, info, warn};

use crate::adb::{CommandExecutor, Device, DeviceShell};
use crate::classifier::classify;
use crate::config::{ButtonId, RetryPolicy};
use crate::error::{InstallFailureKind, InstallerError, NotDownloadable, Result};
use crate::install::state::InstallState;
use crate::locator::ButtonLocator;
use crate::package::PackageInfo;
use crate::snapshot::{describe_progress, Bounds, SnapshotMode};

/// Drives one device from "whatever the store page shows" to an open button.
///
/// Every phase has its own retry ceiling from the `RetryPolicy`, and restarts
/// from `Probe` are capped by `max_cycles`, so a run always terminates.
pub struct InstallStateMachine<'a> {
    device: &'a Device,
    package: &'a str,
    shell: DeviceShell<'a>,
    locator: ButtonLocator<'a>,
    policy: RetryPolicy,
    cycles: u32,
}

impl<'a> InstallStateMachine<'a> {
    pub fn new(
        device: &'a Device,
        executor: &'a dyn CommandExecutor,
        package: &'a str,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            device,
            package,
            shell: DeviceShell::new(device, executor),
            locator: ButtonLocator::new(device, executor),
            policy,
            cycles: 0,
        }
    }

    /// Run to a terminal state.
    ///
    /// Returns the installed package on `Ready`; a classified failure comes
    /// back as `InstallerError::NotDownloadable`.
    pub async fn run(&mut self) -> Result<PackageInfo> {
        self.cycles = 0;
        let mut state = InstallState::Probe;

        loop {
            let next = self.step(&state).await?;
            if !state.can_transition_to(&next) {
                return Err(InstallerError::InvalidTransition(format!(
                    "{} -> {}",
                    state.name(),
                    next.name()
                )));
            }
            debug!("{}: {} -> {}", self.device.id, state.name(), next.name());
            state = next;

            match state {
                InstallState::Ready => {
                    let info = self.shell.package_info(self.package).await?;
                    info!(
                        "{}: {} {} ({}) ready",
                        self.device.model, info.name, info.version_name, info.version_code
                    );
                    return Ok(info);
                }
                InstallState::Failed(kind) => {
                    return Err(NotDownloadable::new(kind, &self.device.model, self.package).into());
                }
                _ => {}
            }
        }
    }

    /// Compute the successor of `state`
    pub async fn step(&mut self, state: &InstallState) -> Result<InstallState> {
        match state {
            InstallState::Probe => self.probe().await,
            InstallState::NotInstalled => self.show_store_page().await,
            InstallState::AwaitingInstallButton { attempt } => self.find_install_button(*attempt).await,
            InstallState::Installing { bounds } => self.install(*bounds).await,
            InstallState::InstalledAwaitingOpen { attempt } => self.settle(*attempt).await,
            InstallState::UpdatePending { previous } => self.await_update(*previous).await,
            InstallState::Ready | InstallState::Failed(_) => Err(InstallerError::InvalidTransition(
                format!("{} is terminal", state.name()),
            )),
        }
    }

    async fn pause(&self) {
        if !self.policy.poll_interval.is_zero() {
            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    async fn probe(&mut self) -> Result<InstallState> {
        self.cycles += 1;
        if self.cycles > self.policy.max_cycles {
            warn!(
                "{}: gave up on {} after {} cycles",
                self.device.model, self.package, self.policy.max_cycles
            );
            return Ok(InstallState::Failed(InstallFailureKind::Unknown));
        }

        if self
            .locator
            .locate(ButtonId::Open, SnapshotMode::Fresh)
            .await?
            .is_some()
        {
            return Ok(InstallState::Ready);
        }

        if self.shell.is_package_installed(self.package).await? {
            Ok(InstallState::InstalledAwaitingOpen { attempt: 0 })
        } else {
            Ok(InstallState::NotInstalled)
        }
    }

    async fn show_store_page(&self) -> Result<InstallState> {
        if !self.shell.is_on_play_store().await? {
            self.shell.launch_package_screen(self.package).await?;
        }
        Ok(InstallState::AwaitingInstallButton { attempt: 0 })
    }

    async fn find_install_button(&self, attempt: u32) -> Result<InstallState> {
        if let Some(bounds) = self
            .locator
            .locate(ButtonId::Install, SnapshotMode::Fresh)
            .await?
        {
            return Ok(InstallState::Installing { bounds });
        }

        let snapshot = self.locator.snapshot(SnapshotMode::Reuse).await?;
        if let Some(kind) = classify(snapshot.text(), &self.device.language)? {
            warn!("{}: {} not installable: {}", self.device.model, self.package, kind);
            return Ok(InstallState::Failed(kind));
        }

        if attempt + 1 >= self.policy.max_retries.max(1) {
            return Ok(InstallState::Failed(InstallFailureKind::Unknown));
        }
        self.pause().await;
        Ok(InstallState::AwaitingInstallButton {
            attempt: attempt + 1,
        })
    }

    async fn install(&self, bounds: Bounds) -> Result<InstallState> {
        info!("{}: installing {}", self.device.model, self.package);
        self.shell.tap(bounds).await?;

        for poll in 0..self.policy.install_poll_retries {
            self.pause().await;
            let snapshot = self.locator.snapshot(SnapshotMode::Fresh).await?;

            if let Some(accept) = self.locator.find(&snapshot, ButtonId::Accept)? {
                debug!("{}: accepting permissions prompt", self.device.id);
                self.shell.tap(accept).await?;
                continue;
            }

            if self.locator.find(&snapshot, ButtonId::Cancel)?.is_none() {
                debug!("{}: download indicator gone after {} polls", self.device.id, poll + 1);
                return Ok(InstallState::Probe);
            }

            let progress = describe_progress(snapshot.text(), &self.device.language)?;
            info!("{}: {}", self.device.model, progress);
        }

        warn!(
            "{}: install of {} stalled after {} polls",
            self.device.model, self.package, self.policy.install_poll_retries
        );
        Ok(InstallState::Probe)
    }

    async fn settle(&self, attempt: u32) -> Result<InstallState> {
        let snapshot = self.locator.snapshot(SnapshotMode::Fresh).await?;
        if self.locator.find(&snapshot, ButtonId::Open)?.is_some() {
            return Ok(InstallState::Ready);
        }

        if let Some(update) = self.locator.find(&snapshot, ButtonId::Update)? {
            let previous = self.shell.package_info(self.package).await?.version_code;
            info!(
                "{}: updating {} from version {}",
                self.device.model, self.package, previous
            );
            self.shell.tap(update).await?;
            return Ok(InstallState::UpdatePending { previous });
        }

        if let Some(enable) = self.locator.find(&snapshot, ButtonId::Enable)? {
            info!("{}: enabling {}", self.device.model, self.package);
            self.shell.tap(enable).await?;
        }

        if attempt + 1 >= self.policy.max_retries.max(1) {
            warn!(
                "{}: {} installed but not openable yet",
                self.device.model, self.package
            );
            return Ok(InstallState::Probe);
        }
        self.pause().await;
        Ok(InstallState::InstalledAwaitingOpen {
            attempt: attempt + 1,
        })
    }

    async fn await_update(&self, previous: u64) -> Result<InstallState> {
        match self.wait_for_version_change(previous).await? {
            Some(info) => {
                info!(
                    "{}: {} updated {} -> {}",
                    self.device.model, self.package, previous, info.version_code
                );
                Ok(InstallState::InstalledAwaitingOpen { attempt: 0 })
            }
            None => {
                warn!(
                    "{}: {} still at version {} after {} checks",
                    self.device.model, self.package, previous, self.policy.update_poll_retries
                );
                Ok(InstallState::Probe)
            }
        }
    }

    /// Re-query package metadata until its version code differs from `previous`
    pub async fn wait_for_version_change(&self, previous: u64) -> Result<Option<PackageInfo>> {
        for _ in 0..self.policy.update_poll_retries {
            let info = self.shell.package_info(self.package).await?;
            if info.version_code != previous {
                return Ok(Some(info));
            }
            self.pause().await;
        }
        Ok(None)
    }
}
