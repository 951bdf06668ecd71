//! Device-side operations used by the installer

use tracing::{debug, info};

use crate::adb::device::Device;
use crate::adb::executor::CommandExecutor;
use crate::error::{InstallerError, Result};
use crate::package::PackageInfo;
use crate::snapshot::{AccessibilitySnapshot, Bounds, SnapshotMode};

/// Package name of the Google Play Store
pub const PLAY_STORE_PACKAGE: &str = "com.android.vending";

/// Where `uiautomator dump` writes the accessibility tree
pub const WINDOW_DUMP_PATH: &str = "/sdcard/window_dump.xml";

/// Keep the screen on for AC, USB and wireless power
pub const STAY_ON_ALL_SOURCES: i32 = 7;

/// Operations on one device, issued through a `CommandExecutor`
#[derive(Clone, Copy)]
pub struct DeviceShell<'a> {
    device: &'a Device,
    executor: &'a dyn CommandExecutor,
}

impl<'a> DeviceShell<'a> {
    pub fn new(device: &'a Device, executor: &'a dyn CommandExecutor) -> Self {
        Self { device, executor }
    }

    pub fn device(&self) -> &'a Device {
        self.device
    }

    /// Run a command in the device shell
    pub async fn shell(&self, args: &[&str]) -> Result<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        self.executor.execute(&self.device.id, &full).await
    }

    pub async fn is_still_connected(&self) -> Result<bool> {
        Ok(self
            .executor
            .connected_serials()
            .await?
            .iter()
            .any(|serial| serial == &self.device.id))
    }

    /// Liveness probe run before anything that changes device state
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.is_still_connected().await? {
            Ok(())
        } else {
            Err(InstallerError::DeviceLost(format!(
                "{} ({}) is no longer connected",
                self.device.model, self.device.id
            )))
        }
    }

    pub async fn get_setting(&self, namespace: &str, key: &str) -> Result<String> {
        self.shell(&["settings", "get", namespace, key]).await
    }

    pub async fn put_setting(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.shell(&["settings", "put", namespace, key, value]).await?;
        Ok(())
    }

    pub async fn set_stay_on_while_plugged_in(&self, value: i32) -> Result<()> {
        self.ensure_connected().await?;
        debug!("{}: stay_on_while_plugged_in = {}", self.device.id, value);
        self.put_setting("global", "stay_on_while_plugged_in", &value.to_string())
            .await
    }

    /// APK paths of an installed package
    pub async fn package_paths(&self, package: &str) -> Result<Vec<String>> {
        let output = self.shell(&["pm", "path", package]).await?;
        Ok(crate::package::parse_pm_paths(&output))
    }

    /// Query fresh package metadata; never cached
    pub async fn package_info(&self, package: &str) -> Result<PackageInfo> {
        let paths = self.shell(&["pm", "path", package]).await?;
        let dumpsys = self.shell(&["dumpsys", "package", package]).await?;
        PackageInfo::from_dumpsys(package, &paths, &dumpsys)
    }

    pub async fn is_package_installed(&self, package: &str) -> Result<bool> {
        let wanted = format!("package:{}", package);
        let output = self.shell(&["pm", "list", "packages", package]).await?;
        Ok(output.lines().any(|line| line.trim() == wanted))
    }

    /// No keyguard or dream on screen
    pub async fn is_unlocked(&self) -> Result<bool> {
        let output = self.shell(&["dumpsys", "window"]).await?;
        Ok(output.contains("mShowingDream=false mDreamingLockscreen=false"))
    }

    /// Whether the Play Store holds the resumed activity
    pub async fn is_on_play_store(&self) -> Result<bool> {
        let output = self.shell(&["dumpsys", "activity", "activities"]).await?;
        Ok(output
            .lines()
            .filter(|line| line.contains("ResumedActivity"))
            .any(|line| line.contains(PLAY_STORE_PACKAGE)))
    }

    /// Open the package page in the Play Store
    pub async fn launch_package_screen(&self, package: &str) -> Result<()> {
        self.ensure_connected().await?;
        info!("{}: opening store page for {}", self.device.model, package);
        let uri = format!("market://details?id={}", package);
        self.shell(&[
            "am",
            "start",
            "-a",
            "android.intent.action.VIEW",
            "-d",
            &uri,
            "-p",
            PLAY_STORE_PACKAGE,
        ])
        .await?;
        Ok(())
    }

    /// Read the accessibility tree; `Fresh` regenerates it first
    pub async fn dump_screen(&self, mode: SnapshotMode) -> Result<AccessibilitySnapshot> {
        if mode == SnapshotMode::Fresh {
            self.shell(&["rm", "-f", WINDOW_DUMP_PATH]).await?;
            self.shell(&["uiautomator", "dump", WINDOW_DUMP_PATH]).await?;
        }
        let text = self.shell(&["cat", WINDOW_DUMP_PATH]).await?;
        Ok(AccessibilitySnapshot::new(text, mode))
    }

    /// Tap the center of `bounds`, after checking the device is still there
    pub async fn tap(&self, bounds: Bounds) -> Result<()> {
        self.ensure_connected().await?;
        let (x, y) = bounds.center();
        debug!("{}: tap {} at ({}, {})", self.device.id, bounds, x, y);
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .await?;
        Ok(())
    }

    /// Copy a file from the device to the host
    pub async fn pull(&self, src: &str, dest: &str) -> Result<()> {
        self.executor
            .execute(&self.device.id, &["pull", src, dest])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAdb, FakeDevice};

    #[tokio::test]
    async fn test_fresh_dump_regenerates_and_reuse_reads_back() {
        let adb = FakeAdb::new();
        adb.add(FakeDevice::new("A").screens(["<first/>", "<second/>"]));
        let device = adb.device("A");
        let shell = DeviceShell::new(&device, &adb);

        let fresh = shell.dump_screen(SnapshotMode::Fresh).await.unwrap();
        assert_eq!(fresh.text(), "<first/>");
        assert!(fresh.is_fresh());

        let reused = shell.dump_screen(SnapshotMode::Reuse).await.unwrap();
        assert_eq!(reused.text(), "<first/>");
        assert_eq!(reused.mode(), SnapshotMode::Reuse);

        let next = shell.dump_screen(SnapshotMode::Fresh).await.unwrap();
        assert_eq!(next.text(), "<second/>");

        assert_eq!(adb.count("A", "uiautomator dump"), 2);
        assert_eq!(adb.count("A", "rm -f /sdcard/window_dump.xml"), 2);
        assert_eq!(adb.count("A", "cat /sdcard/window_dump.xml"), 3);
    }

    #[tokio::test]
    async fn test_tap_uses_center_and_checks_liveness() {
        let adb = FakeAdb::new();
        adb.add(FakeDevice::new("A"));
        let device = adb.device("A");
        let shell = DeviceShell::new(&device, &adb);

        shell.tap(Bounds::new(10, 20, 110, 60)).await.unwrap();
        assert_eq!(adb.taps("A"), vec![(60, 40)]);

        adb.disconnect("A");
        assert!(matches!(
            shell.tap(Bounds::new(0, 0, 2, 2)).await,
            Err(InstallerError::DeviceLost(_))
        ));
        assert_eq!(adb.taps("A").len(), 1);
    }

    #[tokio::test]
    async fn test_package_queries() {
        let adb = FakeAdb::new();
        adb.add(
            FakeDevice::new("A")
                .installed([false, true])
                .version_codes([12])
                .on_play_store(false),
        );
        let device = adb.device("A");
        let shell = DeviceShell::new(&device, &adb);

        assert!(!shell.is_package_installed("com.example.app").await.unwrap());
        assert!(shell.is_package_installed("com.example.app").await.unwrap());

        let info = shell.package_info("com.example.app").await.unwrap();
        assert_eq!(info.version_code, 12);
        assert_eq!(info.paths.len(), 2);
        assert_eq!(shell.package_paths("com.example.app").await.unwrap(), info.paths);

        assert!(!shell.is_on_play_store().await.unwrap());
        shell.launch_package_screen("com.example.app").await.unwrap();
        assert!(shell.is_on_play_store().await.unwrap());
        assert!(shell.is_unlocked().await.unwrap());
    }

    #[tokio::test]
    async fn test_store_launch_checks_liveness() {
        let adb = FakeAdb::new();
        adb.add(FakeDevice::new("A").on_play_store(false));
        let device = adb.device("A");
        let shell = DeviceShell::new(&device, &adb);

        adb.disconnect("A");
        assert!(matches!(
            shell.launch_package_screen("com.example.app").await,
            Err(InstallerError::DeviceLost(_))
        ));
        assert_eq!(adb.count("A", "am start"), 0);
    }

    #[tokio::test]
    async fn test_stay_on_setting_roundtrip() {
        let adb = FakeAdb::new();
        adb.add(FakeDevice::new("A").stay_on(1));
        let device = adb.device("A");
        let shell = DeviceShell::new(&device, &adb);

        shell.set_stay_on_while_plugged_in(STAY_ON_ALL_SOURCES).await.unwrap();
        assert_eq!(
            shell.get_setting("global", "stay_on_while_plugged_in").await.unwrap(),
            "7"
        );
    }
}
