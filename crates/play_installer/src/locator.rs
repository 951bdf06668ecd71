//! Button lookup on the current screen

use crate::adb::{CommandExecutor, Device, DeviceShell};
use crate::config::{label, ButtonId};
use crate::error::Result;
use crate::snapshot::{AccessibilitySnapshot, Bounds, SnapshotMode};

/// Answers "is button B on screen, and where" for one device
#[derive(Clone, Copy)]
pub struct ButtonLocator<'a> {
    shell: DeviceShell<'a>,
}

impl<'a> ButtonLocator<'a> {
    pub fn new(device: &'a Device, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            shell: DeviceShell::new(device, executor),
        }
    }

    pub async fn snapshot(&self, mode: SnapshotMode) -> Result<AccessibilitySnapshot> {
        self.shell.dump_screen(mode).await
    }

    /// Look for `button` in an already captured snapshot
    pub fn find(&self, snapshot: &AccessibilitySnapshot, button: ButtonId) -> Result<Option<Bounds>> {
        let text = label(&self.shell.device().language, button)?;
        Ok(snapshot.find_bounds(text))
    }

    /// Capture a snapshot in `mode` and look for `button` in it
    pub async fn locate(&self, button: ButtonId, mode: SnapshotMode) -> Result<Option<Bounds>> {
        // Resolve the label first so an unsupported language never touches the device
        let text = label(&self.shell.device().language, button)?;
        let snapshot = self.snapshot(mode).await?;
        Ok(snapshot.find_bounds(text))
    }
}
