//! Copy installed APKs from a device to the host

use std::path::{Path, PathBuf};
use tracing::info;

use crate::adb::{CommandExecutor, Device, DeviceShell};
use crate::error::Result;
use crate::package::PackageInfo;

/// Serials of remote devices look like `192.168.1.5:5555`
fn sanitize_serial(serial: &str) -> String {
    serial
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// Pull every APK of `package` into `<dest>/<package>/<serial>/`.
///
/// Returns the host paths, in the order `pm path` listed them.
pub async fn pull_package(
    executor: &dyn CommandExecutor,
    device: &Device,
    package: &PackageInfo,
    dest: &Path,
) -> Result<Vec<PathBuf>> {
    let dir = dest.join(&package.name).join(sanitize_serial(&device.id));
    tokio::fs::create_dir_all(&dir).await?;

    let shell = DeviceShell::new(device, executor);
    let mut pulled = Vec::with_capacity(package.paths.len());
    for remote in &package.paths {
        let file_name = remote.rsplit('/').next().unwrap_or(remote.as_str());
        let local = dir.join(file_name);
        shell.pull(remote, &local.to_string_lossy()).await?;
        pulled.push(local);
    }

    info!(
        "{}: pulled {} APK(s) of {} to {}",
        device.model,
        pulled.len(),
        package.name,
        dir.display()
    );
    Ok(pulled)
}
