//! apkpull CLI - install an app from the Play Store on every attached device
//!
//! Usage:
//!     apkpull [OPTIONS] [PACKAGE]
//!
//! Environment Variables:
//!     APKPULL_DEVICE_ID: Comma-separated ADB serials (default: all attached)
//!     APKPULL_ADB_PATH: Path to the adb binary (default: adb)
//!     APKPULL_POOL_SIZE: Devices driven at once (default: all)
//!     APKPULL_MAX_RETRIES: Attempts per install phase (default: 3)
//!     APKPULL_PULL_DIR: Pull installed APKs into this directory
//!     RUST_LOG: Log filter (default: info)

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use play_installer::{
    discover_devices, pull_package, AdbConnection, AdbExecutor, CommandExecutor, ConnectionType,
    DeviceOrchestrator, DeviceReport, InstallOutcome, Language, TIMING_CONFIG,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Install an app through the Play Store UI on Android devices over ADB
#[derive(Parser, Debug)]
#[command(name = "apkpull")]
#[command(about = "Install an app through the Play Store UI on Android devices over ADB")]
#[command(after_help = r#"Examples:
    # Install on every attached device
    apkpull com.example.app

    # Install on two specific devices, one at a time
    apkpull -d emulator-5554 -d R58M123ABC --pool-size 1 com.example.app

    # Install and copy the APKs to ./apks/<package>/<serial>/
    apkpull --pull ./apks com.example.app

    # Connect to a remote device, then install
    apkpull --connect 192.168.1.100:5555 com.example.app

    # List connected devices
    apkpull --list-devices
"#)]
struct Cli {
    /// Package name to install, e.g. com.example.app
    #[arg(required_unless_present_any = ["list_devices", "connect"])]
    package: Option<String>,

    /// ADB serial to drive; repeat for several (default: all attached devices)
    #[arg(short = 'd', long, env = "APKPULL_DEVICE_ID", value_delimiter = ',')]
    device_id: Vec<String>,

    /// Path to the adb binary
    #[arg(long, env = "APKPULL_ADB_PATH", default_value = "adb")]
    adb_path: String,

    /// Number of devices driven at once (default: all)
    #[arg(long, env = "APKPULL_POOL_SIZE")]
    pool_size: Option<usize>,

    /// Attempts per install phase before giving up
    #[arg(long, env = "APKPULL_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Pull the installed APKs into DIR/<package>/<serial>/
    #[arg(long, env = "APKPULL_PULL_DIR", value_name = "DIR")]
    pull: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// List connected devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Connect to a remote device first (e.g., 192.168.1.100:5555)
    #[arg(short = 'c', long, value_name = "ADDRESS")]
    connect: Option<String>,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Check that adb can be found before touching any device
fn check_adb(adb_path: &str) -> Result<()> {
    which::which(adb_path).map(|_| ()).map_err(|_| {
        anyhow!(
            "{} is not installed or not in PATH.\n\
             Install Android platform tools:\n\
             \x20 - macOS: brew install android-platform-tools\n\
             \x20 - Linux: sudo apt install android-tools-adb\n\
             \x20 - Windows: https://developer.android.com/studio/releases/platform-tools",
            adb_path
        )
    })
}

async fn print_devices(connection: &AdbConnection) -> Result<()> {
    let devices = connection.list_devices().await?;
    if devices.is_empty() {
        println!("No devices connected.");
        return Ok(());
    }

    println!("Connected devices:");
    println!("{}", "-".repeat(60));
    for device in devices {
        let status = if device.is_online() { "\u{2713}" } else { "\u{2717}" };
        let conn_type = match device.connection_type {
            ConnectionType::Usb => "USB",
            ConnectionType::Remote => "Remote",
        };
        let model = device.model.as_deref().unwrap_or("unknown");
        println!(
            "  {} {:<30} {:<8} {} ({})",
            status, device.device_id, conn_type, model, device.status
        );
    }
    Ok(())
}

fn format_report(report: &DeviceReport, pulled: &[PathBuf]) -> String {
    let device = &report.device;
    let seconds = report.elapsed_ms as f64 / 1000.0;
    match &report.outcome {
        InstallOutcome::Success(info) => {
            let mut line = format!(
                "\u{2705} {} ({}): {} {} ({}) in {:.1}s",
                device.model, device.id, info.name, info.version_name, info.version_code, seconds
            );
            if !pulled.is_empty() {
                line.push_str(&format!(", pulled {} APK(s)", pulled.len()));
            }
            line
        }
        InstallOutcome::Failure(cause, message) => format!(
            "\u{274C} {} ({}): {}: {} after {:.1}s",
            device.model, device.id, cause, message, seconds
        ),
    }
}

/// Pull APKs for every successful device; a failed pull fails the run
async fn pull_all(
    executor: &dyn CommandExecutor,
    reports: &[DeviceReport],
    dest: &Path,
) -> (Vec<Vec<PathBuf>>, bool) {
    let mut all_pulled = Vec::with_capacity(reports.len());
    let mut ok = true;
    for report in reports {
        let pulled = match &report.outcome {
            InstallOutcome::Success(info) => {
                match pull_package(executor, &report.device, info, dest).await {
                    Ok(paths) => paths,
                    Err(e) => {
                        error!("{}: pull failed: {}", report.device.id, e);
                        ok = false;
                        Vec::new()
                    }
                }
            }
            InstallOutcome::Failure(..) => Vec::new(),
        };
        all_pulled.push(pulled);
    }
    (all_pulled, ok)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    check_adb(&cli.adb_path)?;
    let connection = AdbConnection::with_path(cli.adb_path.clone());

    if let Some(address) = &cli.connect {
        let message = connection
            .connect(address, 10)
            .await
            .with_context(|| format!("connecting to {}", address))?;
        info!("{}", message);
    }

    if cli.list_devices {
        return print_devices(&connection).await;
    }

    let package = match cli.package.as_deref() {
        Some(package) => package,
        None => return Ok(()),
    };

    let executor: Arc<dyn CommandExecutor> = Arc::new(AdbExecutor::with_path(cli.adb_path.clone()));
    let serials = if cli.device_id.is_empty() {
        executor.connected_serials().await?
    } else {
        cli.device_id.clone()
    };
    if serials.is_empty() {
        bail!("No devices connected. Enable USB debugging or use --connect <ip>:<port>");
    }

    let discovery = discover_devices(executor.as_ref(), &serials).await;
    let unreadable: Vec<(String, InstallOutcome)> = discovery
        .unreadable
        .iter()
        .map(|(serial, err)| (serial.clone(), InstallOutcome::from_error(err)))
        .collect();
    let devices = discovery.devices;
    for device in &devices {
        Language::from_code(&device.language)
            .with_context(|| format!("{} ({})", device.model, device.id))?;
    }

    let mut policy = TIMING_CONFIG.retry.clone();
    if let Some(max_retries) = cli.max_retries {
        policy = policy.with_max_retries(max_retries);
    }
    let mut orchestrator = DeviceOrchestrator::new(Arc::clone(&executor)).with_policy(policy);
    if let Some(pool_size) = cli.pool_size {
        orchestrator = orchestrator.with_pool_size(pool_size);
    }

    let mut reports = orchestrator.run_reports(devices, package).await;
    reports.sort_by(|a, b| a.device.id.cmp(&b.device.id));

    let (pulled, pulls_ok) = match &cli.pull {
        Some(dest) => pull_all(executor.as_ref(), &reports, dest).await,
        None => (vec![Vec::new(); reports.len()], true),
    };

    if cli.json {
        let mut values = Vec::with_capacity(reports.len());
        for (report, paths) in reports.iter().zip(&pulled) {
            let mut value = serde_json::to_value(report)?;
            value["pulled"] = serde_json::to_value(paths)?;
            values.push(value);
        }
        for (serial, outcome) in &unreadable {
            values.push(serde_json::json!({ "serial": serial, "outcome": outcome }));
        }
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        for (report, paths) in reports.iter().zip(&pulled) {
            println!("{}", format_report(report, paths));
        }
        for (serial, outcome) in &unreadable {
            if let InstallOutcome::Failure(cause, message) = outcome {
                println!("\u{274C} {}: {}: {}", serial, cause, message);
            }
        }
    }

    let failed = reports.iter().filter(|r| !r.outcome.is_success()).count() + unreadable.len();
    let total = reports.len() + unreadable.len();
    if failed > 0 || !pulls_ok {
        if failed > 0 {
            error!("{} of {} device(s) failed", failed, total);
        }
        std::process::exit(1);
    }
    Ok(())
}
