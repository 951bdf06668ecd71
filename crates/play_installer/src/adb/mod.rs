//! ADB (Android Debug Bridge) module for Android device control
//!
//! This module provides:
//! - `executor`: The command channel trait and its `adb` implementation
//! - `connection`: Listing and connecting devices
//! - `device`: Device descriptors and discovery
//! - `shell`: Device-side operations (settings, packages, screen dump, tap, pull)

mod connection;
mod device;
mod executor;
mod shell;

pub use connection::{list_devices, parse_devices_output, AdbConnection, ConnectionType, DeviceInfo};
pub use device::{discover_device, discover_devices, parse_getprop, Device, Discovery};
pub use executor::{AdbExecutor, CommandExecutor};
pub use shell::{DeviceShell, PLAY_STORE_PACKAGE, STAY_ON_ALL_SOURCES, WINDOW_DUMP_PATH};
