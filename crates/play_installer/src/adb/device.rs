//! Device descriptors built from `getprop`

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::adb::executor::CommandExecutor;
use crate::error::{InstallerError, Result};

lazy_static! {
    static ref PROP_RE: Regex = Regex::new(r"^\[([^\]]+)\]:\s*\[(.*)\]$").expect("getprop pattern");
}

/// Snapshot of a device's identity and the settings we may change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Device {
    /// adb serial; the address used with `adb -s`
    pub id: String,
    pub model: String,
    pub abi: String,
    /// Language code such as `en` or `he`
    pub language: String,
    pub sdk: u32,
    /// `settings global stay_on_while_plugged_in` before the run
    pub stay_on_while_plugged_in: i32,
}

/// Parse `getprop` output into a key/value map
pub fn parse_getprop(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| PROP_RE.captures(line.trim()))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

impl Device {
    /// Build a device from `getprop` output.
    ///
    /// The language comes from `persist.sys.locale`, falling back to
    /// `ro.product.locale`, cut at the region separator.
    pub fn from_getprop(serial: &str, output: &str, stay_on_while_plugged_in: i32) -> Result<Self> {
        let props = parse_getprop(output);
        let require = |key: &str| {
            props
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| InstallerError::ParseError(format!("{serial}: missing property {key}")))
        };

        let locale = props
            .get("persist.sys.locale")
            .filter(|v| !v.is_empty())
            .or_else(|| props.get("ro.product.locale"))
            .cloned()
            .ok_or_else(|| InstallerError::ParseError(format!("{serial}: no locale property")))?;
        let language = locale
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let sdk = require("ro.build.version.sdk")?
            .parse::<u32>()
            .map_err(|e| InstallerError::ParseError(format!("{serial}: bad sdk level: {e}")))?;

        Ok(Self {
            id: serial.to_string(),
            model: require("ro.product.model")?,
            abi: require("ro.product.cpu.abi")?,
            language,
            sdk,
            stay_on_while_plugged_in,
        })
    }
}

/// Parse a `settings get` value; unset settings read back as `null`
fn parse_setting(value: &str) -> Result<i32> {
    match value.trim() {
        "" | "null" => Ok(0),
        v => v
            .parse::<i32>()
            .map_err(|e| InstallerError::ParseError(format!("bad setting value {v:?}: {e}"))),
    }
}

/// Query properties and the stay-awake setting of one attached device
pub async fn discover_device(executor: &dyn CommandExecutor, serial: &str) -> Result<Device> {
    let props = executor.execute(serial, &["shell", "getprop"]).await?;
    let stay_on = executor
        .execute(
            serial,
            &["shell", "settings", "get", "global", "stay_on_while_plugged_in"],
        )
        .await?;
    let device = Device::from_getprop(serial, &props, parse_setting(&stay_on)?)?;
    debug!(
        "Discovered {} ({}, {}, sdk {}, lang {})",
        device.id, device.model, device.abi, device.sdk, device.language
    );
    Ok(device)
}

/// Result of reading a list of serials
#[derive(Debug, Default)]
pub struct Discovery {
    pub devices: Vec<Device>,
    /// Serials that could not be read, with the reason
    pub unreadable: Vec<(String, InstallerError)>,
}

/// Discover every serial on its own; one unreadable device never hides the rest.
///
/// Repeated serials are read once. A command failure on a serial that is no
/// longer attached is reported as `DeviceLost`.
pub async fn discover_devices(executor: &dyn CommandExecutor, serials: &[String]) -> Discovery {
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for serial in serials {
        if !seen.insert(serial.as_str()) {
            continue;
        }
        match discover_device(executor, serial).await {
            Ok(device) => discovery.devices.push(device),
            Err(err @ (InstallerError::CommandFailed(_) | InstallerError::Timeout(_))) => {
                let attached = executor
                    .connected_serials()
                    .await
                    .map(|serials| serials.iter().any(|s| s == serial))
                    .unwrap_or(false);
                let err = if attached {
                    err
                } else {
                    InstallerError::DeviceLost(format!("{serial} is not attached: {err}"))
                };
                warn!("{}: cannot read device: {}", serial, err);
                discovery.unreadable.push((serial.clone(), err));
            }
            Err(err) => {
                warn!("{}: cannot read device: {}", serial, err);
                discovery.unreadable.push((serial.clone(), err));
            }
        }
    }
    discovery
}
