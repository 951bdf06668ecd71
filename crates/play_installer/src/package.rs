//! Installed package metadata

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{InstallerError, Result};

lazy_static! {
    static ref VERSION_CODE_RE: Regex = Regex::new(r"versionCode=(\d+)").expect("versionCode pattern");
    static ref VERSION_NAME_RE: Regex = Regex::new(r"versionName=(\S+)").expect("versionName pattern");
    static ref MIN_SDK_RE: Regex = Regex::new(r"minSdk=(\d+)").expect("minSdk pattern");
}

/// Package state as reported by the device package manager
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version_code: u64,
    pub version_name: String,
    pub paths: Vec<String>,
    /// Absent on platform releases whose dumpsys omits it
    pub min_sdk: Option<u32>,
}

impl PackageInfo {
    /// Build from `pm path` and `dumpsys package` output.
    ///
    /// Only the first package block is read; updated system apps list the
    /// active version before the factory one.
    pub fn from_dumpsys(name: &str, pm_path_output: &str, dumpsys_output: &str) -> Result<Self> {
        let version_code = VERSION_CODE_RE
            .captures(dumpsys_output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .ok_or_else(|| InstallerError::ParseError(format!("no versionCode for {name}")))?;

        let version_name = VERSION_NAME_RE
            .captures(dumpsys_output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let min_sdk = MIN_SDK_RE
            .captures(dumpsys_output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        Ok(Self {
            name: name.to_string(),
            version_code,
            version_name,
            paths: parse_pm_paths(pm_path_output),
            min_sdk,
        })
    }
}

/// Extract APK paths from `pm path` output (`package:<path>` per line)
pub fn parse_pm_paths(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}
