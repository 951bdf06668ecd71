//! In-memory stand-in for `adb` used by unit tests.
//!
//! Each fake device keeps a device-side dump file: `uiautomator dump` copies
//! the next scripted screen into it and `cat` reads it back. Scripted queues
//! (screens, install state, version codes) advance one entry per query and
//! keep repeating their last entry.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::adb::{CommandExecutor, Device, PLAY_STORE_PACKAGE, WINDOW_DUMP_PATH};
use crate::error::{InstallerError, Result};

fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// Builder and state of one fake device
#[derive(Debug, Clone)]
pub struct FakeDevice {
    serial: String,
    model: String,
    language: String,
    stay_on: i32,
    screens: VecDeque<String>,
    dump: Option<String>,
    installed: VecDeque<bool>,
    version_codes: VecDeque<u64>,
    settings: HashMap<String, String>,
    resumed_package: String,
    unlocked: bool,
    lose_after: Option<usize>,
    fail_on: Vec<String>,
    commands: Vec<String>,
    taps: Vec<(i32, i32)>,
}

impl FakeDevice {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            model: format!("Model {}", serial),
            language: "en".to_string(),
            stay_on: 0,
            screens: VecDeque::from(vec![String::new()]),
            dump: None,
            installed: VecDeque::from(vec![false]),
            version_codes: VecDeque::from(vec![1]),
            settings: HashMap::new(),
            resumed_package: PLAY_STORE_PACKAGE.to_string(),
            unlocked: true,
            lose_after: None,
            fail_on: Vec::new(),
            commands: Vec::new(),
            taps: Vec::new(),
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn language(mut self, code: &str) -> Self {
        self.language = code.to_string();
        self
    }

    pub fn stay_on(mut self, value: i32) -> Self {
        self.stay_on = value;
        self
    }

    /// Screens produced by successive `uiautomator dump` calls
    pub fn screens<I, S>(mut self, screens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.screens = screens.into_iter().map(Into::into).collect();
        self
    }

    /// Answers of successive `pm list packages` calls
    pub fn installed<I: IntoIterator<Item = bool>>(mut self, answers: I) -> Self {
        self.installed = answers.into_iter().collect();
        self
    }

    /// Version codes of successive `dumpsys package` calls
    pub fn version_codes<I: IntoIterator<Item = u64>>(mut self, codes: I) -> Self {
        self.version_codes = codes.into_iter().collect();
        self
    }

    pub fn on_play_store(mut self, yes: bool) -> Self {
        self.resumed_package = if yes {
            PLAY_STORE_PACKAGE.to_string()
        } else {
            "com.google.android.apps.nexuslauncher".to_string()
        };
        self
    }

    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }

    /// Drop off the bus after `commands` commands have been served
    pub fn lose_after(mut self, commands: usize) -> Self {
        self.lose_after = Some(commands);
        self
    }

    /// Fail every command whose text contains `needle`
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    pub fn device(&self) -> Device {
        Device {
            id: self.serial.clone(),
            model: self.model.clone(),
            abi: "arm64-v8a".to_string(),
            language: self.language.clone(),
            sdk: 33,
            stay_on_while_plugged_in: self.stay_on,
        }
    }

    fn is_lost(&self) -> bool {
        self.lose_after
            .map_or(false, |limit| self.commands.len() >= limit)
    }

    fn getprop(&self) -> String {
        format!(
            "[ro.build.version.sdk]: [33]\n[ro.product.cpu.abi]: [arm64-v8a]\n\
             [ro.product.model]: [{}]\n[persist.sys.locale]: [{}-XX]\n",
            self.model, self.language
        )
    }

    fn respond(&mut self, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        if self.fail_on.iter().any(|needle| joined.contains(needle.as_str())) {
            return Err(InstallerError::CommandFailed(format!("scripted failure: {joined}")));
        }

        match args {
            ["shell", "getprop"] => Ok(self.getprop()),
            ["shell", "settings", "get", _, key] => Ok(self.settings.get(*key).cloned().unwrap_or_else(
                || {
                    if *key == "stay_on_while_plugged_in" {
                        self.stay_on.to_string()
                    } else {
                        "null".to_string()
                    }
                },
            )),
            ["shell", "settings", "put", _, key, value] => {
                self.settings.insert(key.to_string(), value.to_string());
                Ok(String::new())
            }
            ["shell", "pm", "list", "packages", package] => {
                let installed = next(&mut self.installed).unwrap_or(false);
                Ok(if installed {
                    format!("package:{package}")
                } else {
                    String::new()
                })
            }
            ["shell", "pm", "path", package] => Ok(format!(
                "package:/data/app/~~x==/{package}-1/base.apk\n\
                 package:/data/app/~~x==/{package}-1/split_config.arm64_v8a.apk"
            )),
            ["shell", "dumpsys", "package", package] => {
                let code = next(&mut self.version_codes).unwrap_or(1);
                Ok(format!(
                    "Packages:\n  Package [{package}] (1a2b):\n    versionCode={code} minSdk=24 targetSdk=34\n    versionName={code}.0"
                ))
            }
            ["shell", "dumpsys", "activity", "activities"] => Ok(format!(
                "  mResumedActivity: ActivityRecord{{5e1 u0 {}/.Main t12}}",
                self.resumed_package
            )),
            ["shell", "dumpsys", "window"] => Ok(format!(
                "mShowingDream=false mDreamingLockscreen={}",
                !self.unlocked
            )),
            ["shell", "am", "start", ..] => {
                self.resumed_package = PLAY_STORE_PACKAGE.to_string();
                Ok("Starting: Intent { act=android.intent.action.VIEW }".to_string())
            }
            ["shell", "rm", "-f", _] => {
                self.dump = None;
                Ok(String::new())
            }
            ["shell", "uiautomator", "dump", ..] => {
                self.dump = next(&mut self.screens);
                Ok(format!("UI hierchary dumped to: {WINDOW_DUMP_PATH}"))
            }
            ["shell", "cat", _] => self.dump.clone().ok_or_else(|| {
                InstallerError::CommandFailed(format!("cat: {WINDOW_DUMP_PATH}: No such file or directory"))
            }),
            ["shell", "input", "tap", x, y] => {
                let parse = |v: &str| {
                    v.parse::<i32>()
                        .map_err(|e| InstallerError::ParseError(e.to_string()))
                };
                self.taps.push((parse(*x)?, parse(*y)?));
                Ok(String::new())
            }
            _ => Ok(String::new()),
        }
    }
}

/// Fake `CommandExecutor` over a set of `FakeDevice`s
#[derive(Default)]
pub struct FakeAdb {
    devices: Mutex<HashMap<String, FakeDevice>>,
}

impl FakeAdb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, device: FakeDevice) {
        self.devices
            .lock()
            .unwrap()
            .insert(device.serial.clone(), device);
    }

    fn with<T>(&self, serial: &str, f: impl FnOnce(&mut FakeDevice) -> T) -> T {
        let mut devices = self.devices.lock().unwrap();
        f(devices.get_mut(serial).expect("unknown fake device"))
    }

    pub fn device(&self, serial: &str) -> Device {
        self.with(serial, |d| d.device())
    }

    pub fn disconnect(&self, serial: &str) {
        self.with(serial, |d| d.lose_after = Some(0));
    }

    /// Every command the device received, space-joined
    pub fn commands(&self, serial: &str) -> Vec<String> {
        self.with(serial, |d| d.commands.clone())
    }

    pub fn count(&self, serial: &str, needle: &str) -> usize {
        self.commands(serial)
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    pub fn taps(&self, serial: &str) -> Vec<(i32, i32)> {
        self.with(serial, |d| d.taps.clone())
    }

    pub fn setting(&self, serial: &str, key: &str) -> Option<String> {
        self.with(serial, |d| d.settings.get(key).cloned())
    }
}

#[async_trait]
impl CommandExecutor for FakeAdb {
    async fn execute(&self, serial: &str, args: &[&str]) -> Result<String> {
        let mut devices = self.devices.lock().unwrap();
        let device = devices
            .get_mut(serial)
            .ok_or_else(|| InstallerError::CommandFailed(format!("device '{serial}' not found")))?;
        if device.is_lost() {
            return Err(InstallerError::CommandFailed(format!(
                "device '{serial}' not found"
            )));
        }
        device.commands.push(args.join(" "));
        device.respond(args)
    }

    async fn connected_serials(&self) -> Result<Vec<String>> {
        let devices = self.devices.lock().unwrap();
        let mut serials: Vec<String> = devices
            .values()
            .filter(|d| !d.is_lost())
            .map(|d| d.serial.clone())
            .collect();
        serials.sort();
        Ok(serials)
    }
}
