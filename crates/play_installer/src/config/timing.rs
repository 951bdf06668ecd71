//! Retry and timing configuration for install automation

use lazy_static::lazy_static;
use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Seconds from the environment; values no `Duration` can hold fall back
fn env_secs(key: &str, default: f64) -> f64 {
    let secs = env_or(key, default);
    if Duration::try_from_secs_f64(secs).is_ok() {
        secs
    } else {
        default
    }
}

/// Per-phase retry ceilings for the install state machine
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts to find the install button, and to settle an installed package
    pub max_retries: u32,
    /// Polls while the download/cancel indicator is on screen
    pub install_poll_retries: u32,
    /// Package queries while waiting for an update to land
    pub update_poll_retries: u32,
    /// Times the machine may restart from the top after a stall
    pub max_cycles: u32,
    /// Sleep between poll attempts
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: env_or("APKPULL_MAX_RETRIES", 3),
            install_poll_retries: env_or("APKPULL_INSTALL_POLL_RETRIES", 30),
            update_poll_retries: env_or("APKPULL_UPDATE_POLL_RETRIES", 60),
            max_cycles: env_or("APKPULL_MAX_CYCLES", 10),
            poll_interval: Duration::from_secs_f64(env_secs("APKPULL_POLL_INTERVAL", 1.0)),
        }
    }
}

impl RetryPolicy {
    /// Set the install-button and settle retry ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_install_poll_retries(mut self, retries: u32) -> Self {
        self.install_poll_retries = retries;
        self
    }

    pub fn with_update_poll_retries(mut self, retries: u32) -> Self {
        self.update_poll_retries = retries;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Timeouts for individual adb invocations
#[derive(Debug, Clone)]
pub struct CommandTimingConfig {
    pub command_timeout: f64,
    pub devices_timeout: f64,
}

impl Default for CommandTimingConfig {
    fn default() -> Self {
        Self {
            command_timeout: env_secs("APKPULL_COMMAND_TIMEOUT", 30.0),
            devices_timeout: env_secs("APKPULL_DEVICES_TIMEOUT", 5.0),
        }
    }
}

/// Master timing configuration
#[derive(Debug, Clone, Default)]
pub struct TimingConfig {
    /// Policy handed to new orchestrators
    pub retry: RetryPolicy,
    pub command: CommandTimingConfig,
}

lazy_static! {
    /// Global timing configuration instance
    pub static ref TIMING_CONFIG: TimingConfig = TimingConfig::default();
}
