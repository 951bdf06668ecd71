//! Configuration module for play_installer
//!
//! This module contains:
//! - `i18n`: Localized Play Store labels, phrases and currency symbols
//! - `timing`: Retry ceilings and command timeouts

mod i18n;
mod timing;

pub use i18n::{
    get_labels, label, phrase, ButtonId, Language, Phrase, CURRENCY_SYMBOLS, LABELS_EN, LABELS_HE,
    SUPPORTED_LANGUAGES,
};
pub use timing::{CommandTimingConfig, RetryPolicy, TimingConfig, TIMING_CONFIG};
