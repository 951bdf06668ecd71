//! Localized Play Store labels keyed by language code
use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::{InstallerError, Result};

/// Languages whose Play Store labels are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Hebrew,
}

impl Language {
    /// Parse a device language code such as `en` or `he`
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_lowercase().as_str() {
            "en" => Ok(Self::English),
            // Older Android releases still report Hebrew as `iw`
            "he" | "iw" => Ok(Self::Hebrew),
            other => Err(InstallerError::UnsupportedLanguage(other.to_string())),
        }
    }

    /// Get language code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hebrew => "he",
        }
    }
}

pub const SUPPORTED_LANGUAGES: [Language; 2] = [Language::English, Language::Hebrew];

/// Buttons the installer looks for on the package page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Open,
    Play,
    Install,
    Uninstall,
    Enable,
    Update,
    Cancel,
    Accept,
    SignIn,
}

impl ButtonId {
    pub const ALL: [ButtonId; 9] = [
        ButtonId::Open,
        ButtonId::Play,
        ButtonId::Install,
        ButtonId::Uninstall,
        ButtonId::Enable,
        ButtonId::Update,
        ButtonId::Cancel,
        ButtonId::Accept,
        ButtonId::SignIn,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Play => "play",
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Enable => "enable",
            Self::Update => "update",
            Self::Cancel => "cancel",
            Self::Accept => "accept",
            Self::SignIn => "sign_in",
        }
    }
}

/// Non-button text shown on the package page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phrase {
    Installing,
    Pending,
    Hardware,
    Country,
    Network,
}

impl Phrase {
    fn key(&self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Pending => "pending",
            Self::Hardware => "hardware",
            Self::Country => "country",
            Self::Network => "network",
        }
    }
}

/// Symbols whose presence marks a paid listing
pub const CURRENCY_SYMBOLS: [&str; 2] = ["$", "₪"];

/// English labels
pub static LABELS_EN: phf::Map<&'static str, &'static str> = phf_map! {
    "open" => "Open",
    "play" => "Play",
    "install" => "Install",
    "uninstall" => "Uninstall",
    "enable" => "Enable",
    "update" => "Update",
    "cancel" => "Cancel",
    "accept" => "Accept",
    "sign_in" => "Sign in",
    "installing" => "Installing...",
    "pending" => "Pending...",
    "hardware" => "Your device isn't compatible with this version.",
    "country" => "This item isn't available in your country.",
    "network" => "You're offline",
};

/// Hebrew labels
pub static LABELS_HE: phf::Map<&'static str, &'static str> = phf_map! {
    "open" => "פתח",
    "play" => "שחק",
    "install" => "התקנה",
    "uninstall" => "הסר התקנה",
    "enable" => "הפעלה",
    "update" => "עדכון",
    "cancel" => "ביטול",
    "accept" => "אישור",
    "sign_in" => "כניסה",
    "installing" => "מתקין...",
    "pending" => "בהמתנה...",
    "hardware" => "המכשיר שלך אינו תואם לגירסה זו.",
    "country" => "פריט זה אינו זמין בארצך.",
    "network" => "אין חיבור לאינטרנט",
};

/// Get the label table for a language
pub fn get_labels(lang: Language) -> &'static phf::Map<&'static str, &'static str> {
    match lang {
        Language::English => &LABELS_EN,
        Language::Hebrew => &LABELS_HE,
    }
}

fn lookup(code: &str, key: &str) -> Result<&'static str> {
    let lang = Language::from_code(code)?;
    get_labels(lang)
        .get(key)
        .copied()
        .ok_or_else(|| InstallerError::UnsupportedLanguage(format!("{code} has no '{key}' label")))
}

/// Localized text of a button for a device language code
pub fn label(code: &str, button: ButtonId) -> Result<&'static str> {
    lookup(code, button.key())
}

/// Localized text of a page phrase for a device language code
pub fn phrase(code: &str, phrase: Phrase) -> Result<&'static str> {
    lookup(code, phrase.key())
}
