//! Classification of storefront refusals from snapshot text

use crate::config::{label, phrase, ButtonId, Phrase, CURRENCY_SYMBOLS};
use crate::error::{InstallFailureKind, Result};

/// Return the first failure whose marker appears in `snapshot`.
///
/// Markers are checked in a fixed order: hardware, country, network, sign-in,
/// then currency symbols. A page may show several of them (the price of a
/// related app next to an offline banner), and the earlier one wins.
pub fn classify(snapshot: &str, language: &str) -> Result<Option<InstallFailureKind>> {
    let checks = [
        (
            phrase(language, Phrase::Hardware)?,
            InstallFailureKind::HardwareIncompatible,
        ),
        (
            phrase(language, Phrase::Country)?,
            InstallFailureKind::CountryRestricted,
        ),
        (
            phrase(language, Phrase::Network)?,
            InstallFailureKind::NetworkUnavailable,
        ),
        (
            label(language, ButtonId::SignIn)?,
            InstallFailureKind::SignInRequired,
        ),
    ];

    if let Some((_, kind)) = checks.iter().find(|(marker, _)| snapshot.contains(marker)) {
        return Ok(Some(*kind));
    }

    if CURRENCY_SYMBOLS.iter().any(|coin| snapshot.contains(coin)) {
        return Ok(Some(InstallFailureKind::Paid));
    }

    Ok(None)
}
