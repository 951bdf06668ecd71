//! Accessibility snapshot parsing: button bounds and download progress

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

use crate::config::{phrase, Phrase};
use crate::error::Result;

lazy_static! {
    static ref NODE_RE: Regex = Regex::new(r"<node\b[^>]*>").expect("node pattern");
    static ref TEXT_ATTR_RE: Regex = Regex::new(r#"\stext="([^"]*)""#).expect("text pattern");
    static ref BOUNDS_ATTR_RE: Regex =
        Regex::new(r#"\sbounds="\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]""#).expect("bounds pattern");
    static ref PROGRESS_RE: Regex = Regex::new(r#"\stext="(\d{1,3})%"#).expect("progress pattern");
}

/// Screen rectangle of a UI node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Point where a tap lands
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Whether a snapshot was regenerated on the device or read back as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    Fresh,
    Reuse,
}

/// Raw text of one accessibility tree dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibilitySnapshot {
    text: String,
    mode: SnapshotMode,
}

impl AccessibilitySnapshot {
    pub fn new(text: impl Into<String>, mode: SnapshotMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    pub fn is_fresh(&self) -> bool {
        self.mode == SnapshotMode::Fresh
    }

    /// Bounds of the first node labelled exactly `label`
    pub fn find_bounds(&self, label: &str) -> Option<Bounds> {
        find_bounds(&self.text, label)
    }

    pub fn progress_percent(&self) -> Option<u8> {
        progress_percent(&self.text)
    }
}

fn unescape_xml(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}

fn parse_bounds(node: &str) -> Option<Bounds> {
    let caps = BOUNDS_ATTR_RE.captures(node)?;
    let coord = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
    Some(Bounds::new(coord(1)?, coord(2)?, coord(3)?, coord(4)?))
}

/// Scan `dump` node by node and return the bounds of the first node whose
/// `text` attribute equals `label`.
pub fn find_bounds(dump: &str, label: &str) -> Option<Bounds> {
    NODE_RE
        .find_iter(dump)
        .map(|m| m.as_str())
        .filter(|node| {
            TEXT_ATTR_RE
                .captures(node)
                .and_then(|caps| caps.get(1))
                .map(|text| unescape_xml(text.as_str()) == label)
                .unwrap_or(false)
        })
        .find_map(parse_bounds)
}

/// Download percentage shown on the package page, if any
pub fn progress_percent(dump: &str) -> Option<u8> {
    PROGRESS_RE
        .captures(dump)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|pct| *pct <= 100)
}

/// What the package page says about an in-flight install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallProgress {
    Downloading(u8),
    Pending,
    Installing,
    Unknown,
}

impl fmt::Display for InstallProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading(pct) => write!(f, "Downloading {}%...", pct),
            Self::Pending => f.write_str("Pending..."),
            Self::Installing => f.write_str("Installing..."),
            Self::Unknown => f.write_str("Waiting..."),
        }
    }
}

/// Describe install progress for logging. Never drives control flow.
pub fn describe_progress(dump: &str, language: &str) -> Result<InstallProgress> {
    if let Some(pct) = progress_percent(dump) {
        return Ok(InstallProgress::Downloading(pct));
    }
    if dump.contains(phrase(language, Phrase::Pending)?) {
        Ok(InstallProgress::Pending)
    } else if dump.contains(phrase(language, Phrase::Installing)?) {
        Ok(InstallProgress::Installing)
    } else {
        Ok(InstallProgress::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = concat!(
        r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0">"#,
        r#"<node index="0" text="" resource-id="" class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">"#,
        r#"<node index="1" text="Uninstall" class="android.widget.Button" bounds="[42,900][520,1010]" />"#,
        r#"<node index="2" text="Open" class="android.widget.Button" bounds="[560,900][1038,1010]" />"#,
        r#"<node index="3" text="Open source licenses" class="android.widget.TextView" bounds="[42,1500][700,1560]" />"#,
        r#"</node></hierarchy>"#
    );

    #[test]
    fn test_find_bounds_exact_label() {
        assert_eq!(find_bounds(DUMP, "Open"), Some(Bounds::new(560, 900, 1038, 1010)));
        assert_eq!(
            find_bounds(DUMP, "Uninstall"),
            Some(Bounds::new(42, 900, 520, 1010))
        );
        assert_eq!(find_bounds(DUMP, "Install"), None);
    }

    #[test]
    fn test_find_bounds_takes_first_match() {
        let dump = r#"<node text="Update" bounds="[1,2][3,4]"/><node text="Update" bounds="[5,6][7,8]"/>"#;
        assert_eq!(find_bounds(dump, "Update"), Some(Bounds::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_find_bounds_ignores_other_text_attributes() {
        let dump = r#"<node hint-text="Install" text="" bounds="[1,2][3,4]"/><node text="Install" bounds="[9,9][19,19]"/>"#;
        assert_eq!(find_bounds(dump, "Install"), Some(Bounds::new(9, 9, 19, 19)));
    }

    #[test]
    fn test_find_bounds_unescapes_entities() {
        let dump = r#"<node text="You&apos;re offline" bounds="[0,10][100,50]"/>"#;
        assert_eq!(
            find_bounds(dump, "You're offline"),
            Some(Bounds::new(0, 10, 100, 50))
        );
    }

    #[test]
    fn test_find_bounds_skips_node_without_bounds() {
        let dump = r#"<node text="Install" /><node text="Install" bounds="[10,20][110,60]">"#;
        assert_eq!(find_bounds(dump, "Install"), Some(Bounds::new(10, 20, 110, 60)));
    }

    #[test]
    fn test_parser_is_pure() {
        let dump = r#"<node text="42%" bounds="[0,0][1,1]"/><node text="Cancel" bounds="[5,5][50,50]"/>"#;
        let first = (find_bounds(dump, "Cancel"), progress_percent(dump));
        for _ in 0..3 {
            assert_eq!((find_bounds(dump, "Cancel"), progress_percent(dump)), first);
        }
        assert_eq!(first, (Some(Bounds::new(5, 5, 50, 50)), Some(42)));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(r#"<node text="7%" />"#), Some(7));
        assert_eq!(progress_percent(r#"<node text="100% of 12 MB" />"#), Some(100));
        assert_eq!(progress_percent(r#"<node text="Rated 4.5" />"#), None);
        assert_eq!(progress_percent(r#"<node text="Save 50%" />"#), None);
    }

    #[test]
    fn test_describe_progress() {
        assert_eq!(
            describe_progress(r#"<node text="12%" />"#, "en").unwrap(),
            InstallProgress::Downloading(12)
        );
        assert_eq!(
            describe_progress(r#"<node text="Pending..." />"#, "en").unwrap(),
            InstallProgress::Pending
        );
        assert_eq!(
            describe_progress(r#"<node text="מתקין..." />"#, "he").unwrap(),
            InstallProgress::Installing
        );
        assert_eq!(describe_progress("", "en").unwrap(), InstallProgress::Unknown);
        assert!(describe_progress("", "xx").is_err());
    }

    #[test]
    fn test_bounds_center() {
        assert_eq!(Bounds::new(10, 20, 110, 60).center(), (60, 40));
        assert_eq!(Bounds::new(10, 20, 110, 60).to_string(), "[10,20][110,60]");
    }
}
