use crate::datetime::CaptureTimestamp;
use crate::error::FormatError;
use crate::sanitize::{finalize_stem, sanitize_component};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const PLACEHOLDERS: &[(&str, &str)] = &[
    ("%Y", "year, four digits (2023)"),
    ("%y", "year, two digits (23)"),
    ("%m", "month, 01-12"),
    ("%d", "day of month, 01-31"),
    ("%H", "hour, 00-23"),
    ("%I", "hour, 01-12"),
    ("%p", "AM or PM"),
    ("%M", "minute, 00-59"),
    ("%S", "second, 00-60"),
    ("%b", "abbreviated month name (Apr)"),
    ("%B", "full month name (April)"),
    ("%a", "abbreviated weekday name (Thu)"),
    ("%A", "full weekday name (Thursday)"),
    ("%j", "day of year, 001-366"),
    ("%U", "week number, Sunday first, 00-53"),
    ("%W", "week number, Monday first, 00-53"),
    ("%z", "UTC offset (+0900)"),
    ("%Z", "time zone abbreviation or offset"),
    ("%%", "a literal %"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingPattern {
    #[default]
    DateOnly,
    DatePlusOriginal,
    OriginalOnly,
    OriginalPlusDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamingSettings {
    pub format_str: String,
    pub prefix: String,
    pub suffix: String,
    pub pattern: NamingPattern,
    pub use_filesystem_fallback: bool,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            format_str: DEFAULT_DATE_FORMAT.to_string(),
            prefix: String::new(),
            suffix: String::new(),
            pattern: NamingPattern::DateOnly,
            use_filesystem_fallback: false,
        }
    }
}

/// What a file would be called, for display before a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum NamePreview {
    Rename(String),
    NoDate,
}

impl fmt::Display for NamePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename(name) => f.write_str(name),
            Self::NoDate => f.write_str("no rename (no date found)"),
        }
    }
}

pub fn format_placeholders() -> &'static [(&'static str, &'static str)] {
    PLACEHOLDERS
}

/// `IMG_0001.jpg` -> (`IMG_0001`, `.jpg`). Leading dots never start an
/// extension, so `.bashrc` has none.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}

pub fn format_name(
    timestamp: &CaptureTimestamp,
    original: &str,
    settings: &NamingSettings,
) -> Result<String, FormatError> {
    let (base, ext) = split_name(original);
    let date = sanitize_component(&timestamp.render(&settings.format_str)?);
    let prefix = sanitize_component(&settings.prefix);
    let suffix = sanitize_component(&settings.suffix);

    let stem = match settings.pattern {
        NamingPattern::DateOnly => format!("{prefix}{date}{suffix}"),
        NamingPattern::DatePlusOriginal => format!("{prefix}{date}_{base}{suffix}"),
        NamingPattern::OriginalOnly => format!("{prefix}{base}{suffix}"),
        NamingPattern::OriginalPlusDate => format!("{prefix}{base}_{date}{suffix}"),
    };
    Ok(format!("{}{}", finalize_stem(stem), ext))
}
