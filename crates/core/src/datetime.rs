use crate::error::{FormatError, SourceError};
use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::SystemTime;

const OFFSET_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%z",
    "%Y:%m:%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y:%m:%d", "%Y-%m-%d"];

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("failed to compile whitespace regex"));

static TRAILING_ZONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[+-]\d{2}:?\d{2}|Z)$").expect("failed to compile trailing zone regex")
});

/// A capture date-time as the camera's wall clock, with the UTC offset when
/// the source recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureTimestamp {
    local: NaiveDateTime,
    offset_seconds: Option<i32>,
}

impl CaptureTimestamp {
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset_seconds: None,
        }
    }

    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            local,
            offset_seconds: Some(offset.local_minus_utc()),
        }
    }

    /// Date-only sources start at midnight.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(NaiveTime::MIN))
    }

    pub fn from_fixed(value: DateTime<FixedOffset>) -> Self {
        Self::with_offset(value.naive_local(), *value.offset())
    }

    /// Instants without a recorded wall clock are shown in the local zone.
    pub fn from_utc(value: DateTime<Utc>) -> Self {
        Self::from_fixed(value.with_timezone(&Local).fixed_offset())
    }

    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(seconds, 0).map(Self::from_utc)
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_utc(DateTime::<Utc>::from(time))
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset_seconds.and_then(FixedOffset::east_opt)
    }

    pub fn render(&self, format: &str) -> Result<String, FormatError> {
        let items = format_items(format)?;
        let zoned = self.zoned();
        let mut out = String::new();
        write!(out, "{}", zoned.format_with_items(items.iter()))
            .map_err(|_| FormatError::Render(format.to_string()))?;
        Ok(out)
    }

    fn zoned(&self) -> DateTime<FixedOffset> {
        let offset = self
            .offset()
            .unwrap_or_else(|| local_offset_for(&self.local));
        offset
            .from_local_datetime(&self.local)
            .single()
            .unwrap_or_else(|| offset.from_utc_datetime(&self.local))
    }
}

pub fn validate_format(format: &str) -> Result<(), FormatError> {
    format_items(format).map(|_| ())
}

fn format_items(format: &str) -> Result<Vec<Item<'_>>, FormatError> {
    if format.trim().is_empty() {
        return Err(FormatError::Empty);
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::InvalidPattern(format.to_string()));
    }
    Ok(items)
}

fn local_offset_for(naive: &NaiveDateTime) -> FixedOffset {
    Local
        .offset_from_local_datetime(naive)
        .earliest()
        .unwrap_or_else(|| Utc.fix())
}

pub fn parse_timestamp(input: &str) -> Result<CaptureTimestamp, SourceError> {
    let cleaned = WHITESPACE_RE.replace_all(input.trim(), " ");
    if cleaned.is_empty() {
        return Err(SourceError::Unparseable(input.to_string()));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            return Ok(CaptureTimestamp::from_fixed(dt));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        if cleaned.ends_with('Z') || cleaned.ends_with('z') {
            return Ok(CaptureTimestamp::from_utc(dt.with_timezone(&Utc)));
        }
        return Ok(CaptureTimestamp::from_fixed(dt));
    }

    if let Some(ts) = parse_naive(&cleaned) {
        return Ok(ts);
    }

    for fmt in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Ok(CaptureTimestamp::from_date(date));
        }
    }

    let stripped = TRAILING_ZONE_RE.replace(&cleaned, "");
    let stripped = stripped.trim();
    if stripped != cleaned.as_ref() {
        if let Some(ts) = parse_naive(stripped) {
            return Ok(ts);
        }
    }

    Err(SourceError::Unparseable(input.to_string()))
}

fn parse_naive(input: &str) -> Option<CaptureTimestamp> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(CaptureTimestamp::new)
}
