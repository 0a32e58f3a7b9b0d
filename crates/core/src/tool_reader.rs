use crate::datetime::{parse_timestamp, CaptureTimestamp};
use crate::error::SourceError;
use crate::metadata::MetadataSource;
use crate::source::TimestampSource;
use exiftool::ExifTool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Grouped tag names, most specific first.
const GROUPED_DATE_TAGS: &[&str] = &[
    "EXIF:DateTimeOriginal",
    "EXIF:CreateDate",
    "XMP:CreateDate",
    "XMP:DateCreated",
    "QuickTime:CreateDate",
    "QuickTime:MediaCreateDate",
    "QuickTime:TrackCreateDate",
    "QuickTime:ModifyDate",
    "QuickTime:ContentCreateDate",
    "Composite:SubSecDateTimeOriginal",
    "Composite:DateTimeCreated",
    "PNG:CreationTime",
];

/// Matched against any group when the grouped names are absent.
const BARE_DATE_TAGS: &[&str] = &["DateTimeOriginal", "CreateDate", "MediaCreateDate"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "mode", content = "path")]
pub enum ExifToolMode {
    #[default]
    Auto,
    Off,
    Path(PathBuf),
}

/// Reads dates through a long-running `exiftool -stay_open` process.
///
/// The process is started once; if that fails the source stays unavailable
/// for the lifetime of the value.
pub struct ExifToolSource {
    tool: Option<Mutex<ExifTool>>,
}

impl ExifToolSource {
    pub fn new(mode: &ExifToolMode) -> Self {
        let started = match mode {
            ExifToolMode::Off => return Self::disabled(),
            ExifToolMode::Auto => ExifTool::new(),
            ExifToolMode::Path(path) => ExifTool::with_executable(path),
        };
        match started {
            Ok(tool) => {
                debug!("exiftool started");
                Self {
                    tool: Some(Mutex::new(tool)),
                }
            }
            Err(err) => {
                warn!(error = %err, "exiftool could not be started; skipping tool tags");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { tool: None }
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_some()
    }
}

impl TimestampSource for ExifToolSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::ToolTags
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let tool = self
            .tool
            .as_ref()
            .ok_or_else(|| SourceError::Unavailable("exiftool".to_string()))?;
        let value = {
            let mut guard = tool
                .lock()
                .map_err(|_| SourceError::Unavailable("exiftool lock poisoned".to_string()))?;
            guard.json(path, &["-G"])?
        };
        pick_tool_date(&value).ok_or(SourceError::Missing)
    }
}

/// First parseable date among the known tags of one `exiftool -G -j` record.
pub fn pick_tool_date(value: &Value) -> Option<CaptureTimestamp> {
    let record = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let map = record.as_object()?;

    let grouped = GROUPED_DATE_TAGS.iter().filter_map(|tag| map.get(*tag));
    let bare = BARE_DATE_TAGS.iter().flat_map(|tag| {
        map.iter()
            .filter(move |(key, _)| {
                key.as_str() == *tag || key.rsplit_once(':').is_some_and(|(_, name)| name == *tag)
            })
            .map(|(_, v)| v)
    });

    grouped
        .chain(bare)
        .filter_map(Value::as_str)
        .find_map(|raw| parse_timestamp(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::{pick_tool_date, ExifToolMode, ExifToolSource};
    use crate::source::TimestampSource;
    use chrono::{Datelike, Timelike};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn original_date_beats_quicktime_dates() {
        let value = json!({
            "SourceFile": "a.mov",
            "QuickTime:CreateDate": "2020:01:01 00:00:00",
            "EXIF:DateTimeOriginal": "2023:04:13 14:30:15",
        });
        let ts = pick_tool_date(&value).expect("date");
        assert_eq!(ts.naive().year(), 2023);
        assert_eq!(ts.naive().minute(), 30);
    }

    #[test]
    fn zeroed_quicktime_date_falls_through_to_next_tag() {
        let value = json!([{
            "QuickTime:CreateDate": "0000:00:00 00:00:00",
            "QuickTime:MediaCreateDate": "2021:06:07 08:09:10",
        }]);
        let ts = pick_tool_date(&value).expect("date");
        assert_eq!(ts.naive().day(), 7);
    }

    #[test]
    fn bare_tag_in_unlisted_group_is_used() {
        let value = json!({ "MakerNotes:DateTimeOriginal": "2019:09:09 09:09:09+09:00" });
        let ts = pick_tool_date(&value).expect("date");
        assert_eq!(ts.naive().hour(), 9);
        assert_eq!(ts.offset().map(|o| o.local_minus_utc()), Some(9 * 3600));
    }

    #[test]
    fn records_without_dates_yield_none() {
        assert!(pick_tool_date(&json!({ "File:FileName": "x.jpg" })).is_none());
        assert!(pick_tool_date(&json!([])).is_none());
        assert!(pick_tool_date(&json!("text")).is_none());
    }

    #[test]
    fn disabled_tool_is_unavailable() {
        let source = ExifToolSource::new(&ExifToolMode::Off);
        assert!(!source.is_available());
        assert!(source.try_extract(Path::new("whatever.jpg")).is_none());
    }

    #[test]
    fn missing_executable_degrades_to_disabled() {
        let source = ExifToolSource::new(&ExifToolMode::Path(
            "/nonexistent/bin/exiftool-not-here".into(),
        ));
        assert!(!source.is_available());
    }
}
