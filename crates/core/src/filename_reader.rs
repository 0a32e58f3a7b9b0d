use crate::datetime::CaptureTimestamp;
use crate::error::SourceError;
use crate::metadata::MetadataSource;
use crate::source::TimestampSource;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
enum Layout {
    CompactDateTime,
    SplitDateTime,
    CompactDate,
}

static FILENAME_PATTERNS: Lazy<Vec<(Layout, Regex)>> = Lazy::new(|| {
    [
        // dji_fly_20251108_164116
        (
            Layout::CompactDateTime,
            r"(?i)\bDJI[_-]?FLY[_-]((?:19|20)\d{6})[_-](\d{6})\b",
        ),
        (
            Layout::CompactDateTime,
            r"(?i)\bDJI[_-]((?:19|20)\d{6})[_-](\d{6})\b",
        ),
        (
            Layout::CompactDateTime,
            r"\b((?:19|20)\d{6})[_-](\d{6})\b",
        ),
        (
            Layout::CompactDateTime,
            r"(?i)\b(?:IMG|VID)[-_]?((?:19|20)\d{6})[_-](\d{6})\b",
        ),
        (
            Layout::SplitDateTime,
            r"\b(\d{4})[-_](\d{2})[-_](\d{2})[ _-](\d{2})[-_](\d{2})[-_](\d{2})\b",
        ),
        // WhatsApp: IMG-20240101-WA0003
        (Layout::CompactDate, r"(?i)\bIMG-(\d{8})-WA\d+\b"),
    ]
    .into_iter()
    .map(|(layout, pattern)| {
        (
            layout,
            Regex::new(pattern).expect("failed to compile filename regex"),
        )
    })
    .collect()
});

#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameSource;

impl TimestampSource for FilenameSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::FilenamePattern
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let stem = path
            .file_stem()
            .map(|v| v.to_string_lossy().to_string())
            .ok_or(SourceError::Missing)?;
        parse_date_from_filename(&stem).ok_or(SourceError::Missing)
    }
}

pub fn parse_date_from_filename(stem: &str) -> Option<CaptureTimestamp> {
    FILENAME_PATTERNS.iter().find_map(|(layout, re)| {
        let caps = re.captures(stem)?;
        match layout {
            Layout::CompactDateTime => {
                NaiveDateTime::parse_from_str(&format!("{}{}", &caps[1], &caps[2]), "%Y%m%d%H%M%S")
                    .ok()
                    .map(CaptureTimestamp::new)
            }
            Layout::SplitDateTime => {
                let joined = format!(
                    "{}-{}-{} {}:{}:{}",
                    &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
                );
                NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(CaptureTimestamp::new)
            }
            Layout::CompactDate => NaiveDate::parse_from_str(&caps[1], "%Y%m%d")
                .ok()
                .map(CaptureTimestamp::from_date),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::parse_date_from_filename;
    use chrono::{Datelike, Timelike};

    #[test]
    fn recognizes_camera_and_phone_layouts() {
        let dji = parse_date_from_filename("dji_fly_20251108_164116").expect("dji fly");
        assert_eq!(dji.naive().year(), 2025);
        assert_eq!(dji.naive().hour(), 16);

        let phone = parse_date_from_filename("IMG_20250101_120000").expect("img");
        assert_eq!(phone.naive().month(), 1);
        assert_eq!(phone.naive().hour(), 12);

        let generic = parse_date_from_filename("20251111_184839").expect("generic");
        assert_eq!(generic.naive().minute(), 48);

        let split = parse_date_from_filename("2023-04-13_14-30-15").expect("split");
        assert_eq!(split.naive().second(), 15);
    }

    #[test]
    fn whatsapp_names_are_date_only() {
        let ts = parse_date_from_filename("IMG-20240229-WA0003").expect("whatsapp");
        assert_eq!(ts.naive().day(), 29);
        assert_eq!(ts.naive().hour(), 0);
    }

    #[test]
    fn impossible_or_absent_dates_are_ignored() {
        assert!(parse_date_from_filename("IMG_0001").is_none());
        assert!(parse_date_from_filename("IMG_20231345_250000").is_none());
        assert!(parse_date_from_filename("holiday").is_none());
    }
}
