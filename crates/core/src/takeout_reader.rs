use crate::datetime::CaptureTimestamp;
use crate::error::SourceError;
use crate::metadata::MetadataSource;
use crate::sidecar::find_takeout_sidecar;
use crate::source::TimestampSource;
use serde_json::Value;
use std::fs;
use std::path::Path;

const TIME_NODES: &[&str] = &["photoTakenTime", "creationTime", "modificationTime"];

/// Google Takeout `<name>.<ext>.json` metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct TakeoutSource;

impl TimestampSource for TakeoutSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::TakeoutSidecar
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let sidecar = find_takeout_sidecar(path).ok_or(SourceError::Missing)?;
        let raw = fs::read_to_string(&sidecar)?;
        let value: Value = serde_json::from_str(&raw)?;
        parse_takeout_date(&value)
    }
}

pub fn parse_takeout_date(value: &Value) -> Result<CaptureTimestamp, SourceError> {
    let seconds = TIME_NODES
        .iter()
        .find_map(|key| {
            value
                .get(*key)
                .and_then(|node| node.get("timestamp"))
                .filter(|ts| !is_unset(ts))
        })
        .or_else(|| value.get("timestamp"))
        .ok_or(SourceError::Missing)?;

    let parsed = match seconds {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(CaptureTimestamp::from_unix_seconds)
        .ok_or_else(|| SourceError::Unparseable(seconds.to_string()))
}

// Takeout writes "0" or "" for times it does not know.
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => matches!(s.trim(), "" | "0"),
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_takeout_date, TakeoutSource};
    use crate::datetime::CaptureTimestamp;
    use crate::source::TimestampSource;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn photo_taken_time_wins_over_creation_time() {
        let value = json!({
            "creationTime": { "timestamp": "1700000000" },
            "photoTakenTime": { "timestamp": "1600000000", "formatted": "..." }
        });
        let ts = parse_takeout_date(&value).expect("date");
        assert_eq!(ts, CaptureTimestamp::from_unix_seconds(1_600_000_000).expect("ts"));
    }

    #[test]
    fn zero_photo_taken_time_falls_through() {
        let value = json!({
            "photoTakenTime": { "timestamp": "0" },
            "creationTime": { "timestamp": 1_700_000_000 }
        });
        let ts = parse_takeout_date(&value).expect("date");
        assert_eq!(ts, CaptureTimestamp::from_unix_seconds(1_700_000_000).expect("ts"));
    }

    #[test]
    fn accepts_numeric_top_level_timestamp() {
        let value = json!({ "title": "x.jpg", "timestamp": 1_500_000_000 });
        let ts = parse_takeout_date(&value).expect("date");
        assert_eq!(ts, CaptureTimestamp::from_unix_seconds(1_500_000_000).expect("ts"));
    }

    #[test]
    fn non_numeric_timestamp_is_rejected() {
        let value = json!({ "photoTakenTime": { "timestamp": "soon" } });
        assert!(parse_takeout_date(&value).is_err());
    }

    #[test]
    fn reads_sidecar_next_to_media() {
        let temp = tempdir().expect("tempdir");
        let media = temp.path().join("PXL_0001.jpg");
        fs::write(&media, b"x").expect("write media");
        fs::write(
            temp.path().join("PXL_0001.jpg.json"),
            r#"{"photoTakenTime":{"timestamp":"1600000000"}}"#,
        )
        .expect("write json");

        assert!(TakeoutSource.try_extract(&media).is_some());

        fs::write(temp.path().join("PXL_0001.jpg.json"), "{ broken").expect("rewrite json");
        assert!(TakeoutSource.try_extract(&media).is_none());
    }
}
