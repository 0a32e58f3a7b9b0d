use crate::datetime::{parse_timestamp, CaptureTimestamp};
use crate::error::SourceError;
use crate::metadata::{FileClass, MetadataSource};
use crate::source::TimestampSource;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

#[derive(Debug, Default, Clone, Copy)]
pub struct ExifSource;

impl TimestampSource for ExifSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::ClassicExif
    }

    fn supports(&self, class: FileClass) -> bool {
        matches!(class, FileClass::StillImage | FileClass::Heic)
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let file = File::open(path)?;
        let mut buf = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut buf)?;

        let mut last_err = SourceError::Missing;
        for tag in DATE_TAGS {
            let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
                continue;
            };
            match parse_timestamp(&field_text(field, &exif)) {
                Ok(ts) => return Ok(ts),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}

// display_value() quotes ASCII values, so read the raw bytes first.
fn field_text(field: &exif::Field, exif: &exif::Exif) -> String {
    match &field.value {
        Value::Ascii(values) if !values.is_empty() => {
            String::from_utf8_lossy(&values[0]).trim_end_matches('\0').to_string()
        }
        _ => field
            .display_value()
            .with_unit(exif)
            .to_string()
            .trim_matches('"')
            .to_string(),
    }
}
