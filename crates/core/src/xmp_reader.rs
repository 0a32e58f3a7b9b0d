use crate::datetime::{parse_timestamp, CaptureTimestamp};
use crate::error::SourceError;
use crate::metadata::{FileClass, MetadataSource};
use crate::sidecar::find_xmp_sidecar;
use crate::source::TimestampSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static XMP_DATE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)xmp:CreateDate\s*=\s*["']([^"']+)["']"#,
        r"(?i)<xmp:CreateDate>\s*([^<]+?)\s*</xmp:CreateDate>",
        r"(?i)<photoshop:DateCreated>\s*([^<]+?)\s*</photoshop:DateCreated>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("failed to compile xmp date regex"))
    .collect()
});

static XMP_PACKET_RE: Lazy<regex::bytes::Regex> = Lazy::new(|| {
    regex::bytes::Regex::new(r"(?s)<x:xmpmeta.*?</x:xmpmeta>")
        .expect("failed to compile xmp packet regex")
});

/// First parseable date among the known XMP date properties.
pub fn parse_xmp_date(xml: &str) -> Result<CaptureTimestamp, SourceError> {
    let mut last_err = SourceError::Missing;
    for re in XMP_DATE_RES.iter() {
        let Some(caps) = re.captures(xml) else {
            continue;
        };
        match parse_timestamp(&html_unescape_basic(&caps[1])) {
            Ok(ts) => return Ok(ts),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}

/// Embedded XMP packet of a HEIC/HEIF container.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeicXmpSource;

impl TimestampSource for HeicXmpSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::HeicXmp
    }

    fn supports(&self, class: FileClass) -> bool {
        class == FileClass::Heic
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let bytes = fs::read(path)?;
        let packet = XMP_PACKET_RE
            .find(&bytes)
            .ok_or(SourceError::Missing)?;
        parse_xmp_date(&String::from_utf8_lossy(packet.as_bytes()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct XmpSidecarSource;

impl TimestampSource for XmpSidecarSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::XmpSidecar
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let sidecar = find_xmp_sidecar(path).ok_or(SourceError::Missing)?;
        let bytes = fs::read(&sidecar)?;
        parse_xmp_date(&String::from_utf8_lossy(&bytes))
    }
}

fn html_unescape_basic(input: &str) -> String {
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}
