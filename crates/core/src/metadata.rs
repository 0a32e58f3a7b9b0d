use crate::datetime::CaptureTimestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const STILL_IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "gif", "arw", "nef", "cr2", "dng", "rw2",
    "orf", "srw",
];
const HEIC_EXTS: &[&str] = &["heic", "heif"];
const VIDEO_EXTS: &[&str] = &[
    "mp4", "mov", "m4v", "mkv", "avi", "wmv", "webm", "3gp", "mts", "m2ts", "mpg", "mpeg",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    ToolTags,
    ClassicExif,
    HeicXmp,
    MediaInfo,
    FilenamePattern,
    XmpSidecar,
    TakeoutSidecar,
    FilesystemStat,
}

impl MetadataSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::ToolTags => "exiftool",
            Self::ClassicExif => "exif",
            Self::HeicXmp => "heic_xmp",
            Self::MediaInfo => "mediainfo",
            Self::FilenamePattern => "filename",
            Self::XmpSidecar => "xmp_sidecar",
            Self::TakeoutSidecar => "takeout_json",
            Self::FilesystemStat => "filesystem",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    StillImage,
    Heic,
    Video,
    Other,
}

impl FileClass {
    pub fn of(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return Self::Other;
        };
        let ext = ext.to_ascii_lowercase();
        if HEIC_EXTS.contains(&ext.as_str()) {
            Self::Heic
        } else if STILL_IMAGE_EXTS.contains(&ext.as_str()) {
            Self::StillImage
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Other
        }
    }
}

/// Outcome of resolving one file. `source` is `None` exactly when no
/// timestamp was found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionResult {
    pub timestamp: Option<CaptureTimestamp>,
    pub source: Option<MetadataSource>,
}

impl ResolutionResult {
    pub fn found(timestamp: CaptureTimestamp, source: MetadataSource) -> Self {
        Self {
            timestamp: Some(timestamp),
            source: Some(source),
        }
    }

    pub fn missing() -> Self {
        Self {
            timestamp: None,
            source: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.timestamp.is_some()
    }
}
