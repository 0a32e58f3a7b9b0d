use crate::datetime::CaptureTimestamp;
use crate::error::SourceError;
use crate::metadata::MetadataSource;
use crate::source::TimestampSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilesystemTime {
    #[default]
    Created,
    Modified,
}

/// Terminal fallback: succeeds for every file that can still be stat'ed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemSource {
    pub prefer: FilesystemTime,
}

impl FilesystemSource {
    pub fn new(prefer: FilesystemTime) -> Self {
        Self { prefer }
    }
}

impl TimestampSource for FilesystemSource {
    fn kind(&self) -> MetadataSource {
        MetadataSource::FilesystemStat
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError> {
        let meta = fs::metadata(path)?;
        let time = match self.prefer {
            FilesystemTime::Created => meta
                .created()
                .ok()
                .or_else(|| status_changed(&meta))
                .map_or_else(|| meta.modified(), Ok)?,
            FilesystemTime::Modified => meta.modified()?,
        };
        Ok(CaptureTimestamp::from_system_time(time))
    }
}

#[cfg(unix)]
fn status_changed(meta: &fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn status_changed(_meta: &fs::Metadata) -> Option<SystemTime> {
    None
}
