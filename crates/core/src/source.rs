use crate::datetime::CaptureTimestamp;
use crate::error::SourceError;
use crate::metadata::{FileClass, MetadataSource};
use std::path::Path;
use tracing::debug;

/// One strategy for reading a capture timestamp out of a file.
///
/// `extract` may fail for any reason; `try_extract` is the boundary the
/// resolver calls, and it turns every failure into `None`.
pub trait TimestampSource: Send + Sync {
    fn kind(&self) -> MetadataSource;

    fn supports(&self, _class: FileClass) -> bool {
        true
    }

    fn extract(&self, path: &Path) -> Result<CaptureTimestamp, SourceError>;

    fn try_extract(&self, path: &Path) -> Option<CaptureTimestamp> {
        match self.extract(path) {
            Ok(timestamp) => Some(timestamp),
            Err(SourceError::Missing) => None,
            Err(err) => {
                debug!(source = %self.kind(), path = %path.display(), error = %err, "source yielded nothing");
                None
            }
        }
    }
}
