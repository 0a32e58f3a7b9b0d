mod collision;
mod config;
mod datetime;
mod error;
mod exif_reader;
mod filename_reader;
mod fs_reader;
mod history;
mod journal;
mod media_reader;
mod metadata;
mod naming;
mod planner;
mod resolver;
mod sanitize;
mod sidecar;
mod source;
mod takeout_reader;
mod tool_reader;
mod transaction;
mod xmp_reader;

#[cfg(test)]
mod test_support;

pub use collision::CollisionResolver;
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    ExifToolSetting,
};
pub use datetime::{parse_timestamp, validate_format, CaptureTimestamp};
pub use error::{FormatError, RenameError, SourceError};
pub use exif_reader::ExifSource;
pub use filename_reader::{parse_date_from_filename, FilenameSource};
pub use fs_reader::{FilesystemSource, FilesystemTime};
pub use history::{RenameBatch, RenameHistory, RenamePair};
pub use journal::OperationJournal;
pub use media_reader::{normalize_media_date, MediaInfoSource};
pub use metadata::{FileClass, MetadataSource, ResolutionResult};
pub use naming::{
    format_name, format_placeholders, split_name, NamePreview, NamingPattern, NamingSettings,
    DEFAULT_DATE_FORMAT,
};
pub use planner::{
    collect_media_files, preview_folder, PreviewRow, PreviewStatus, ScanOptions, ScanStats,
};
pub use resolver::{DeepOptions, ResolverOptions, TimestampResolver};
pub use sidecar::{find_takeout_sidecar, find_xmp_sidecar};
pub use source::TimestampSource;
pub use takeout_reader::{parse_takeout_date, TakeoutSource};
pub use tool_reader::{pick_tool_date, ExifToolMode, ExifToolSource};
pub use transaction::{
    BatchProgress, BatchSummary, CancelToken, FileFault, RenameManager, SkipReason, SkippedFile,
    UndoConflict, UndoFault, UndoSummary,
};
pub use xmp_reader::{parse_xmp_date, HeicXmpSource, XmpSidecarSource};
