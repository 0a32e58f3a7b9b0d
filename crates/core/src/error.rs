use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("unparseable timestamp: {0:?}")]
    Unparseable(String),
    #[error("no timestamp candidate present")]
    Missing,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Exif(#[from] exif::Error),
    #[error(transparent)]
    Tool(#[from] exiftool::ExifToolError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("date format is empty")]
    Empty,
    #[error("date format contains an unsupported specifier: {0}")]
    InvalidPattern(String),
    #[error("timestamp could not be rendered with format {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("target folder does not exist or is not a directory: {}", .0.display())]
    InvalidFolder(PathBuf),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("failed to read folder {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
