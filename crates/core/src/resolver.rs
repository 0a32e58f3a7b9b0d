use crate::exif_reader::ExifSource;
use crate::filename_reader::FilenameSource;
use crate::fs_reader::{FilesystemSource, FilesystemTime};
use crate::media_reader::MediaInfoSource;
use crate::metadata::{FileClass, ResolutionResult};
use crate::source::TimestampSource;
use crate::takeout_reader::TakeoutSource;
use crate::tool_reader::{ExifToolMode, ExifToolSource};
use crate::xmp_reader::{HeicXmpSource, XmpSidecarSource};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Optional readers that look beyond the file's own embedded metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeepOptions {
    pub read_takeout_json: bool,
    pub read_xmp_sidecar: bool,
    pub parse_filename: bool,
}

impl Default for DeepOptions {
    fn default() -> Self {
        Self {
            read_takeout_json: true,
            read_xmp_sidecar: true,
            parse_filename: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    pub exiftool: ExifToolMode,
    pub deep: DeepOptions,
    pub filesystem_time: FilesystemTime,
}

/// Ordered chain of timestamp sources with a filesystem fallback.
///
/// Resolution never fails: every source error collapses into "no value"
/// and the next source is tried.
pub struct TimestampResolver {
    sources: Vec<Box<dyn TimestampSource>>,
    fallback: Box<dyn TimestampSource>,
}

impl TimestampResolver {
    pub fn new(options: &ResolverOptions) -> Self {
        let mut sources: Vec<Box<dyn TimestampSource>> = Vec::new();
        let tool = ExifToolSource::new(&options.exiftool);
        if tool.is_available() {
            sources.push(Box::new(tool));
        }
        if options.deep.read_takeout_json {
            sources.push(Box::new(TakeoutSource));
        }
        if options.deep.read_xmp_sidecar {
            sources.push(Box::new(XmpSidecarSource));
        }
        sources.push(Box::new(ExifSource));
        sources.push(Box::new(HeicXmpSource));
        sources.push(Box::new(MediaInfoSource));
        if options.deep.parse_filename {
            sources.push(Box::new(FilenameSource));
        }

        debug!(
            sources = ?sources.iter().map(|s| s.kind().label()).collect::<Vec<_>>(),
            "timestamp resolver ready"
        );
        Self {
            sources,
            fallback: Box::new(FilesystemSource::new(options.filesystem_time)),
        }
    }

    pub fn with_sources(
        sources: Vec<Box<dyn TimestampSource>>,
        fallback: Box<dyn TimestampSource>,
    ) -> Self {
        Self { sources, fallback }
    }

    pub fn resolve(&self, path: &Path, use_fallback: bool) -> ResolutionResult {
        let class = FileClass::of(path);
        for source in self.sources.iter().filter(|s| s.supports(class)) {
            if let Some(ts) = source.try_extract(path) {
                trace!(path = %path.display(), source = %source.kind(), "timestamp resolved");
                return ResolutionResult::found(ts, source.kind());
            }
        }
        if use_fallback {
            if let Some(ts) = self.fallback.try_extract(path) {
                trace!(path = %path.display(), "timestamp from filesystem fallback");
                return ResolutionResult::found(ts, self.fallback.kind());
            }
        }
        ResolutionResult::missing()
    }

    /// Results line up with `paths`.
    pub fn resolve_many(
        &self,
        paths: &[PathBuf],
        use_fallback: bool,
        parallel: bool,
    ) -> Vec<ResolutionResult> {
        if parallel {
            paths
                .par_iter()
                .map(|path| self.resolve(path, use_fallback))
                .collect()
        } else {
            paths
                .iter()
                .map(|path| self.resolve(path, use_fallback))
                .collect()
        }
    }
}

impl Default for TimestampResolver {
    fn default() -> Self {
        Self::new(&ResolverOptions::default())
    }
}
