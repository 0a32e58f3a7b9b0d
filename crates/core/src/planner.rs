use crate::collision::CollisionResolver;
use crate::datetime::{validate_format, CaptureTimestamp};
use crate::error::RenameError;
use crate::metadata::{FileClass, MetadataSource};
use crate::naming::{format_name, NamePreview, NamingSettings};
use crate::resolver::TimestampResolver;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub media_files: usize,
    pub skipped_non_media: usize,
    pub skipped_hidden: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Rename,
    Unchanged,
    NoTimestamp,
    Fault,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub path: PathBuf,
    pub timestamp: Option<CaptureTimestamp>,
    pub source: Option<MetadataSource>,
    pub target: Option<PathBuf>,
    pub preview: NamePreview,
    pub status: PreviewStatus,
    pub note: Option<String>,
}

/// Media files under `folder`, sorted by path.
pub fn collect_media_files(
    folder: &Path,
    options: &ScanOptions,
) -> Result<(Vec<PathBuf>, ScanStats), RenameError> {
    if !folder.is_dir() {
        return Err(RenameError::InvalidFolder(folder.to_path_buf()));
    }

    let mut stats = ScanStats::default();
    let mut out = Vec::new();
    let mut visit = |path: &Path, stats: &mut ScanStats| {
        stats.scanned_files += 1;
        if is_hidden(path) && !options.include_hidden {
            stats.skipped_hidden += 1;
            return;
        }
        if FileClass::of(path) == FileClass::Other {
            stats.skipped_non_media += 1;
        } else {
            stats.media_files += 1;
            out.push(path.to_path_buf());
        }
    };

    if options.recursive {
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry.map_err(|err| RenameError::Scan {
                path: err.path().unwrap_or(folder).to_path_buf(),
                source: err.into(),
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            visit(entry.path(), &mut stats);
        }
    } else {
        let scan_err = |source: io::Error| RenameError::Scan {
            path: folder.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(folder).map_err(scan_err)? {
            let path = entry.map_err(scan_err)?.path();
            if path.is_dir() {
                continue;
            }
            visit(&path, &mut stats);
        }
    }

    out.sort();
    Ok((out, stats))
}

/// Planned names for every file, without touching the disk.
///
/// Timestamps may be resolved in parallel; names are always assigned in
/// `files` order so the outcome matches a real run.
pub fn preview_folder(
    resolver: &TimestampResolver,
    folder: &Path,
    files: &[PathBuf],
    settings: &NamingSettings,
    parallel: bool,
) -> Result<Vec<PreviewRow>, RenameError> {
    let root = canonical_folder(folder)?;
    validate_format(&settings.format_str)?;

    let resolutions = resolver.resolve_many(files, settings.use_filesystem_fallback, parallel);
    let mut names = FolderNames::default();
    let mut rows = Vec::with_capacity(files.len());

    for (path, resolution) in files.iter().zip(resolutions) {
        let mut row = PreviewRow {
            path: path.clone(),
            timestamp: resolution.timestamp,
            source: resolution.source,
            target: None,
            preview: NamePreview::NoDate,
            status: PreviewStatus::NoTimestamp,
            note: None,
        };

        let located = match locate_in_folder(&root, path) {
            Ok(located) => located,
            Err(reason) => {
                row.status = PreviewStatus::Fault;
                row.note = Some(reason);
                rows.push(row);
                continue;
            }
        };

        if let Some(ts) = resolution.timestamp {
            let planned = format_name(&ts, &located.name, settings)
                .map_err(|err| err.to_string())
                .and_then(|candidate| {
                    names
                        .assign(&located.dir, &candidate, &located.name)
                        .map_err(|err| err.to_string())
                });
            match planned {
                Ok(target) => {
                    let name = file_name_of(&target);
                    row.status = if target == located.path {
                        PreviewStatus::Unchanged
                    } else {
                        names.vacate(&located.dir, &located.name);
                        PreviewStatus::Rename
                    };
                    row.preview = NamePreview::Rename(name);
                    row.target = Some(target);
                }
                Err(reason) => {
                    row.status = PreviewStatus::Fault;
                    row.note = Some(reason);
                }
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

pub(crate) fn canonical_folder(folder: &Path) -> Result<PathBuf, RenameError> {
    if !folder.is_dir() {
        return Err(RenameError::InvalidFolder(folder.to_path_buf()));
    }
    fs::canonicalize(folder).map_err(|_| RenameError::InvalidFolder(folder.to_path_buf()))
}

pub(crate) struct LocatedFile {
    pub dir: PathBuf,
    pub name: String,
    pub path: PathBuf,
}

/// Canonical location of `path`, which must lie inside `root`.
pub(crate) fn locate_in_folder(root: &Path, path: &Path) -> Result<LocatedFile, String> {
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .ok_or_else(|| format!("not a file path: {}", path.display()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = fs::canonicalize(parent)
        .map_err(|err| format!("cannot access {}: {err}", parent.display()))?;
    if !dir.starts_with(root) {
        return Err(format!("outside the target folder: {}", path.display()));
    }
    let path = dir.join(&name);
    Ok(LocatedFile { dir, name, path })
}

/// One collision snapshot per directory touched by a run.
#[derive(Default)]
pub(crate) struct FolderNames {
    dirs: HashMap<PathBuf, CollisionResolver>,
}

impl FolderNames {
    pub fn assign(&mut self, dir: &Path, candidate: &str, current: &str) -> io::Result<PathBuf> {
        let resolver = match self.dirs.entry(dir.to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(CollisionResolver::from_dir(dir)?),
        };
        Ok(dir.join(resolver.assign(candidate, Some(current))))
    }

    pub fn release(&mut self, dir: &Path, name: &str) {
        if let Some(resolver) = self.dirs.get_mut(dir) {
            resolver.release(name);
        }
    }

    pub fn vacate(&mut self, dir: &Path, old: &str) {
        if let Some(resolver) = self.dirs.get_mut(dir) {
            resolver.vacate(old);
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{collect_media_files, preview_folder, PreviewStatus, ScanOptions};
    use crate::error::RenameError;
    use crate::metadata::MetadataSource;
    use crate::naming::{NamePreview, NamingSettings};
    use crate::resolver::tests::offline_options;
    use crate::resolver::TimestampResolver;
    use crate::test_support::jpeg_with_exif_date;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collects_sorted_media_and_counts_the_rest() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");
        for name in ["b.JPG", "a.mov", ".hidden.jpg", "notes.txt", "a.mov.json", "sub/c.heic"] {
            fs::write(temp.path().join(name), b"x").expect("write file");
        }

        let (files, stats) =
            collect_media_files(temp.path(), &ScanOptions::default()).expect("scan");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mov", "b.JPG"]);
        assert_eq!(stats.scanned_files, 5);
        assert_eq!(stats.skipped_hidden, 1);
        assert_eq!(stats.skipped_non_media, 2);

        let (files, stats) = collect_media_files(
            temp.path(),
            &ScanOptions {
                recursive: true,
                include_hidden: true,
            },
        )
        .expect("recursive scan");
        assert_eq!(files.len(), 4);
        assert_eq!(stats.skipped_hidden, 0);
    }

    #[test]
    fn missing_folder_is_rejected_upfront() {
        let temp = tempdir().expect("tempdir");
        let err = collect_media_files(&temp.path().join("nope"), &ScanOptions::default())
            .expect_err("must fail");
        assert!(matches!(err, RenameError::InvalidFolder(_)));
    }

    #[test]
    fn preview_plans_collisions_and_reports_missing_dates() {
        let temp = tempdir().expect("tempdir");
        let exif = jpeg_with_exif_date("2023:04:13 14:30:15");
        fs::write(temp.path().join("IMG_0001.jpg"), &exif).expect("write");
        fs::write(temp.path().join("IMG_0002.jpg"), &exif).expect("write");
        fs::write(temp.path().join("scan.png"), b"x").expect("write");

        let resolver = TimestampResolver::new(&offline_options());
        let (files, _) = collect_media_files(temp.path(), &ScanOptions::default()).expect("scan");
        let rows = preview_folder(&resolver, temp.path(), &files, &NamingSettings::default(), true)
            .expect("preview");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].preview, NamePreview::Rename("2023-04-13_14-30-15.jpg".to_string()));
        assert_eq!(rows[0].source, Some(MetadataSource::ClassicExif));
        assert_eq!(rows[1].preview, NamePreview::Rename("2023-04-13_14-30-15_1.jpg".to_string()));
        assert_eq!(rows[2].status, PreviewStatus::NoTimestamp);
        assert_eq!(rows[2].preview.to_string(), "no rename (no date found)");

        // Preview never renames anything.
        assert!(temp.path().join("IMG_0001.jpg").exists());
    }

    #[test]
    fn already_named_file_previews_as_unchanged() {
        let temp = tempdir().expect("tempdir");
        let name = "2023-04-13_14-30-15.jpg";
        fs::write(temp.path().join(name), jpeg_with_exif_date("2023:04:13 14:30:15"))
            .expect("write");

        let resolver = TimestampResolver::new(&offline_options());
        let files = vec![temp.path().join(name)];
        let rows = preview_folder(&resolver, temp.path(), &files, &NamingSettings::default(), false)
            .expect("preview");
        assert_eq!(rows[0].status, PreviewStatus::Unchanged);
    }

    #[test]
    fn file_outside_folder_is_a_fault_row() {
        let temp = tempdir().expect("tempdir");
        let other = tempdir().expect("other tempdir");
        let stray = other.path().join("IMG_9.jpg");
        fs::write(&stray, jpeg_with_exif_date("2023:04:13 14:30:15")).expect("write");

        let resolver = TimestampResolver::new(&offline_options());
        let rows = preview_folder(&resolver, temp.path(), &[stray], &NamingSettings::default(), false)
            .expect("preview");
        assert_eq!(rows[0].status, PreviewStatus::Fault);
        assert!(rows[0].note.as_deref().unwrap_or_default().contains("outside"));
    }
}
