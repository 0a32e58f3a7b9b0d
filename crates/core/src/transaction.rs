use crate::datetime::validate_format;
use crate::error::RenameError;
use crate::history::{RenameBatch, RenameHistory, RenamePair};
use crate::journal::OperationJournal;
use crate::metadata::ResolutionResult;
use crate::naming::{format_name, NamePreview, NamingSettings};
use crate::planner::{canonical_folder, file_name_of, locate_in_folder, FolderNames};
use crate::resolver::TimestampResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative stop signal, polled between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    pub processed: usize,
    pub total: usize,
    pub path: &'a Path,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoTimestamp,
    AlreadyNamed,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoTimestamp => "no metadata",
            Self::AlreadyNamed => "already named",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFault {
    pub path: PathBuf,
    pub reason: String,
}

/// Every input file lands in exactly one of `renamed`, `skipped`, `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub renamed: Vec<RenamePair>,
    pub skipped: Vec<SkippedFile>,
    pub errors: Vec<FileFault>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.renamed.len() + self.skipped.len() + self.errors.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum UndoConflict {
    TargetExists,
    SourceMissing,
    Filesystem(String),
}

impl fmt::Display for UndoConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetExists => f.write_str("target exists"),
            Self::SourceMissing => f.write_str("source missing"),
            Self::Filesystem(detail) => write!(f, "rename failed: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UndoFault {
    pub pair: RenamePair,
    pub kind: UndoConflict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UndoSummary {
    pub restored: Vec<RenamePair>,
    pub errors: Vec<UndoFault>,
}

enum FileOutcome {
    Renamed(RenamePair),
    Skipped(SkipReason),
    Fault(String),
}

/// Runs rename batches and owns the undo history for the session.
///
/// Runs and undos take `&mut self`, so they can never overlap.
pub struct RenameManager {
    resolver: TimestampResolver,
    history: RenameHistory,
    journal: Option<OperationJournal>,
}

impl RenameManager {
    pub fn new(resolver: TimestampResolver) -> Self {
        Self {
            resolver,
            history: RenameHistory::new(),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: OperationJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn resolver(&self) -> &TimestampResolver {
        &self.resolver
    }

    pub fn resolve_best_date(&self, path: &Path, use_fallback: bool) -> ResolutionResult {
        self.resolver.resolve(path, use_fallback)
    }

    /// Name the file would get if it were the only one renamed in its folder.
    pub fn preview_name(
        &self,
        path: &Path,
        settings: &NamingSettings,
    ) -> Result<NamePreview, RenameError> {
        let resolution = self.resolver.resolve(path, settings.use_filesystem_fallback);
        let Some(ts) = resolution.timestamp else {
            return Ok(NamePreview::NoDate);
        };
        let name = file_name_of(path);
        let candidate = format_name(&ts, &name, settings)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut names = FolderNames::default();
        let target = names
            .assign(dir, &candidate, &name)
            .map(|target| file_name_of(&target))
            .unwrap_or(candidate);
        Ok(NamePreview::Rename(target))
    }

    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    pub fn run_batch(
        &mut self,
        folder: &Path,
        files: &[PathBuf],
        settings: &NamingSettings,
    ) -> Result<BatchSummary, RenameError> {
        self.run_batch_with(folder, files, settings, &CancelToken::new(), |_| {})
    }

    pub fn run_batch_with<F>(
        &mut self,
        folder: &Path,
        files: &[PathBuf],
        settings: &NamingSettings,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<BatchSummary, RenameError>
    where
        F: FnMut(&BatchProgress<'_>),
    {
        let root = canonical_folder(folder)?;
        validate_format(&settings.format_str)?;

        let total = files.len();
        let mut names = FolderNames::default();
        let mut summary = BatchSummary::default();
        let mut batch = RenameBatch::default();
        self.journal_line(&format!("batch start: {} ({} files)", root.display(), total));

        for (index, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                summary
                    .skipped
                    .extend(files[index..].iter().map(|path| SkippedFile {
                        path: path.clone(),
                        reason: SkipReason::Cancelled,
                    }));
                break;
            }

            match self.process_file(&root, path, settings, &mut names) {
                FileOutcome::Renamed(pair) => {
                    self.journal_rename("renamed", &pair);
                    batch.pairs.push(pair.clone());
                    summary.renamed.push(pair);
                }
                FileOutcome::Skipped(reason) => summary.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason,
                }),
                FileOutcome::Fault(reason) => {
                    warn!(path = %path.display(), %reason, "rename failed");
                    self.journal_line(&format!("error: {}: {reason}", path.display()));
                    summary.errors.push(FileFault {
                        path: path.clone(),
                        reason,
                    });
                }
            }

            on_progress(&BatchProgress {
                processed: index + 1,
                total,
                path,
            });
        }

        self.history.push(batch);
        info!(
            renamed = summary.renamed.len(),
            skipped = summary.skipped.len(),
            errors = summary.errors.len(),
            cancelled = summary.cancelled,
            "rename batch finished"
        );
        self.journal_line(&format!(
            "batch done: renamed {}, skipped {}, errors {}{}",
            summary.renamed.len(),
            summary.skipped.len(),
            summary.errors.len(),
            if summary.cancelled { " (cancelled)" } else { "" }
        ));
        self.flush_journal();
        Ok(summary)
    }

    fn process_file(
        &self,
        root: &Path,
        path: &Path,
        settings: &NamingSettings,
        names: &mut FolderNames,
    ) -> FileOutcome {
        let located = match locate_in_folder(root, path) {
            Ok(located) => located,
            Err(reason) => return FileOutcome::Fault(reason),
        };
        match fs::metadata(&located.path) {
            Err(_) => {
                return FileOutcome::Fault(format!("file vanished: {}", located.path.display()))
            }
            Ok(meta) if !meta.is_file() => {
                return FileOutcome::Fault(format!(
                    "not a regular file: {}",
                    located.path.display()
                ))
            }
            Ok(_) => {}
        }

        let resolution = self
            .resolver
            .resolve(&located.path, settings.use_filesystem_fallback);
        let Some(ts) = resolution.timestamp else {
            return FileOutcome::Skipped(SkipReason::NoTimestamp);
        };

        let candidate = match format_name(&ts, &located.name, settings) {
            Ok(candidate) => candidate,
            Err(err) => return FileOutcome::Fault(err.to_string()),
        };
        let target = match names.assign(&located.dir, &candidate, &located.name) {
            Ok(target) => target,
            Err(err) => {
                return FileOutcome::Fault(format!(
                    "cannot list {}: {err}",
                    located.dir.display()
                ))
            }
        };
        if target == located.path {
            return FileOutcome::Skipped(SkipReason::AlreadyNamed);
        }

        let target_name = file_name_of(&target);
        // Something may have appeared since the snapshot was taken.
        if fs::symlink_metadata(&target).is_ok() {
            names.release(&located.dir, &target_name);
            return FileOutcome::Fault(format!("destination already exists: {}", target.display()));
        }
        if let Err(err) = fs::rename(&located.path, &target) {
            names.release(&located.dir, &target_name);
            return FileOutcome::Fault(err.to_string());
        }
        names.vacate(&located.dir, &located.name);

        FileOutcome::Renamed(RenamePair {
            original: located.path,
            renamed: target,
        })
    }

    /// Reverts the most recent batch only.
    pub fn undo_last(&mut self) -> Result<UndoSummary, RenameError> {
        let batch = self.history.pop().ok_or(RenameError::NothingToUndo)?;
        let mut summary = UndoSummary::default();

        for pair in batch.pairs.iter().rev() {
            let conflict = if fs::symlink_metadata(&pair.renamed).is_err() {
                Some(UndoConflict::SourceMissing)
            } else if fs::symlink_metadata(&pair.original).is_ok() {
                Some(UndoConflict::TargetExists)
            } else {
                fs::rename(&pair.renamed, &pair.original)
                    .err()
                    .map(|err| UndoConflict::Filesystem(err.to_string()))
            };

            match conflict {
                None => {
                    self.journal_rename("restored", pair);
                    summary.restored.push(pair.clone());
                }
                Some(kind) => {
                    warn!(path = %pair.renamed.display(), %kind, "undo skipped a file");
                    self.journal_line(&format!(
                        "undo error: {} -> {}: {kind}",
                        pair.renamed.display(),
                        pair.original.display()
                    ));
                    summary.errors.push(UndoFault {
                        pair: pair.clone(),
                        kind,
                    });
                }
            }
        }

        info!(
            restored = summary.restored.len(),
            errors = summary.errors.len(),
            remaining = self.history.depth(),
            "undo finished"
        );
        self.flush_journal();
        Ok(summary)
    }

    /// Flushes and closes the journal, if any.
    pub fn close(&mut self) {
        if let Some(journal) = self.journal.as_mut() {
            journal.close();
        }
    }

    fn journal_line(&mut self, message: &str) {
        if let Some(journal) = self.journal.as_mut() {
            journal.record(message);
        }
    }

    fn journal_rename(&mut self, verb: &str, pair: &RenamePair) {
        if let Some(journal) = self.journal.as_mut() {
            journal.record_rename(verb, pair);
        }
    }

    fn flush_journal(&mut self) {
        if let Some(journal) = self.journal.as_mut() {
            journal.flush();
        }
    }
}
