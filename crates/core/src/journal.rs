use crate::history::RenamePair;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only operation log for people to read. It is never parsed back.
pub struct OperationJournal {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl OperationJournal {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn record(&mut self, message: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Err(err) = writeln!(writer, "[{stamp}] {message}") {
            warn!(path = %self.path.display(), error = %err, "operation journal write failed");
        }
    }

    pub fn record_rename(&mut self, verb: &str, pair: &RenamePair) {
        self.record(&format!(
            "{verb}: {} -> {}",
            pair.original.display(),
            pair.renamed.display()
        ));
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                warn!(path = %self.path.display(), error = %err, "operation journal flush failed");
            }
        }
    }

    /// Later writes are ignored.
    pub fn close(&mut self) {
        self.flush();
        self.writer = None;
    }
}

impl Drop for OperationJournal {
    fn drop(&mut self) {
        self.flush();
    }
}
