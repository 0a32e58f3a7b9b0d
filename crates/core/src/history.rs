use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenamePair {
    pub original: PathBuf,
    pub renamed: PathBuf,
}

/// Renames carried out by one run, in the order they happened.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameBatch {
    pub pairs: Vec<RenamePair>,
}

impl RenameBatch {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Undo stack for the current process. Nothing here is ever written to disk.
#[derive(Debug, Default)]
pub struct RenameHistory {
    batches: Vec<RenameBatch>,
}

impl RenameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty batches are dropped so every entry has something to undo.
    pub fn push(&mut self, batch: RenameBatch) -> bool {
        if batch.is_empty() {
            return false;
        }
        self.batches.push(batch);
        true
    }

    pub fn pop(&mut self) -> Option<RenameBatch> {
        self.batches.pop()
    }

    pub fn depth(&self) -> usize {
        self.batches.len()
    }
}
