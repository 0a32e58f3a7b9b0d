use crate::naming::split_name;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Hands out names that are unique against a directory snapshot and
/// against everything already assigned in this batch.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    existing: HashSet<String>,
    assigned: HashSet<String>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            existing: names.into_iter().map(Into::into).collect(),
            assigned: HashSet::new(),
        }
    }

    pub fn from_dir(dir: &Path) -> io::Result<Self> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        Ok(Self::with_existing(names))
    }

    /// `current_name` is the name the file already has: a file never
    /// collides with itself, and once it moves away its old name is free.
    pub fn assign(&mut self, candidate: &str, current_name: Option<&str>) -> String {
        if let Some(current) = current_name {
            self.existing.remove(current);
        }

        let chosen = if self.is_free(candidate) {
            candidate.to_string()
        } else {
            let (stem, ext) = split_name(candidate);
            (1u64..)
                .map(|n| format!("{stem}_{n}{ext}"))
                .find(|name| self.is_free(name))
                .unwrap_or_else(|| candidate.to_string())
        };

        if let Some(current) = current_name {
            if current != chosen {
                // Old name stays taken until the rename happens.
                self.existing.insert(current.to_string());
            }
        }
        self.assigned.insert(chosen.clone());
        chosen
    }

    /// Gives up an assignment that was never carried out.
    pub fn release(&mut self, name: &str) {
        self.assigned.remove(name);
    }

    /// Records that `old` moved to a name already handed out.
    pub fn vacate(&mut self, old: &str) {
        self.existing.remove(old);
    }

    fn is_free(&self, name: &str) -> bool {
        !self.existing.contains(name) && !self.assigned.contains(name)
    }
}
