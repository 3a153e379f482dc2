//! Plain-text work queue.
//!
//! One transcript path or content id per line. Completed items are removed
//! one matching line at a time; blank lines and unrelated entries are left
//! exactly as they were.

use crate::error::{Result, SkriveError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of removing an entry from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Whether a matching line was found and removed.
    pub removed: bool,
    /// Non-empty entries left in the queue.
    pub remaining: usize,
}

/// A work queue backed by a text file.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    path: PathBuf,
}

impl WorkQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(SkriveError::Queue(format!(
                "Queue file not found: {}",
                self.path.display()
            )));
        }
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// Non-empty entries in file order.
    pub fn entries(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = self.read()?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append an entry, creating the file if needed.
    pub fn append(&self, entry: &str) -> Result<()> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(SkriveError::InvalidInput("Queue entry is empty".to_string()));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut content = if self.path.exists() {
            std::fs::read_to_string(&self.path)?
        } else {
            String::new()
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(entry);
        content.push('\n');

        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Remove the first line whose trimmed text equals `entry`.
    pub fn remove(&self, entry: &str) -> Result<Removal> {
        let entry = entry.trim();
        let content = self.read()?;

        let mut removed = false;
        let mut kept = String::with_capacity(content.len());
        for line in content.split_inclusive('\n') {
            if !removed && !entry.is_empty() && line.trim() == entry {
                removed = true;
                continue;
            }
            kept.push_str(line);
        }

        if removed {
            std::fs::write(&self.path, &kept)?;
        }

        let remaining = kept.lines().filter(|l| !l.trim().is_empty()).count();
        debug!(entry, removed, remaining, "Queue removal");

        Ok(Removal { removed, remaining })
    }
}
