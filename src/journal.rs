//! Append-only message journal.
//!
//! Every processed message can be recorded as a human-readable entry:
//!
//! ```text
//! 2026-10-19 14:03:11 | dana | Gentle & Kind | shielded=1
//! you are 🛡️ => I want to share this gently: You are 🛡️.
//! ```
//!
//! The journal is write-only from the library's point of view.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tone label recorded for shield-only entries.
pub const SHIELD_TONE: &str = "SHIELD";

/// One journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the message was processed.
    pub timestamp: DateTime<Utc>,
    /// Who sent or received the message.
    pub user: String,
    /// Tone name, or [`SHIELD_TONE`] for shield-only entries.
    pub tone: String,
    /// Text as submitted.
    pub original: String,
    /// Text as returned.
    pub result: String,
    /// Number of shielded matches.
    pub shielded_count: usize,
}

impl JournalEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        user: impl Into<String>,
        tone: impl Into<String>,
        original: impl Into<String>,
        result: impl Into<String>,
        shielded_count: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user: user.into(),
            tone: tone.into(),
            original: original.into(),
            result: result.into(),
            shielded_count,
        }
    }
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | shielded={}\n{} => {}\n\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.user,
            self.tone,
            self.shielded_count,
            self.original,
            self.result
        )
    }
}

/// Sink for journal entries.
pub trait MessageJournal: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: &JournalEntry) -> Result<()>;

    /// Build and append an entry stamped with the current time.
    fn record(
        &self,
        user: &str,
        tone: &str,
        original: &str,
        result: &str,
        shielded_count: usize,
    ) -> Result<()> {
        self.append(&JournalEntry::new(
            user,
            tone,
            original,
            result,
            shielded_count,
        ))
    }
}

/// Journal appending to a text file.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileJournal {
    /// Journal writing to `path`. The file and its parent directories are
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// The journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Journal(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Journal(format!("cannot open {}: {}", self.path.display(), e)))
    }
}

impl MessageJournal for FileJournal {
    fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(entry.to_string().as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| {
                    Error::Journal(format!("cannot write {}: {}", self.path.display(), e))
                })?;
        }
        tracing::debug!(
            path = %self.path.display(),
            user = %entry.user,
            tone = %entry.tone,
            "Journal entry written"
        );
        Ok(())
    }
}

/// In-memory journal.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl MemoryJournal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.read().clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl MessageJournal for MemoryJournal {
    fn append(&self, entry: &JournalEntry) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }
}
