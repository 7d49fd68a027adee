//! Documents, events and outcomes of the backup writer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable identifier of an open editor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(pub u64);

/// Snapshot of an editor document at event time
#[derive(Debug, Clone)]
pub struct Document {
    /// Buffer the document lives in
    pub session_key: SessionKey,
    /// Filesystem path; `None` for unsaved buffers
    pub file_name: Option<PathBuf>,
    /// Marked read-only in the editor
    pub read_only: bool,
    /// Size in bytes
    pub size: u64,
    /// Content at event time
    pub content: Vec<u8>,
    /// 1-based line the cursor is on
    pub line: usize,
}

impl Document {
    /// Create a document snapshot for a file with the given content
    #[must_use]
    pub fn new(session_key: SessionKey, file_name: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        Self {
            session_key,
            file_name: Some(file_name.into()),
            read_only: false,
            size: content.len() as u64,
            content,
            line: 1,
        }
    }

    /// Create a snapshot of a buffer that was never saved
    #[must_use]
    pub fn unsaved(session_key: SessionKey, content: Vec<u8>) -> Self {
        Self {
            session_key,
            file_name: None,
            read_only: false,
            size: content.len() as u64,
            content,
            line: 1,
        }
    }

    /// Mark the document read-only
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set the cursor line
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// What triggered a backup attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupEvent {
    /// The file was written by the editor
    Save,
    /// The file was opened in the editor
    Open,
}

impl BackupEvent {
    /// Whether this is an open event
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Result of a backup attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum Outcome {
    /// Backup written to the path
    Saved(PathBuf),
    /// Document has no filesystem path
    SkippedNoFilename,
    /// Document is read-only
    SkippedReadOnly,
    /// Document is above the size limit
    SkippedTooLarge,
    /// Path matches an ignore pattern
    SkippedExcluded,
    /// Document is itself a backup
    SkippedBackupFile,
    /// Content unchanged since the last backup of this buffer
    SkippedNoChange,
    /// Backup already exists and the event was an open
    SkippedExists,
}

impl Outcome {
    /// Path of the written backup, if any
    #[must_use]
    pub fn saved_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Saved(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved(path) => write!(f, "Backup saved to: {}", path.display()),
            Self::SkippedNoFilename => write!(f, "Skipped: file has no name"),
            Self::SkippedReadOnly => write!(f, "Skipped: file is read-only"),
            Self::SkippedTooLarge => write!(f, "Skipped: file too large"),
            Self::SkippedExcluded => write!(f, "Skipped: file matches an ignore pattern"),
            Self::SkippedBackupFile => write!(f, "Skipped: file is a backup"),
            Self::SkippedNoChange => write!(f, "Skipped: no changes since last backup"),
            Self::SkippedExists => write!(f, "Skipped: backup already exists"),
        }
    }
}
