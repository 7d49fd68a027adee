//! Backup creation on save and open events

use chrono::NaiveDateTime;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use super::fingerprint::{fingerprint, FingerprintCache};
use super::types::{BackupEvent, Document, Outcome, SessionKey};
use crate::config::BackupConfig;
use crate::paths::PathResolver;

/// Errors during a backup attempt
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Max allowed size from config not available")]
    ConfigurationMissing,

    #[error("Source file not available: {0}")]
    SourceUnavailable(PathBuf),

    #[error("Permission denied: {0}")]
    FilesystemPermission(PathBuf),

    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == ErrorKind::PermissionDenied {
            Self::FilesystemPermission(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Decides whether a document needs a backup and writes it
///
/// Owns the per-buffer fingerprints; it is driven from the single editor
/// event thread and needs no locking.
#[derive(Debug, Default)]
pub struct BackupWriter {
    fingerprints: FingerprintCache,
}

impl BackupWriter {
    /// Create a writer with an empty fingerprint cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer remembering at most `capacity` buffers
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fingerprints: FingerprintCache::with_capacity(capacity),
        }
    }

    /// Back up `doc` if needed
    ///
    /// Checks run in a fixed order and the first one that applies decides
    /// the outcome. Nothing touches the filesystem before the target
    /// existence check of open events.
    ///
    /// # Errors
    /// Returns an error if the size limit is not configured, the source
    /// disappeared, or the backup could not be written
    pub fn maybe_backup(
        &mut self,
        config: &BackupConfig,
        doc: &Document,
        event: BackupEvent,
        now: NaiveDateTime,
    ) -> Result<Outcome, BackupError> {
        let Some(source) = doc.file_name.as_deref() else {
            return Ok(Outcome::SkippedNoFilename);
        };

        if doc.read_only {
            return Ok(Outcome::SkippedReadOnly);
        }

        let max_size = config.max_size_bytes.ok_or(BackupError::ConfigurationMissing)?;
        if doc.size > max_size {
            debug!(
                "Backup not saved, file too large ({} bytes): {}",
                doc.size,
                source.display()
            );
            return Ok(Outcome::SkippedTooLarge);
        }

        if config.is_excluded(&source.to_string_lossy()) {
            debug!("{} is excluded", source.display());
            return Ok(Outcome::SkippedExcluded);
        }

        let resolver = PathResolver::new(config);
        if resolver.is_backup_file(source) {
            return Ok(Outcome::SkippedBackupFile);
        }

        let target = resolver.full_backup_path(source, now);

        let current = fingerprint(source, &doc.content);
        if self.fingerprints.is_unchanged(doc.session_key, &current) {
            return Ok(Outcome::SkippedNoChange);
        }

        if event.is_open() && target.exists() {
            return Ok(Outcome::SkippedExists);
        }

        if !copy_into_place(source, &target, event.is_open())? {
            return Ok(Outcome::SkippedExists);
        }

        self.fingerprints.insert(doc.session_key, current);
        info!("Backup saved to: {}", target.display());
        Ok(Outcome::Saved(target))
    }

    /// Forget the fingerprint of a closed document
    pub fn forget(&mut self, key: SessionKey) {
        self.fingerprints.remove(key);
    }

    /// Forget every fingerprint
    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }

    /// Fingerprints currently remembered
    #[must_use]
    pub fn fingerprints(&self) -> &FingerprintCache {
        &self.fingerprints
    }
}

/// Copy `source` to `target` through a temporary file in the target directory
///
/// Returns `false` when `no_clobber` is set and the target appeared in the
/// meantime. No partial file is left behind on failure.
fn copy_into_place(source: &Path, target: &Path, no_clobber: bool) -> Result<bool, BackupError> {
    let dir = target
        .parent()
        .ok_or_else(|| BackupError::io(target, io::Error::from(ErrorKind::InvalidInput)))?;
    fs::create_dir_all(dir).map_err(|e| BackupError::io(dir, e))?;

    let mut input = match fs::File::open(source) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(BackupError::SourceUnavailable(source.to_path_buf()));
        }
        Err(e) => return Err(BackupError::io(source, e)),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BackupError::io(dir, e))?;
    io::copy(&mut input, &mut tmp).map_err(|e| BackupError::io(source, e))?;

    let persisted = if no_clobber {
        tmp.persist_noclobber(target)
    } else {
        tmp.persist(target)
    };

    match persisted {
        Ok(_) => Ok(true),
        Err(e) if no_clobber && e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(BackupError::io(target, e.error)),
    }
}
