//! Removal of old day folders
//!
//! A sweep runs once per session, on a background thread, a short delay
//! after startup. Each folder is handled on its own: a failure is recorded
//! and the sweep moves on.

use chrono::{Duration as Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::BackupConfig;

/// Delay between startup and the sweep
pub const DEFAULT_SWEEP_DELAY: Duration = Duration::from_secs(10);

/// Outcome of a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// Day folders removed
    pub deleted: Vec<PathBuf>,
    /// Folders that could not be removed, with the reason
    pub errors: Vec<String>,
    /// Backups dated before this day are considered old
    pub cutoff: Option<NaiveDate>,
}

impl RetentionReport {
    /// Number of day folders removed
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    fn log_summary(&self) {
        if let (false, Some(cutoff)) = (self.deleted.is_empty(), self.cutoff) {
            info!(
                "AutoBackups: Deleted {} backup folders older than {}",
                self.deleted.len(),
                cutoff.format("%Y-%m-%d")
            );
        }
        for error in &self.errors {
            warn!("AutoBackups: {error}");
        }
    }
}

/// Whether a day folder dated `date` is past retention at `now`
///
/// One extra day of grace is added, so a folder is never removed on the
/// calendar boundary it was created on.
#[must_use]
pub fn is_expired(date: NaiveDate, retention_days: u32, now: NaiveDateTime) -> bool {
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        return false;
    };
    now.signed_duration_since(midnight) > Days::days(i64::from(retention_days) + 1)
}

/// Delete the day folders under `root` older than `retention_days`
///
/// `retention_days == 0` disables retention.
#[must_use]
pub fn sweep(root: &Path, retention_days: u32, now: NaiveDateTime) -> RetentionReport {
    let mut report = RetentionReport::default();
    if retention_days == 0 {
        return report;
    }
    report.cutoff = now
        .date()
        .checked_sub_signed(Days::days(i64::from(retention_days)));

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return report,
        Err(e) => {
            report.errors.push(format!("{}: {e}", root.display()));
            return report;
        }
    };

    let mut folders: Vec<(NaiveDate, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let date = parse_day_folder(&name)?;
            Some((date, entry.path()))
        })
        .collect();
    folders.sort();

    for (date, path) in folders {
        if !is_expired(date, retention_days, now) {
            continue;
        }
        match remove_folder(&path) {
            Ok(()) => {
                debug!("Deleted old backup folder {}", path.display());
                report.deleted.push(path);
            }
            Err(e) => report.errors.push(format!("{}: {e}", path.display())),
        }
    }

    report
}

/// Parse a strictly `YYYY-MM-DD` folder name
fn parse_day_folder(name: &str) -> Option<NaiveDate> {
    let well_formed = name.len() == 10
        && name
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

/// Remove a folder tree, retrying once after clearing read-only flags
fn remove_folder(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            clear_readonly(path);
            fs::remove_dir_all(path)
        }
        other => other,
    }
}

/// Give the owner write access to everything under `path`
fn clear_readonly(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if let Some(permissions) = owner_writable(metadata.permissions(), metadata.is_dir()) {
            if let Err(e) = fs::set_permissions(entry.path(), permissions) {
                debug!("Cannot clear read-only flag on {}: {e}", entry.path().display());
            }
        }
    }
}

/// Permissions granting the owner write access, or `None` if already granted
///
/// Directories also need owner read and search to be emptied. Group and
/// other bits are left alone.
#[cfg(unix)]
fn owner_writable(permissions: fs::Permissions, is_dir: bool) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = permissions.mode();
    let wanted = if is_dir { mode | 0o700 } else { mode | 0o200 };
    (wanted != mode).then(|| fs::Permissions::from_mode(wanted))
}

#[cfg(not(unix))]
fn owner_writable(mut permissions: fs::Permissions, _is_dir: bool) -> Option<fs::Permissions> {
    if !permissions.readonly() {
        return None;
    }
    permissions.set_readonly(false);
    Some(permissions)
}

/// A retention sweep scheduled on its own thread
///
/// The sweep can be cancelled until it starts; dropping the task cancels it
/// too.
pub struct RetentionTask {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<Option<RetentionReport>>>,
}

impl RetentionTask {
    /// Sweep `config.backup_root` once, after `delay`
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned
    pub fn schedule(config: Arc<BackupConfig>, delay: Duration) -> io::Result<Self> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("autobackups-retention".to_string())
            .spawn(move || {
                match cancelled.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("Retention sweep cancelled");
                        return None;
                    }
                }
                let now = chrono::Local::now().naive_local();
                let report = sweep(&config.backup_root, config.retention_days, now);
                report.log_summary();
                Some(report)
            })?;

        Ok(Self {
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    /// Whether the sweep thread has finished (run or cancelled)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the sweep; `None` if it was cancelled
    pub fn join(mut self) -> Option<RetentionReport> {
        let handle = self.handle.take()?;
        handle.join().ok().flatten()
    }

    /// Cancel the sweep if it has not started, then wait for the thread
    pub fn cancel(mut self) -> Option<RetentionReport> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        let handle = self.handle.take()?;
        handle.join().ok().flatten()
    }
}

impl Drop for RetentionTask {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
