//! Enumeration of existing backups of a source file
//!
//! Listings are ordered newest first. Day and time segments are fixed-width
//! and zero-padded, so sorting labels lexicographically and reversing gives
//! descending chronological order.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use crate::config::{BackupConfig, Layout};
use crate::paths::{file_name, format_time, split_name, PathResolver};

static DAY_FOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid day regex"));

static TIME_FOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("valid time regex"));

/// A single backup copy of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// `<date> - <name>` or `<HH:MM:SS> - <name>`
    pub label: String,
    /// Path relative to the backup root
    pub relative: PathBuf,
    /// Absolute path of the backup
    pub path: PathBuf,
}

/// Per-day summary for the time layouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Number of backups that day
    pub count: usize,
    /// Greatest `HHMMSS` segment that day
    pub last_time: String,
}

impl DaySummary {
    /// `Backups: <n>, Last edit: <HH:MM:SS>`
    #[must_use]
    pub fn detail(&self) -> String {
        format!(
            "Backups: {}, Last edit: {}",
            self.count,
            format_time(&self.last_time)
        )
    }
}

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListEntry {
    Backup(BackupEntry),
    Day(DaySummary),
}

impl ListEntry {
    /// Label shown in the picker
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Backup(entry) => &entry.label,
            Self::Day(day) => &day.date,
        }
    }

    /// Second line shown in the picker
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Backup(entry) => Some(entry.path.display().to_string()),
            Self::Day(day) => Some(day.detail()),
        }
    }

    /// Backup file behind the row, for backup rows
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Backup(entry) => Some(&entry.path),
            Self::Day(_) => None,
        }
    }
}

/// Result of an enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Rows, newest first
    pub entries: Vec<ListEntry>,
    /// Folder that should have existed but did not (user-facing notice)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<PathBuf>,
}

impl Listing {
    fn sorted(mut entries: Vec<ListEntry>) -> Self {
        entries.sort_by(|a, b| a.label().cmp(b.label()));
        entries.reverse();
        Self {
            entries,
            missing: None,
        }
    }

    fn missing(folder: PathBuf) -> Self {
        Self {
            entries: Vec::new(),
            missing: Some(folder),
        }
    }

    /// Whether there is nothing to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finds backups of a source file in the backup tree
pub struct BackupLocator<'a> {
    config: &'a BackupConfig,
    resolver: PathResolver<'a>,
}

impl<'a> BackupLocator<'a> {
    /// Create a locator over a configuration
    #[must_use]
    pub fn new(config: &'a BackupConfig) -> Self {
        Self {
            config,
            resolver: PathResolver::new(config),
        }
    }

    /// First-level listing for `source`
    ///
    /// Backup rows for the flat and per-day layouts, day summaries for the
    /// time layouts.
    #[must_use]
    pub fn list_backups(&self, source: &Path) -> Listing {
        match self.config.layout {
            Layout::Flat | Layout::PerDay => self.list_per_day(source),
            Layout::PerDayTimeFolder => self.list_days_by_folder(source),
            Layout::PerDayTimeFile => self.list_days_by_name(source),
        }
    }

    /// Second-level listing: backups of `source` taken on `day`
    #[must_use]
    pub fn list_day(&self, source: &Path, day: &str) -> Listing {
        match self.config.layout {
            Layout::Flat | Layout::PerDay => {
                let mut listing = self.list_per_day(source);
                listing.entries.retain(|entry| entry.label().starts_with(day));
                listing
            }
            Layout::PerDayTimeFolder => self.list_time_folders(source, day),
            Layout::PerDayTimeFile => self.list_time_names(source, day),
        }
    }

    /// Newest backup of `source`, if there is one
    #[must_use]
    pub fn latest(&self, source: &Path, now: NaiveDateTime) -> Option<PathBuf> {
        if self.config.layout == Layout::Flat {
            let path = self.resolver.full_backup_path(source, now);
            if path.is_file() {
                return Some(path);
            }
        }

        let listing = self.list_backups(source);
        match listing.entries.first()? {
            ListEntry::Backup(entry) => Some(entry.path.clone()),
            ListEntry::Day(day) => self
                .list_day(source, &day.date)
                .entries
                .first()
                .and_then(ListEntry::path)
                .map(Path::to_path_buf),
        }
    }

    /// Path of a backup relative to a day or time folder
    fn relative(&self, source: &Path) -> PathBuf {
        self.resolver.relative_untimed(source)
    }

    /// Name pattern of `_HHMMSS` backups of `source`
    fn name_pattern(&self, source: &Path) -> Option<Regex> {
        let name = file_name(source);
        let (stem, ext) = split_name(&name);
        let (stem, ext) = self.resolver.decorate(stem, ext);
        let pattern = format!(
            "^{}_([0-9]{{6}}){}$",
            regex::escape(&stem),
            regex::escape(&ext)
        );
        Regex::new(&pattern)
            .map_err(|e| warn!("Cannot build backup name pattern for {name}: {e}"))
            .ok()
    }

    fn list_per_day(&self, source: &Path) -> Listing {
        let root = self.resolver.root();
        let relative = self.relative(source);
        let name = file_name(source);

        let entries = child_names(root, &DAY_FOLDER)
            .into_iter()
            .filter_map(|day| {
                let path = root.join(&day).join(&relative);
                path.is_file().then(|| {
                    ListEntry::Backup(BackupEntry {
                        label: format!("{day} - {name}"),
                        relative: Path::new(&day).join(&relative),
                        path,
                    })
                })
            })
            .collect();

        Listing::sorted(entries)
    }

    fn list_days_by_folder(&self, source: &Path) -> Listing {
        let root = self.resolver.root();
        let relative = self.relative(source);

        let entries = child_names(root, &DAY_FOLDER)
            .into_iter()
            .filter_map(|day| {
                let day_dir = root.join(&day);
                let times: Vec<String> = child_names(&day_dir, &TIME_FOLDER)
                    .into_iter()
                    .filter(|time| day_dir.join(time).join(&relative).is_file())
                    .collect();
                summarize(day, times)
            })
            .collect();

        Listing::sorted(entries)
    }

    fn list_days_by_name(&self, source: &Path) -> Listing {
        let root = self.resolver.root();
        let Some(pattern) = self.name_pattern(source) else {
            return Listing::default();
        };
        let dir = self.resolver.relative_dir(source);

        let entries = child_names(root, &DAY_FOLDER)
            .into_iter()
            .filter_map(|day| {
                let times = time_stamped_files(&root.join(&day).join(&dir), &pattern)
                    .into_iter()
                    .map(|(time, _)| time)
                    .collect();
                summarize(day, times)
            })
            .collect();

        Listing::sorted(entries)
    }

    fn list_time_folders(&self, source: &Path, day: &str) -> Listing {
        let day_dir = self.resolver.root().join(day);
        if !day_dir.is_dir() {
            return Listing::missing(day_dir);
        }

        let relative = self.relative(source);
        let name = file_name(source);
        let entries = child_names(&day_dir, &TIME_FOLDER)
            .into_iter()
            .filter_map(|time| {
                let path = day_dir.join(&time).join(&relative);
                path.is_file().then(|| {
                    ListEntry::Backup(BackupEntry {
                        label: format!("{} - {name}", format_time(&time)),
                        relative: Path::new(day).join(&time).join(&relative),
                        path,
                    })
                })
            })
            .collect();

        Listing::sorted(entries)
    }

    fn list_time_names(&self, source: &Path, day: &str) -> Listing {
        let dir = self.resolver.relative_dir(source);
        let folder = self.resolver.root().join(day).join(&dir);
        if !folder.is_dir() {
            return Listing::missing(folder);
        }

        let Some(pattern) = self.name_pattern(source) else {
            return Listing::default();
        };
        let name = file_name(source);
        let entries = time_stamped_files(&folder, &pattern)
            .into_iter()
            .map(|(time, file)| {
                ListEntry::Backup(BackupEntry {
                    label: format!("{} - {name}", format_time(&time)),
                    relative: Path::new(day).join(&dir).join(&file),
                    path: folder.join(&file),
                })
            })
            .collect();

        Listing::sorted(entries)
    }
}

/// Day summary row, when the day holds at least one backup
fn summarize(date: String, times: Vec<String>) -> Option<ListEntry> {
    let last_time = times.iter().max()?.clone();
    Some(ListEntry::Day(DaySummary {
        date,
        count: times.len(),
        last_time,
    }))
}

/// Names of the entries of `dir` matching `pattern`
///
/// A missing directory yields nothing; other read errors are logged.
fn child_names(dir: &Path, pattern: &Regex) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Cannot read {}: {e}", dir.display());
            return Vec::new();
        }
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| pattern.is_match(name))
        .collect()
}

/// `(HHMMSS, file name)` of the files in `dir` matching a time-stamped name
fn time_stamped_files(dir: &Path, pattern: &Regex) -> Vec<(String, String)> {
    child_names(dir, pattern)
        .into_iter()
        .filter(|file| dir.join(file).is_file())
        .filter_map(|file| {
            let time = pattern.captures(&file)?.get(1)?.as_str().to_string();
            Some((time, file))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingMode;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_summary_detail() {
        let day = DaySummary {
            date: "2024-03-01".into(),
            count: 3,
            last_time: "142205".into(),
        };
        assert_eq!(day.detail(), "Backups: 3, Last edit: 14:22:05");
    }

    #[test]
    fn test_summarize_skips_empty_days() {
        assert!(summarize("2024-01-01".into(), Vec::new()).is_none());
    }

    #[test]
    fn test_child_names_ignores_non_matching() {
        let temp = TempDir::new().unwrap();
        for name in ["2024-01-02", "2024-1-2", "notes", "20240102"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }
        let names = child_names(temp.path(), &DAY_FOLDER);
        assert_eq!(names, vec!["2024-01-02".to_string()]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let config = BackupConfig::new("/nonexistent/autobackups-root", Layout::PerDay);
        let listing = BackupLocator::new(&config).list_backups(Path::new("/a/b.txt"));
        assert!(listing.is_empty());
        assert!(listing.missing.is_none());
    }

    #[test]
    fn test_labels_use_source_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let source = Path::new("/a/b/x.py");

        let config = BackupConfig::new(&root, Layout::PerDay)
            .with_platform(crate::config::Platform::Linux)
            .with_naming_mode(NamingMode::Suffix);
        touch(&root.join("2024-03-01/a/b/x_backup.py"));
        let listing = BackupLocator::new(&config).list_backups(source);
        assert_eq!(listing.entries[0].label(), "2024-03-01 - x.py");

        let config = BackupConfig::new(&root, Layout::PerDayTimeFolder)
            .with_platform(crate::config::Platform::Linux)
            .with_naming_mode(NamingMode::Prefix);
        touch(&root.join("2024-03-02/142205/a/b/backup_x.py"));
        let listing = BackupLocator::new(&config).list_day(source, "2024-03-02");
        assert_eq!(listing.entries[0].label(), "14:22:05 - x.py");
    }

    #[test]
    fn test_time_names_require_exact_match() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let config = BackupConfig::new(&root, Layout::PerDayTimeFile)
            .with_platform(crate::config::Platform::Linux);
        let dir = root.join("2024-03-01").join("a/b");
        touch(&dir.join("x_142205.py"));
        touch(&dir.join("x_1422.py"));
        touch(&dir.join("xx_142205.py"));
        touch(&dir.join("x_142205.py.orig"));

        let listing = BackupLocator::new(&config).list_day(Path::new("/a/b/x.py"), "2024-03-01");
        let labels: Vec<&str> = listing.entries.iter().map(ListEntry::label).collect();
        assert_eq!(labels, vec!["14:22:05 - x.py"]);
    }
}
