//! Backup path resolution
//!
//! Path computation is a pure function of the configuration and the instant
//! passed in. The same `(source, now)` always yields the same backup path.
//! Only the backup-file check looks at the filesystem.

use chrono::NaiveDateTime;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::{BackupConfig, NamingMode, Platform};

/// Marker inserted before the base name in `prefix` naming mode
pub const PREFIX_MARKER: &str = "backup_";

/// Marker inserted before the extension in `suffix` naming mode
pub const SUFFIX_MARKER: &str = "_backup";

static DRIVE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w):").expect("valid drive letter regex"));

static UNC_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\\\([\w\-]{2,})").expect("valid UNC regex"));

/// Computes backup locations for source files
pub struct PathResolver<'a> {
    config: &'a BackupConfig,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over a configuration
    #[must_use]
    pub fn new(config: &'a BackupConfig) -> Self {
        Self { config }
    }

    /// Bare backup root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.backup_root
    }

    /// Root backup directory
    ///
    /// With `only_base` the bare root is returned; otherwise the day folder
    /// (and the time folder, for the time-folder layout) for `now` is appended.
    #[must_use]
    pub fn base_dir(&self, only_base: bool, now: NaiveDateTime) -> PathBuf {
        let mut dir = self.config.backup_root.clone();
        if only_base {
            return dir;
        }

        let layout = self.config.layout;
        if layout.is_per_day() {
            dir.push(date_segment(now));
        }
        if layout.has_time_folder() {
            dir.push(time_segment(now));
        }
        dir
    }

    /// Backup file name for `source_filename` at `now`
    ///
    /// Prefix marker, then the `_HHMMSS` time segment, then the suffix marker,
    /// all before the extension.
    #[must_use]
    pub fn backup_filename(&self, source_filename: &str, now: NaiveDateTime) -> String {
        let time = self
            .config
            .layout
            .has_time_in_name()
            .then(|| time_segment(now));
        self.backup_name(source_filename, time.as_deref())
    }

    /// Backup file name with an explicit time segment, or none
    #[must_use]
    pub fn backup_name(&self, source_filename: &str, time: Option<&str>) -> String {
        let (stem, ext) = split_name(source_filename);
        let (stem, ext) = self.decorate(stem, ext);
        match time {
            Some(time) => format!("{stem}_{time}{ext}"),
            None => format!("{stem}{ext}"),
        }
    }

    /// Stem and extension with the naming-mode markers applied
    ///
    /// The suffix marker is put at the front of the returned extension, so a
    /// time segment placed between the two parts lands before it.
    #[must_use]
    pub fn decorate(&self, stem: &str, ext: &str) -> (String, String) {
        match self.config.naming_mode {
            NamingMode::None => (stem.to_string(), ext.to_string()),
            NamingMode::Prefix => (format!("{PREFIX_MARKER}{stem}"), ext.to_string()),
            NamingMode::Suffix => (stem.to_string(), format!("{SUFFIX_MARKER}{ext}")),
        }
    }

    /// Normalise a source path for use under the backup root
    #[must_use]
    pub fn normalise(&self, path: Option<&str>, use_forward_slashes: bool) -> String {
        normalise_source_path(path, self.config.platform, use_forward_slashes)
    }

    /// Normalised directory of `source`, relative to a backup base directory
    #[must_use]
    pub fn relative_dir(&self, source: &Path) -> String {
        let dir = source.parent().map(|p| p.to_string_lossy().into_owned());
        self.normalise(dir.as_deref(), false)
    }

    /// Path of the backup of `source` at `now`, relative to the day (or time) folder
    #[must_use]
    pub fn relative_backup_path(&self, source: &Path, now: NaiveDateTime) -> PathBuf {
        self.relative_dir_path(source)
            .join(self.backup_filename(&file_name(source), now))
    }

    /// Relative backup path without a time segment in the file name
    #[must_use]
    pub fn relative_untimed(&self, source: &Path) -> PathBuf {
        self.relative_dir_path(source)
            .join(self.backup_name(&file_name(source), None))
    }

    fn relative_dir_path(&self, source: &Path) -> PathBuf {
        let dir = self.relative_dir(source);
        if dir.is_empty() {
            PathBuf::new()
        } else {
            PathBuf::from(dir)
        }
    }

    /// Absolute path of the backup of `source` taken at `now`
    #[must_use]
    pub fn full_backup_path(&self, source: &Path, now: NaiveDateTime) -> PathBuf {
        self.base_dir(false, now)
            .join(self.relative_backup_path(source, now))
    }

    /// Whether `source` already lives inside the backup tree
    ///
    /// When the root exists on disk, symlinks on either path are resolved
    /// before comparing.
    #[must_use]
    pub fn is_backup_file(&self, source: &Path) -> bool {
        let root = &self.config.backup_root;
        if root.as_os_str().is_empty() {
            return false;
        }
        if source.starts_with(root) {
            return true;
        }
        let Ok(real_root) = fs::canonicalize(root) else {
            return false;
        };
        source.starts_with(&real_root)
            || fs::canonicalize(source).is_ok_and(|real| real.starts_with(&real_root))
    }
}

/// Normalise a source path so it can be joined under the backup root
///
/// On Windows, `C:` becomes `C` and `\\host\share` becomes
/// `network\host\share`; backslashes are turned into forward slashes when
/// requested. Elsewhere leading separators are stripped so the result is
/// relative. An absent path yields an empty string.
#[must_use]
pub fn normalise_source_path(
    path: Option<&str>,
    platform: Platform,
    use_forward_slashes: bool,
) -> String {
    let Some(path) = path else {
        return String::new();
    };

    if platform != Platform::Windows {
        return path.trim_start_matches('/').to_string();
    }

    let path = path.replace('/', "\\");
    let path = DRIVE_LETTER.replace(&path, "$1");
    let path = UNC_HOST.replace(&path, r"network\$1").into_owned();

    if use_forward_slashes {
        path.replace('\\', "/")
    } else {
        path
    }
}

/// Split a file name into stem and extension (with its dot)
///
/// Leading dots belong to the stem, so `.bashrc` has no extension.
#[must_use]
pub fn split_name(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

/// Final component of a path as a string
#[must_use]
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `YYYY-MM-DD` day folder name
#[must_use]
pub fn date_segment(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// `HHMMSS` time folder name or file name segment
#[must_use]
pub fn time_segment(now: NaiveDateTime) -> String {
    now.format("%H%M%S").to_string()
}

/// Render an `HHMMSS` segment as `HH:MM:SS`
#[must_use]
pub fn format_time(segment: &str) -> String {
    match (segment.get(0..2), segment.get(2..4), segment.get(4..6)) {
        (Some(h), Some(m), Some(s)) => format!("{h}:{m}:{s}"),
        _ => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn config(layout: Layout) -> BackupConfig {
        BackupConfig::new("/backups", layout).with_platform(Platform::Linux)
    }

    #[test]
    fn test_base_dir_per_day() {
        let config = config(Layout::PerDay);
        let resolver = PathResolver::new(&config);
        let now = at(2024, 1, 2, 10, 0, 0);
        assert_eq!(resolver.base_dir(false, now), PathBuf::from("/backups/2024-01-02"));
        assert_eq!(resolver.base_dir(true, now), PathBuf::from("/backups"));
    }

    #[test]
    fn test_base_dir_time_folder() {
        let config = config(Layout::PerDayTimeFolder);
        let resolver = PathResolver::new(&config);
        let now = at(2024, 3, 1, 14, 22, 5);
        assert_eq!(
            resolver.base_dir(false, now),
            PathBuf::from("/backups/2024-03-01/142205")
        );
    }

    #[test]
    fn test_base_dir_flat_ignores_date() {
        let config = config(Layout::Flat);
        let resolver = PathResolver::new(&config);
        assert_eq!(
            resolver.base_dir(false, at(2024, 3, 1, 14, 22, 5)),
            PathBuf::from("/backups")
        );
    }

    #[test]
    fn test_full_backup_path_per_day() {
        let config = config(Layout::PerDay);
        let resolver = PathResolver::new(&config);
        let path = resolver.full_backup_path(Path::new("/home/u/doc.txt"), at(2024, 1, 2, 10, 0, 0));
        assert_eq!(path, PathBuf::from("/backups/2024-01-02/home/u/doc.txt"));
    }

    #[test]
    fn test_full_backup_path_time_in_name() {
        let config = config(Layout::PerDayTimeFile);
        let resolver = PathResolver::new(&config);
        let path = resolver.full_backup_path(Path::new("/a/b/x.py"), at(2024, 3, 1, 14, 22, 5));
        assert_eq!(path, PathBuf::from("/backups/2024-03-01/a/b/x_142205.py"));
    }

    #[test]
    fn test_full_backup_path_time_folder() {
        let config = config(Layout::PerDayTimeFolder);
        let resolver = PathResolver::new(&config);
        let path = resolver.full_backup_path(Path::new("/a/b/x.py"), at(2024, 3, 1, 14, 22, 5));
        assert_eq!(path, PathBuf::from("/backups/2024-03-01/142205/a/b/x.py"));
    }

    #[test]
    fn test_filename_marker_order() {
        let now = at(2024, 3, 1, 14, 22, 5);

        let prefix = config(Layout::PerDayTimeFile).with_naming_mode(NamingMode::Prefix);
        assert_eq!(
            PathResolver::new(&prefix).backup_filename("x.py", now),
            "backup_x_142205.py"
        );

        let suffix = config(Layout::PerDayTimeFile).with_naming_mode(NamingMode::Suffix);
        assert_eq!(
            PathResolver::new(&suffix).backup_filename("x.py", now),
            "x_142205_backup.py"
        );

        let plain_suffix = config(Layout::PerDay).with_naming_mode(NamingMode::Suffix);
        assert_eq!(
            PathResolver::new(&plain_suffix).backup_filename("x.py", now),
            "x_backup.py"
        );
    }

    #[test]
    fn test_filename_without_extension() {
        let now = at(2024, 3, 1, 14, 22, 5);
        let config = config(Layout::PerDayTimeFile);
        let resolver = PathResolver::new(&config);
        assert_eq!(resolver.backup_filename("Makefile", now), "Makefile_142205");
        assert_eq!(resolver.backup_filename(".bashrc", now), ".bashrc_142205");
        assert_eq!(resolver.backup_filename("a.tar.gz", now), "a.tar_142205.gz");
    }

    #[test]
    fn test_filename_independent_of_time_without_per_day() {
        for mode in [NamingMode::None, NamingMode::Prefix, NamingMode::Suffix] {
            let config = config(Layout::Flat).with_naming_mode(mode);
            let resolver = PathResolver::new(&config);
            assert_eq!(
                resolver.backup_filename("notes.md", at(2024, 1, 1, 0, 0, 0)),
                resolver.backup_filename("notes.md", at(2025, 6, 30, 23, 59, 59))
            );
        }
    }

    #[test]
    fn test_time_in_name_differs_per_second() {
        let config = config(Layout::PerDayTimeFile);
        let resolver = PathResolver::new(&config);
        let first = resolver.backup_filename("name.ext", at(2024, 3, 1, 14, 22, 5));
        let second = resolver.backup_filename("name.ext", at(2024, 3, 1, 14, 22, 6));
        assert_ne!(first, second);
        for name in [&first, &second] {
            let stem = name.find("name").unwrap();
            let ext = name.rfind(".ext").unwrap();
            assert!(stem < ext);
        }
    }

    #[test]
    fn test_normalise_unix_strips_leading_separator() {
        assert_eq!(
            normalise_source_path(Some("/home/u"), Platform::Linux, false),
            "home/u"
        );
        assert_eq!(normalise_source_path(Some("//srv/x"), Platform::Osx, true), "srv/x");
        assert_eq!(normalise_source_path(None, Platform::Linux, false), "");
    }

    #[test]
    fn test_normalise_unix_idempotent() {
        for path in ["/home/u/doc", "relative/dir", "///many", "", "/"] {
            let once = normalise_source_path(Some(path), Platform::Linux, false);
            let twice = normalise_source_path(Some(&once), Platform::Linux, false);
            assert_eq!(once, twice, "not idempotent for {path:?}");
        }
    }

    #[test]
    fn test_normalise_windows_drive_letter() {
        assert_eq!(
            normalise_source_path(Some(r"C:\Users\me\project"), Platform::Windows, false),
            r"C\Users\me\project"
        );
        assert_eq!(
            normalise_source_path(Some("D:/work/site"), Platform::Windows, true),
            "D/work/site"
        );
    }

    #[test]
    fn test_normalise_windows_unc_share() {
        assert_eq!(
            normalise_source_path(Some(r"\\fileserver\share\docs"), Platform::Windows, false),
            r"network\fileserver\share\docs"
        );
        assert_eq!(
            normalise_source_path(Some(r"\\nas-01\media"), Platform::Windows, true),
            "network/nas-01/media"
        );
    }

    #[test]
    fn test_is_backup_file() {
        let config = config(Layout::PerDayTimeFolder);
        let resolver = PathResolver::new(&config);
        assert!(resolver.is_backup_file(Path::new("/backups/2024-01-02/120000/home/u/a.txt")));
        assert!(!resolver.is_backup_file(Path::new("/backups-old/a.txt")));
        assert!(!resolver.is_backup_file(Path::new("/home/u/a.txt")));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time("142205"), "14:22:05");
        assert_eq!(format_time("14"), "14");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("x.py"), ("x", ".py"));
        assert_eq!(split_name("noext"), ("noext", ""));
        assert_eq!(split_name("..hidden.txt"), ("..hidden", ".txt"));
    }
}
