//! Settings file model and the resolved backup configuration
//!
//! [`Settings`] mirrors the keys of the `AutoBackups (<Platform>).sublime-settings`
//! file. [`BackupConfig`] is the immutable value the rest of the crate works
//! with: defaults applied, `~` expanded, regexes compiled, layout resolved.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};
use super::layout::{Layout, NamingMode, PerTime, Platform};

/// Default size limit for backed up files (256 KB)
pub const DEFAULT_MAX_BACKUP_FILE_SIZE: u64 = 256 * 1024;

/// Raw settings, keyed the way the settings file spells them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backup root; platform default when empty
    pub backup_dir: String,
    /// Group backups in `YYYY-MM-DD` folders
    pub backup_per_day: bool,
    /// `false`, `"folder"` or `"file"`
    pub backup_per_time: PerTime,
    /// `false`, `"prefix"` or `"suffix"`
    pub backup_name_mode: NamingMode,
    /// Files above this size are never backed up
    pub max_backup_file_size_bytes: Option<u64>,
    /// Source paths matching any of these are never backed up
    #[serde(deserialize_with = "deserialize_patterns")]
    pub ignore_regexes: Vec<String>,
    /// Age in days after which day folders are purged; 0 disables
    pub delete_old_backups: u32,
    /// Also back up files when they are opened
    pub backup_on_open_file: bool,
    /// Open backups at the line the cursor is on
    pub open_in_same_line: bool,
    /// Preview backups while moving through the picker
    pub show_previews: bool,
    /// Browser used by the donate command
    pub default_browser: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_dir: String::new(),
            backup_per_day: true,
            backup_per_time: PerTime::None,
            backup_name_mode: NamingMode::None,
            max_backup_file_size_bytes: Some(DEFAULT_MAX_BACKUP_FILE_SIZE),
            ignore_regexes: Vec::new(),
            delete_old_backups: 0,
            backup_on_open_file: false,
            open_in_same_line: true,
            show_previews: true,
            default_browser: String::new(),
        }
    }
}

/// `ignore_regexes` may be a list, an empty string or null
fn deserialize_patterns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Patterns {
        List(Vec<String>),
        Single(String),
    }

    Ok(match Option::<Patterns>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Patterns::List(list)) => list,
        Some(Patterns::Single(single)) if single.is_empty() => Vec::new(),
        Some(Patterns::Single(single)) => vec![single],
    })
}

impl Settings {
    /// Parse settings from the text of a settings file
    ///
    /// `//` and `/* */` comments and trailing commas are allowed, as in editor
    /// settings files.
    ///
    /// # Errors
    /// Returns an error if the text is not a valid settings object
    pub fn parse(text: &str, path: &Path) -> ConfigResult<Self> {
        let json = relax_json(text);
        serde_json::from_str(&json).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load settings from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    /// Load settings from a file, falling back to defaults if it is absent
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Turn editor-style settings text into strict JSON
///
/// Comments and commas before a closing `}` or `]` are blanked out; string
/// literals are left untouched. Newlines survive so parse errors still point
/// at the right line.
fn relax_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    // Offset in `out` of the last comma not yet followed by a value
    let mut pending_comma: Option<usize> = None;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ',' => {
                pending_comma = Some(out.len());
                out.push(c);
            }
            '}' | ']' => {
                if let Some(idx) = pending_comma.take() {
                    out.replace_range(idx..=idx, " ");
                }
                out.push(c);
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                pending_comma = None;
                in_string = c == '"';
                out.push(c);
            }
        }
    }
    out
}

/// Immutable configuration shared by every component
///
/// Reloading means building a new value and swapping the reference held by
/// the plugin; nothing mutates a `BackupConfig` in place.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Root of the backup tree, `~` already expanded
    pub backup_root: PathBuf,
    /// Tree shape
    pub layout: Layout,
    /// File name decoration
    pub naming_mode: NamingMode,
    /// Size limit; `None` means the setting is missing
    pub max_size_bytes: Option<u64>,
    /// Compiled exclusion patterns, in settings order
    pub exclude_patterns: Vec<Regex>,
    /// Day folders older than this are purged; 0 disables
    pub retention_days: u32,
    /// Back up on open events too
    pub backup_on_open: bool,
    pub open_in_same_line: bool,
    pub show_previews: bool,
    pub default_browser: String,
    /// Platform used for defaults and path normalisation
    pub platform: Platform,
}

impl BackupConfig {
    /// Configuration with default settings rooted at `backup_root`
    #[must_use]
    pub fn new(backup_root: impl Into<PathBuf>, layout: Layout) -> Self {
        let defaults = Settings::default();
        Self {
            backup_root: backup_root.into(),
            layout,
            naming_mode: NamingMode::None,
            max_size_bytes: defaults.max_backup_file_size_bytes,
            exclude_patterns: Vec::new(),
            retention_days: 0,
            backup_on_open: false,
            open_in_same_line: true,
            show_previews: true,
            default_browser: String::new(),
            platform: Platform::current(),
        }
    }

    /// Resolve raw settings for the given platform
    ///
    /// # Errors
    /// Returns an error if an ignore pattern does not compile
    pub fn from_settings(settings: &Settings, platform: Platform) -> ConfigResult<Self> {
        let root = if settings.backup_dir.trim().is_empty() {
            platform.default_backup_dir()
        } else {
            settings.backup_dir.as_str()
        };

        let exclude_patterns = settings
            .ignore_regexes
            .iter()
            .map(|pattern| compile_exclude(pattern))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            backup_root: expand_home(root),
            layout: Layout::resolve(settings.backup_per_day, settings.backup_per_time),
            naming_mode: settings.backup_name_mode,
            max_size_bytes: settings.max_backup_file_size_bytes,
            exclude_patterns,
            retention_days: settings.delete_old_backups,
            backup_on_open: settings.backup_on_open_file,
            open_in_same_line: settings.open_in_same_line,
            show_previews: settings.show_previews,
            default_browser: settings.default_browser.clone(),
            platform,
        })
    }

    /// Set the file name decoration
    #[must_use]
    pub fn with_naming_mode(mut self, naming_mode: NamingMode) -> Self {
        self.naming_mode = naming_mode;
        self
    }

    /// Set (or clear) the size limit
    #[must_use]
    pub fn with_max_size(mut self, max_size_bytes: Option<u64>) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Add exclusion patterns
    ///
    /// # Errors
    /// Returns an error if a pattern does not compile
    pub fn with_exclude_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> ConfigResult<Self> {
        for pattern in patterns {
            self.exclude_patterns.push(compile_exclude(pattern.as_ref())?);
        }
        Ok(self)
    }

    /// Set the retention period in days
    #[must_use]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Enable or disable backups on open events
    #[must_use]
    pub fn with_backup_on_open(mut self, enabled: bool) -> Self {
        self.backup_on_open = enabled;
        self
    }

    /// Override the platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Whether `source` matches any exclusion pattern
    #[must_use]
    pub fn is_excluded(&self, source: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(source))
    }
}

/// Patterns match anywhere in the path
fn compile_exclude(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(&format!(".*(?:{pattern}).*")).map_err(|e| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Expand a leading `~` to the user's home directory
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
