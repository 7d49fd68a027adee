//! Backup tree layout options
//!
//! The raw `backup_per_day` / `backup_per_time` settings are resolved once
//! into a [`Layout`], so callers never re-branch on strings.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

/// Time-of-day discriminator for per-day backups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerTime {
    /// One backup per file and day
    #[default]
    None,
    /// `HHMMSS` folder under the day folder
    Folder,
    /// `_HHMMSS` appended to the backup file name
    File,
}

/// Marker decoration of backup file names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// File name kept as is
    #[default]
    None,
    /// Marker inserted before the base name
    Prefix,
    /// Marker inserted before the extension
    Suffix,
}

/// Settings values may be `false`, `null` or a name
#[derive(Deserialize)]
#[serde(untagged)]
enum Toggle {
    Flag(bool),
    Name(String),
}

impl fmt::Display for PerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Folder => write!(f, "folder"),
            Self::File => write!(f, "file"),
        }
    }
}

impl FromStr for PerTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "false" => Ok(Self::None),
            "folder" => Ok(Self::Folder),
            "file" => Ok(Self::File),
            _ => Err(ConfigError::InvalidPerTime(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for PerTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<Toggle>::deserialize(deserializer)? {
            None | Some(Toggle::Flag(false)) => Ok(Self::None),
            Some(Toggle::Flag(true)) => Err(de::Error::custom(ConfigError::InvalidPerTime(
                "true".to_string(),
            ))),
            Some(Toggle::Name(name)) => name.parse().map_err(de::Error::custom),
        }
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Prefix => write!(f, "prefix"),
            Self::Suffix => write!(f, "suffix"),
        }
    }
}

impl FromStr for NamingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "false" => Ok(Self::None),
            "prefix" => Ok(Self::Prefix),
            "suffix" => Ok(Self::Suffix),
            _ => Err(ConfigError::InvalidNameMode(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for NamingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<Toggle>::deserialize(deserializer)? {
            None | Some(Toggle::Flag(false)) => Ok(Self::None),
            Some(Toggle::Flag(true)) => Err(de::Error::custom(ConfigError::InvalidNameMode(
                "true".to_string(),
            ))),
            Some(Toggle::Name(name)) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// Resolved shape of the backup tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// `<root>/<source dir>/<name>`
    Flat,
    /// `<root>/<date>/<source dir>/<name>`
    PerDay,
    /// `<root>/<date>/<time>/<source dir>/<name>`
    PerDayTimeFolder,
    /// `<root>/<date>/<source dir>/<stem>_<time><ext>`
    PerDayTimeFile,
}

impl Layout {
    /// Resolve the layout from the raw settings
    ///
    /// `per_time` only has an effect when backups are grouped per day.
    #[must_use]
    pub fn resolve(per_day: bool, per_time: PerTime) -> Self {
        match (per_day, per_time) {
            (false, _) => Self::Flat,
            (true, PerTime::None) => Self::PerDay,
            (true, PerTime::Folder) => Self::PerDayTimeFolder,
            (true, PerTime::File) => Self::PerDayTimeFile,
        }
    }

    /// Whether backups are nested under a `YYYY-MM-DD` folder
    #[must_use]
    pub fn is_per_day(self) -> bool {
        !matches!(self, Self::Flat)
    }

    /// Whether an `HHMMSS` folder sits under the day folder
    #[must_use]
    pub fn has_time_folder(self) -> bool {
        matches!(self, Self::PerDayTimeFolder)
    }

    /// Whether the file name carries `_HHMMSS`
    #[must_use]
    pub fn has_time_in_name(self) -> bool {
        matches!(self, Self::PerDayTimeFile)
    }
}

/// Host platform, for default locations and path normalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Osx,
    Linux,
}

impl Platform {
    /// Platform of the running build
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Osx
        } else {
            Self::Linux
        }
    }

    /// Name used in the per-platform settings file
    #[must_use]
    pub fn settings_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Osx => "OSX",
            Self::Linux => "Linux",
        }
    }

    /// Backup root used when `backup_dir` is empty
    #[must_use]
    pub fn default_backup_dir(self) -> &'static str {
        match self {
            Self::Windows => "D:/Sublime Text Backups",
            Self::Osx | Self::Linux => "~/.sublime/backups",
        }
    }

    /// Settings file name, e.g. `AutoBackups (Linux).sublime-settings`
    #[must_use]
    pub fn settings_file_name(self) -> String {
        format!("AutoBackups ({}).sublime-settings", self.settings_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_resolve() {
        assert_eq!(Layout::resolve(false, PerTime::File), Layout::Flat);
        assert_eq!(Layout::resolve(true, PerTime::None), Layout::PerDay);
        assert_eq!(
            Layout::resolve(true, PerTime::Folder),
            Layout::PerDayTimeFolder
        );
        assert_eq!(Layout::resolve(true, PerTime::File), Layout::PerDayTimeFile);
    }

    #[test]
    fn test_per_time_accepts_false_and_names() {
        let none: PerTime = serde_json::from_str("false").unwrap();
        assert_eq!(none, PerTime::None);
        let null: PerTime = serde_json::from_str("null").unwrap();
        assert_eq!(null, PerTime::None);
        let folder: PerTime = serde_json::from_str("\"folder\"").unwrap();
        assert_eq!(folder, PerTime::Folder);
        assert!(serde_json::from_str::<PerTime>("\"hourly\"").is_err());
        assert!(serde_json::from_str::<PerTime>("true").is_err());
    }

    #[test]
    fn test_naming_mode_from_str() {
        assert_eq!(NamingMode::from_str("Prefix").unwrap(), NamingMode::Prefix);
        assert_eq!(NamingMode::from_str("suffix").unwrap(), NamingMode::Suffix);
        assert_eq!(NamingMode::from_str("").unwrap(), NamingMode::None);
        assert!(NamingMode::from_str("infix").is_err());
    }

    #[test]
    fn test_settings_file_name() {
        assert_eq!(
            Platform::Osx.settings_file_name(),
            "AutoBackups (OSX).sublime-settings"
        );
    }
}
