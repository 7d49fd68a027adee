//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or resolving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("I/O error for {path}: {message}")]
    IoError { path: PathBuf, message: String },

    /// Settings file is not valid JSON
    #[error("JSON parse error in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// Unknown value for `backup_per_time`
    #[error("Invalid backup_per_time value: {0}. Use 'folder', 'file' or false")]
    InvalidPerTime(String),

    /// Unknown value for `backup_name_mode`
    #[error("Invalid backup_name_mode value: {0}. Use 'prefix', 'suffix' or false")]
    InvalidNameMode(String),

    /// An entry of `ignore_regexes` does not compile
    #[error("Invalid ignore regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}
