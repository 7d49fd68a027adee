//! Crate-level error type
//!
//! Each module has its own error enum; [`Error`] unifies them at the plugin
//! boundary, where everything is caught and logged.

use thiserror::Error;

use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::host::HostError;

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by AutoBackups operations
#[derive(Error, Debug)]
pub enum Error {
    /// Settings could not be loaded or resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A backup attempt failed
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// The host could not open a file, folder or URL
    #[error(transparent)]
    Host(#[from] HostError),

    /// Nothing to show for a restore request
    #[error("{0}")]
    NotFound(String),
}

impl Error {
    /// Whether the error should be shown to the user rather than only logged
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Host(_))
    }
}
