//! Configuration
//!
//! Loading of the settings file and resolution into an immutable
//! [`BackupConfig`].

mod error;
mod layout;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use layout::{Layout, NamingMode, PerTime, Platform};
pub use settings::{expand_home, BackupConfig, Settings, DEFAULT_MAX_BACKUP_FILE_SIZE};
