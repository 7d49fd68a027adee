//! AutoBackups Core - Backup paths, writer, locator and retention
//!
//! This crate computes where backups of edited files live, writes them on
//! save and open events, lists the backups of a file newest first, and
//! purges old day folders.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod config;
pub mod error;
pub mod host;
pub mod locate;
pub mod paths;
pub mod plugin;
pub mod retention;

pub use backup::{BackupEvent, BackupWriter, Document, Outcome, SessionKey};
pub use config::{BackupConfig, Layout, Platform, Settings};
pub use error::{Error, Result};
pub use locate::{BackupLocator, Listing};
pub use paths::PathResolver;
pub use plugin::AutoBackups;
