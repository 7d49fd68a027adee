//! Backups of edited files
//!
//! The writer decides, event by event, whether a document needs a fresh copy
//! in the backup tree; fingerprints stop identical consecutive saves.

pub mod fingerprint;
pub mod types;
pub mod writer;

pub use fingerprint::{fingerprint, FingerprintCache};
pub use types::{BackupEvent, Document, Outcome, SessionKey};
pub use writer::{BackupError, BackupWriter};
