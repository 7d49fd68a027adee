//! Content fingerprints for skipping unchanged re-saves

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

use super::types::SessionKey;

/// Default number of buffers remembered
pub const DEFAULT_CAPACITY: usize = 1024;

/// SHA-256 of the source path followed by the content, hex encoded
#[must_use]
pub fn fingerprint(path: &Path, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Last fingerprint per open buffer
///
/// Bounded: when full, the buffer inserted first is forgotten.
#[derive(Debug)]
pub struct FingerprintCache {
    entries: HashMap<SessionKey, String>,
    order: VecDeque<SessionKey>,
    capacity: usize,
}

impl FingerprintCache {
    /// Create a cache remembering up to `capacity` buffers
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Last fingerprint stored for a buffer
    #[must_use]
    pub fn get(&self, key: SessionKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Whether `hash` equals the stored fingerprint for the buffer
    #[must_use]
    pub fn is_unchanged(&self, key: SessionKey, hash: &str) -> bool {
        self.get(key) == Some(hash)
    }

    /// Store the fingerprint for a buffer
    pub fn insert(&mut self, key: SessionKey, hash: String) {
        if self.entries.insert(key, hash).is_none() {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    /// Forget a buffer (document closed)
    pub fn remove(&mut self, key: SessionKey) -> Option<String> {
        let removed = self.entries.remove(&key);
        if removed.is_some() {
            self.order.retain(|k| *k != key);
        }
        removed
    }

    /// Number of buffers remembered
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no buffer is remembered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every buffer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
