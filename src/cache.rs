//! Memoization of rendered messages.
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use static_assertions::assert_obj_safe;
use twox_hash::XxHash64;

use crate::error::CacheError;
use crate::tags::DisabledSet;

fn digest(parts: &[&[u8]]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for part in parts {
        hasher.write(part);
        // Keeps ["ab", "c"] and ["a", "bc"] apart.
        hasher.write_u8(0);
    }
    hasher.finish()
}

/// Everything a rendered message depends on besides the engine's own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub message_digest: u64,
    pub message_len: usize,
    pub smileys: bool,
    pub disabled_digest: u64,
    pub fingerprint_digest: u64,
}

impl CacheKey {
    /// `fingerprint` covers whatever else changes the output, such as locale or theme.
    pub fn new(message: &str, smileys: bool, disabled: &DisabledSet, fingerprint: &str) -> Self {
        let disabled: Vec<&[u8]> = disabled.iter().map(str::as_bytes).collect();
        Self {
            message_digest: digest(&[message.as_bytes()]),
            message_len: message.len(),
            smileys,
            disabled_digest: digest(&disabled),
            fingerprint_digest: digest(&[fingerprint.as_bytes()]),
        }
    }
}

/// A key-value store for rendered messages.
///
/// Implementations must tolerate concurrent `get` and `put`; the last write wins.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;
    fn put(&self, key: CacheKey, value: String, ttl: Duration) -> Result<(), CacheError>;
}

assert_obj_safe!(CacheBackend);

#[derive(Debug)]
struct Entry {
    /// `None` never expires.
    expires: Option<Instant>,
    value: String,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires.map_or(true, |at| at > now)
    }
}

/// An in-process cache bounded to `capacity` entries.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn put(&self, key: CacheKey, value: String, ttl: Duration) -> Result<(), CacheError> {
        if self.capacity == 0 {
            return Ok(());
        }

        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.retain(|_, entry| entry.is_live(now));
            if entries.len() >= self.capacity {
                if let Some(evicted) = entries.keys().next().copied() {
                    entries.remove(&evicted);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                expires: now.checked_add(ttl),
                value,
            },
        );
        Ok(())
    }
}
