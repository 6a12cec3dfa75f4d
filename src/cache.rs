//! TTL cache for upstream provider responses
//!
//! Every provider client checks this store before making an outbound HTTP
//! call. Expiry is enforced lazily inside [`CacheStore::get`] rather than by a
//! background sweep: an expired entry is deleted as a side effect of the read
//! that observes it, and a second read of the same key is an ordinary miss.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

/// A cached payload with an absolute expiry
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    expires_at: Instant,
}

/// Key-value store with per-entry time-to-live
///
/// Key construction is the caller's responsibility: each provider derives a
/// key deterministic in its own request parameters so that semantically
/// identical requests collide and distinct requests do not.
///
/// A single global mutex serializes reads (including the expiry delete) and
/// writes. No cross-key ordering is guaranteed.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, returning the payload only while it is still live
    ///
    /// An entry whose expiry is in the past is never returned; it is removed
    /// under the same lock that observed it, so concurrent readers cannot
    /// both see or both delete it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace the entry for `key` with `expiry = now + ttl`
    pub fn set(&self, key: &str, payload: Value, ttl: Duration) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of entries currently held, expired or not
    ///
    /// Only meaningful for diagnostics; expired entries linger until a read
    /// touches them.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
