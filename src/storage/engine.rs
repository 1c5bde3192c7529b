//! Thread-Safe Storage Engine
//!
//! This module implements the key-value store shared by every client
//! connection. Each key maps to an [`Entry`] holding the value and an optional
//! absolute expiry deadline.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independent shards so writers on
//!    different keys rarely contend.
//! 2. **Whole-Entry Writes**: `set` and `set_with_expiry` replace the entire
//!    entry under the shard's write lock, so a reader sees either the old or
//!    the new entry, never a mix.
//! 3. **Lazy Expiry Only**: The engine never interprets or removes expired
//!    entries. Whoever reads an entry decides whether it is still live.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// A stored value with an optional absolute expiry deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored bytes
    pub value: Bytes,
    /// When this entry stops being visible (None = never)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry that expires at `expires_at`.
    pub fn with_expiry(value: Bytes, expires_at: Instant) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// Whether the entry is expired as of `now`.
    ///
    /// The deadline itself counts as expired.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<Bytes, Entry>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The shared key-value store.
///
/// Wrap it in an `Arc` and hand a clone to every connection; all methods take
/// `&self`.
///
/// # Example
///
/// ```
/// use emberkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("grape"), Bytes::from("banana"));
///
/// let entry = engine.get(b"grape").unwrap();
/// assert_eq!(entry.value, Bytes::from("banana"));
/// assert_eq!(entry.expires_at, None);
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();
        Self { shards }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Returns a copy of the entry stored under `key`.
    ///
    /// Expired entries are returned as-is; see [`Entry::is_expired_at`].
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.get_shard(key).read().get(key).cloned()
    }

    /// Stores `value` under `key` with no expiry, replacing any previous
    /// entry and its deadline.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.insert(key, Entry::new(value));
    }

    /// Stores `value` under `key`, visible until `expires_at`.
    pub fn set_with_expiry(&self, key: Bytes, value: Bytes, expires_at: Instant) {
        self.insert(key, Entry::with_expiry(value, expires_at));
    }

    fn insert(&self, key: Bytes, entry: Entry) {
        let shard = self.get_shard(&key);
        shard.write().insert(key, entry);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }
}
