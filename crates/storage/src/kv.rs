//! Unversioned key/value store
//!
//! Backs the SERIAL, locking and OCC protocols.
//!
//! # Design
//!
//! - DashMap: sharded, reads only take a shard read lock
//! - One `StoredValue` per key: the last committed write wins
//! - Logical clock (AtomicU64) stamps every write
//!
//! # Clock and OCC
//!
//! A write ticks the clock while holding the entry's shard lock and only
//! releases it after the new value is in place. A reader that loads
//! `now()` and then reads a key therefore either sees the value of every
//! write stamped `<= now()`, or blocks until that value is visible. Any
//! write it missed is stamped `> now()`, which is exactly what OCC
//! validation checks for.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lockstep_core::traits::Storage;
use lockstep_core::{Key, TxnId, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::stored_value::StoredValue;

/// Sharded unversioned store
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - read(): shard read lock via DashMap
/// - write(): locks only the target key's shard
pub struct KvStore {
    data: DashMap<Key, StoredValue>,
    clock: AtomicU64,
}

impl KvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            clock: AtomicU64::new(0),
        }
    }

    /// Create a store with keys `0..key_space` holding value 0
    pub fn with_key_space(key_space: u64) -> Self {
        let store = Self {
            data: DashMap::with_capacity(key_space as usize),
            clock: AtomicU64::new(0),
        };
        store.populate(0..key_space, 0);
        store
    }

    /// Seed keys with `value` at clock 0
    ///
    /// Seeded values are older than every transaction, so they never fail
    /// OCC validation.
    pub fn populate(&self, keys: impl IntoIterator<Item = Key>, value: Value) {
        for key in keys {
            self.data.insert(key, StoredValue::initial(value));
        }
    }

    /// Full stored entry for `key`
    pub fn get(&self, key: Key) -> Option<StoredValue> {
        self.data.get(&key).map(|entry| *entry.value())
    }

    /// Id of the last writer of `key`
    pub fn writer(&self, key: Key) -> Option<TxnId> {
        self.get(key).map(|sv| sv.writer())
    }

    /// Number of keys present
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("keys", &self.data.len())
            .field("clock", &self.clock.load(Ordering::Relaxed))
            .finish()
    }
}

impl Storage for KvStore {
    fn read(&self, key: Key) -> Option<Value> {
        self.data.get(&key).map(|entry| entry.value().value())
    }

    fn write(&self, key: Key, value: Value, writer: TxnId) {
        // Tick while the shard is locked so the stamp and the value become
        // visible together.
        match self.data.entry(key) {
            Entry::Occupied(mut entry) => {
                let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
                entry.insert(StoredValue::new(value, writer, tick));
            }
            Entry::Vacant(entry) => {
                let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
                entry.insert(StoredValue::new(value, writer, tick));
            }
        }
    }

    fn timestamp(&self, key: Key) -> u64 {
        self.data
            .get(&key)
            .map(|entry| entry.value().written_at())
            .unwrap_or(0)
    }

    fn now(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }
}
