//! Multi-version store for the MVCC protocol
//!
//! Every key owns a `VersionChain`: all versions ever written to it, kept
//! newest-first. Nothing is ever garbage collected.
//!
//! # Timestamp ordering
//!
//! - A read at timestamp `t` returns the version with the greatest
//!   `version_id <= t` and raises that version's `max_read_id` to `t`.
//! - A write at timestamp `t` is allowed only if the newest version has not
//!   been read by anyone later than `t` (`max_read_id <= t`). Otherwise the
//!   write would slip underneath a read that already happened.
//!
//! # Locking
//!
//! Each chain sits behind its own mutex. [`VersionStore::lock`] hands out a
//! [`VersionGuard`]; reads, checks and writes go through the guard, and
//! dropping it unlocks the key. Callers that lock several keys at once must
//! lock them in ascending key order.

use lockstep_core::{Error, Key, Result, TxnId, Value};
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// One committed value of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Value written
    pub value: Value,
    /// Timestamp of the writer
    pub version_id: TxnId,
    /// Largest reader timestamp that has observed this version
    pub max_read_id: TxnId,
}

impl Version {
    fn new(value: Value, version_id: TxnId) -> Self {
        Version {
            value,
            version_id,
            max_read_id: version_id,
        }
    }
}

/// All versions of a single key
///
/// Versions are stored in descending `version_id` order (newest first), so a
/// read scans from the front until it finds one at or below its timestamp.
/// At most one version exists per `version_id`.
#[derive(Debug, Clone, Default)]
pub struct VersionChain {
    versions: VecDeque<Version>,
}

impl VersionChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain holding the dummy version at timestamp 0
    pub fn with_initial(value: Value) -> Self {
        let mut chain = Self::new();
        chain.write(value, TxnId::ZERO);
        chain
    }

    /// Value visible at `timestamp`, recording the read
    ///
    /// Returns `None` when every version is newer than `timestamp`.
    pub fn read(&mut self, timestamp: TxnId) -> Option<Value> {
        let version = self
            .versions
            .iter_mut()
            .find(|v| v.version_id <= timestamp)?;
        version.max_read_id = version.max_read_id.max(timestamp);
        Some(version.value)
    }

    /// Whether a write at `timestamp` keeps timestamp order intact
    ///
    /// Looks only at the newest version, regardless of `timestamp`.
    pub fn check_write(&self, timestamp: TxnId) -> bool {
        match self.versions.front() {
            Some(newest) => newest.max_read_id <= timestamp,
            None => true,
        }
    }

    /// Install a version written at `timestamp`
    ///
    /// Re-writing an existing `version_id` replaces its value in place.
    pub fn write(&mut self, value: Value, timestamp: TxnId) {
        let position = self
            .versions
            .iter()
            .position(|v| v.version_id <= timestamp);
        match position {
            Some(idx) if self.versions[idx].version_id == timestamp => {
                self.versions[idx].value = value;
            }
            Some(idx) => self.versions.insert(idx, Version::new(value, timestamp)),
            None => self.versions.push_back(Version::new(value, timestamp)),
        }
    }

    /// Newest version
    #[inline]
    pub fn latest(&self) -> Option<&Version> {
        self.versions.front()
    }

    /// Number of versions stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Versions, newest first
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    /// Check if the chain has no versions
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Versioned store over a fixed key space
///
/// The key set is fixed at construction, so the map itself is never mutated
/// afterwards and needs no lock; only the chains do.
pub struct VersionStore {
    chains: FxHashMap<Key, Mutex<VersionChain>>,
}

impl VersionStore {
    /// Create a store with keys `0..key_space`, each seeded with value 0
    pub fn new(key_space: u64) -> Self {
        Self::from_keys(0..key_space, 0)
    }

    /// Create a store over `keys`, each seeded with `value` at timestamp 0
    pub fn from_keys(keys: impl IntoIterator<Item = Key>, value: Value) -> Self {
        let chains = keys
            .into_iter()
            .map(|key| (key, Mutex::new(VersionChain::with_initial(value))))
            .collect();
        Self { chains }
    }

    /// Lock `key` for reading, checking and writing
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if `key` is outside the key space.
    pub fn lock(&self, key: Key) -> Result<VersionGuard<'_>> {
        let chain = self.chains.get(&key).ok_or(Error::KeyNotFound(key))?;
        Ok(VersionGuard {
            key,
            chain: chain.lock(),
        })
    }

    /// Newest committed value of `key`
    pub fn latest_value(&self, key: Key) -> Option<Value> {
        let chain = self.chains.get(&key)?;
        let guard = chain.lock();
        guard.latest().map(|v| v.value)
    }

    /// Whether `key` belongs to the key space
    pub fn contains(&self, key: Key) -> bool {
        self.chains.contains_key(&key)
    }

    /// Number of keys in the key space
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Check if the key space is empty
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("keys", &self.chains.len())
            .finish()
    }
}

/// Exclusive access to one key's chain; unlocks on drop
pub struct VersionGuard<'a> {
    key: Key,
    chain: MutexGuard<'a, VersionChain>,
}

impl<'a> VersionGuard<'a> {
    /// Locked key
    pub fn key(&self) -> Key {
        self.key
    }

    /// Versioned read at `timestamp`
    ///
    /// # Errors
    ///
    /// Returns `Error::VersionNotFound` if no version is visible at
    /// `timestamp`. Callers treat that as "no buffered read".
    pub fn read(&mut self, timestamp: TxnId) -> Result<Value> {
        self.chain.read(timestamp).ok_or(Error::VersionNotFound {
            key: self.key,
            timestamp,
        })
    }

    /// Timestamp-order check for a write at `timestamp`
    pub fn check_write(&self, timestamp: TxnId) -> bool {
        self.chain.check_write(timestamp)
    }

    /// Install a version at `timestamp`
    pub fn write(&mut self, value: Value, timestamp: TxnId) {
        self.chain.write(value, timestamp);
    }

    /// The locked chain
    pub fn chain(&self) -> &VersionChain {
        &self.chain
    }
}
