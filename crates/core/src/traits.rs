//! Core traits for storage abstraction
//!
//! The SERIAL, locking and OCC schedulers talk to the unversioned store only
//! through [`Storage`], so the backing implementation can be swapped without
//! touching protocol logic.

use crate::types::{Key, TxnId, Value};

/// Unversioned key/value storage
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
///
/// Every write is stamped from a monotonically increasing logical clock.
/// OCC uses the clock to decide whether a key changed while a transaction
/// was executing: the transaction records [`Storage::now`] before reading,
/// and a key whose [`Storage::timestamp`] is greater was overwritten since.
pub trait Storage: Send + Sync {
    /// Current value of `key`, or `None` if it was never written
    fn read(&self, key: Key) -> Option<Value>;

    /// Store `value` under `key` on behalf of `writer`
    ///
    /// The write is stamped with a fresh clock tick.
    fn write(&self, key: Key, value: Value, writer: TxnId);

    /// Clock tick of the last write to `key` (0 if never written)
    fn timestamp(&self, key: Key) -> u64;

    /// Current clock reading
    fn now(&self) -> u64;
}
