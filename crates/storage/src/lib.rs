//! Storage layer for lockstep
//!
//! This crate implements the two stores the schedulers run against:
//! - KvStore: DashMap-backed unversioned store with a logical write clock
//!   (SERIAL, locking, OCC)
//! - VersionStore: per-key version chains behind per-key mutexes (MVCC)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod mvcc;
pub mod stored_value;

pub use kv::KvStore;
pub use mvcc::{Version, VersionChain, VersionGuard, VersionStore};
pub use stored_value::StoredValue;
