//! Concurrency layer for lockstep
//!
//! This crate implements the coordination pieces the schedulers use:
//! - LockManager: FIFO lock queues with wait counters and wake-up
//!   (ExclusiveLockManager, SharedLockManager)
//! - OCC validation against the unversioned store's write clock
//!
//! MVCC coordination lives in `lockstep_storage::VersionStore`, whose
//! per-key locks are shared across worker threads. Lock managers, by
//! contrast, belong to a single control thread.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock_manager;
pub mod validation;

pub use lock_manager::{
    ExclusiveLockManager, LockManager, LockMode, LockRequest, LockStatus, SharedLockManager,
};
pub use validation::{validate_occ, validate_transaction, ConflictType, ValidationResult};
