//! Lockstep - transaction concurrency-control engine
//!
//! Lockstep executes short transactional programs against an in-memory
//! key/value store under one of five interchangeable protocols: SERIAL,
//! two-phase locking (exclusive-only or shared/exclusive), OCC and MVCC.
//!
//! # Quick Start
//!
//! ```no_run
//! use lockstep::{CcMode, EngineConfig, ReadModifyWrite, Transaction, TxnProcessor};
//! use std::time::Duration;
//!
//! let processor = TxnProcessor::new(EngineConfig::for_mode(CcMode::Mvcc))?;
//!
//! // Increment key 7, reading key 1 along the way
//! processor.submit(Transaction::new([1], [7], ReadModifyWrite::new()))?;
//!
//! let done = processor.recv_result(Duration::from_secs(1)).expect("finished");
//! println!("{} finished as {:?}", done.id(), done.status());
//! # Ok::<(), lockstep::Error>(())
//! ```
//!
//! # Architecture
//!
//! Clients only talk to [`TxnProcessor`]. Lock managers, version chains and
//! validation live in the lower crates and are re-exported for programs and
//! tests that want to drive them directly.

pub use lockstep_core::{
    CcMode, Error, Expect, Key, Noop, Program, Put, ReadModifyWrite, Result, Transaction,
    TxnContext, TxnId, TxnStatus, Value,
};
pub use lockstep_engine::{EngineConfig, EngineStats, PoolStats, TxnProcessor};

/// Lower layers, for direct use
pub mod internals {
    pub use lockstep_concurrency::{
        validate_occ, ConflictType, ExclusiveLockManager, LockManager, LockMode, LockStatus,
        SharedLockManager, ValidationResult,
    };
    pub use lockstep_core::Storage;
    pub use lockstep_storage::{KvStore, Version, VersionChain, VersionStore};
}
