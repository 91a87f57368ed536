//! Per-protocol scheduling
//!
//! One scheduler variant per concurrency-control mode, chosen once when the
//! engine is built. The control thread feeds it two event kinds:
//!
//! - `admit`: a transaction popped from the request queue
//! - `complete`: a transaction a worker finished executing
//!
//! A scheduler is owned by the control thread, so its state (lock tables,
//! parked transactions) needs no synchronization.

mod locking;
mod mvcc;
mod occ;
mod serial;

pub(crate) use locking::LockingScheduler;
pub(crate) use mvcc::MvccScheduler;
pub(crate) use occ::OccScheduler;
pub(crate) use serial::SerialScheduler;

use lockstep_concurrency::{ExclusiveLockManager, SharedLockManager};
use lockstep_core::{CcMode, Transaction, TxnId};
use lockstep_storage::{KvStore, VersionStore};
use std::sync::Arc;
use tracing::warn;

use crate::pool::WorkerPool;
use crate::queues::TxnQueues;

/// Protocol state machine driven by the control thread
pub(crate) trait Scheduler: Send {
    /// Handle a transaction popped from the request queue
    fn admit(&mut self, txn: Transaction);

    /// Handle a transaction a worker handed back
    fn complete(&mut self, txn: Transaction) {
        warn!(target: "lockstep::scheduler", txn_id = %txn.id(), "unexpected completion ignored");
    }
}

/// Store backing an engine instance
#[derive(Debug, Clone)]
pub(crate) enum Backend {
    /// SERIAL, locking and OCC
    Unversioned(Arc<KvStore>),
    /// MVCC
    Versioned(Arc<VersionStore>),
}

/// Everything a scheduler hands work to
#[derive(Clone)]
pub(crate) struct SchedulerContext {
    pub(crate) pool: Arc<WorkerPool>,
    pub(crate) queues: Arc<TxnQueues>,
}

impl SchedulerContext {
    /// Queue `work` on the pool; a stopped pool drops it
    pub(crate) fn dispatch(&self, txn_id: TxnId, work: impl FnOnce() + Send + 'static) {
        if self.pool.submit(work).is_err() {
            warn!(target: "lockstep::scheduler", txn_id = %txn_id, "worker pool stopped, transaction dropped");
        }
    }
}

/// Seed the store for `mode` over keys `0..key_space` and build the
/// matching scheduler variant
pub(crate) fn build(
    mode: CcMode,
    key_space: u64,
    ctx: SchedulerContext,
) -> (Backend, Box<dyn Scheduler>) {
    if mode == CcMode::Mvcc {
        let versions = Arc::new(VersionStore::new(key_space));
        let scheduler: Box<dyn Scheduler> = Box::new(MvccScheduler::new(Arc::clone(&versions), ctx));
        return (Backend::Versioned(versions), scheduler);
    }

    let store = Arc::new(KvStore::with_key_space(key_space));
    let shared = Arc::clone(&store);
    let scheduler: Box<dyn Scheduler> = match mode {
        CcMode::LockingExclusiveOnly => Box::new(LockingScheduler::new(
            ExclusiveLockManager::new(),
            shared,
            ctx,
        )),
        CcMode::Locking => Box::new(LockingScheduler::new(SharedLockManager::new(), shared, ctx)),
        CcMode::Occ => Box::new(OccScheduler::new(shared, ctx)),
        CcMode::Serial | CcMode::Mvcc => Box::new(SerialScheduler::new(shared, ctx)),
    };
    (Backend::Unversioned(store), scheduler)
}
