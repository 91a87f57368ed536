//! Two-phase locking over either lock manager variant
//!
//! Locks are requested in ascending key order, readset first, then
//! writeset. Every transaction uses the same global order, so no wait-for
//! cycle can form.
//!
//! A denied transaction touching several keys gives back everything it
//! requested and is restarted with a new id; holding a partial lock set
//! while waiting would block others for nothing. A single-key transaction
//! stays queued and is woken by the lock manager when its turn comes.

use lockstep_concurrency::LockManager;
use lockstep_core::{Key, Transaction, TxnId, TxnStatus};
use lockstep_storage::KvStore;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Scheduler, SchedulerContext};
use crate::executor::{apply_writes, execute};

pub(crate) struct LockingScheduler<L: LockManager> {
    lock_manager: L,
    /// Single-key transactions waiting for their lock
    parked: FxHashMap<TxnId, Transaction>,
    store: Arc<KvStore>,
    ctx: SchedulerContext,
}

impl<L: LockManager> LockingScheduler<L> {
    pub(crate) fn new(lock_manager: L, store: Arc<KvStore>, ctx: SchedulerContext) -> Self {
        Self {
            lock_manager,
            parked: FxHashMap::default(),
            store,
            ctx,
        }
    }

    /// Request every lock `txn` needs, stopping at the first denial
    ///
    /// A key in both sets only gets the write lock: a read lock first would
    /// queue the write behind the transaction's own request.
    fn acquire(&mut self, txn: &Transaction) -> bool {
        let id = txn.id();
        for &key in txn.readset() {
            if txn.writeset().contains(&key) {
                continue;
            }
            if !self.lock_manager.read_lock(id, key) {
                return false;
            }
        }
        for &key in txn.writeset() {
            if !self.lock_manager.write_lock(id, key) {
                return false;
            }
        }
        true
    }

    fn release_all(&mut self, txn: &Transaction) {
        let keys: BTreeSet<Key> = txn.keys().collect();
        for key in keys {
            self.lock_manager.release(txn.id(), key);
        }
    }

    fn dispatch(&self, txn: Transaction) {
        let id = txn.id();
        let store = Arc::clone(&self.store);
        let queues = Arc::clone(&self.ctx.queues);
        self.ctx
            .dispatch(id, move || execute(txn, store.as_ref(), &queues));
    }

    /// Dispatch every parked transaction that now holds all its locks
    fn dispatch_ready(&mut self) {
        while let Some(id) = self.lock_manager.pop_ready() {
            match self.parked.remove(&id) {
                Some(txn) => {
                    debug!(target: "lockstep::lock", txn_id = %id, "woken");
                    self.dispatch(txn);
                }
                None => {
                    warn!(target: "lockstep::lock", txn_id = %id, "ready transaction is not parked")
                }
            }
        }
    }
}

impl<L: LockManager> Scheduler for LockingScheduler<L> {
    fn admit(&mut self, txn: Transaction) {
        if self.acquire(&txn) {
            self.dispatch(txn);
            return;
        }

        if txn.key_count() > 1 {
            debug!(target: "lockstep::lock", txn_id = %txn.id(), "lock denied, restarting");
            self.release_all(&txn);
            // Releasing may have handed our keys to waiters
            self.dispatch_ready();
            self.ctx.queues.restart(txn);
        } else {
            debug!(target: "lockstep::lock", txn_id = %txn.id(), "lock denied, waiting");
            self.parked.insert(txn.id(), txn);
        }
    }

    fn complete(&mut self, txn: Transaction) {
        if txn.status() == TxnStatus::CompletedCommit {
            apply_writes(&txn, self.store.as_ref());
        }
        self.release_all(&txn);
        self.ctx.queues.finish(txn);
        self.dispatch_ready();
    }
}
