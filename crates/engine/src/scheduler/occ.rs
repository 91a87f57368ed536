//! OCC: execute without coordination, validate serially before commit
//!
//! Every admitted transaction goes straight to the pool. Validation and
//! write application both run on the control thread, so no commit can
//! slip in between a transaction's validation and its writes.
//!
//! Any abort, whether the program chose it or validation forced it, sends
//! the transaction back for another run under a new id.

use lockstep_concurrency::validate_transaction;
use lockstep_core::{Transaction, TxnStatus};
use lockstep_storage::KvStore;
use std::sync::Arc;
use tracing::debug;

use super::{Scheduler, SchedulerContext};
use crate::executor::{apply_writes, execute};

pub(crate) struct OccScheduler {
    store: Arc<KvStore>,
    ctx: SchedulerContext,
}

impl OccScheduler {
    pub(crate) fn new(store: Arc<KvStore>, ctx: SchedulerContext) -> Self {
        Self { store, ctx }
    }
}

impl Scheduler for OccScheduler {
    fn admit(&mut self, txn: Transaction) {
        let id = txn.id();
        let store = Arc::clone(&self.store);
        let queues = Arc::clone(&self.ctx.queues);
        self.ctx
            .dispatch(id, move || execute(txn, store.as_ref(), &queues));
    }

    fn complete(&mut self, mut txn: Transaction) {
        let verdict = validate_transaction(&mut txn, self.store.as_ref());
        match txn.status() {
            TxnStatus::CompletedCommit => {
                apply_writes(&txn, self.store.as_ref());
                self.ctx.queues.finish(txn);
            }
            TxnStatus::CompletedAbort => {
                if verdict.is_valid() {
                    debug!(target: "lockstep::occ", txn_id = %txn.id(), "program aborted, restarting");
                } else {
                    debug!(
                        target: "lockstep::occ",
                        txn_id = %txn.id(),
                        conflicts = verdict.conflict_count(),
                        "validation failed, restarting"
                    );
                }
                self.ctx.queues.restart(txn);
            }
            // Undecided: finish treats this as fatal
            _ => self.ctx.queues.finish(txn),
        }
    }
}
