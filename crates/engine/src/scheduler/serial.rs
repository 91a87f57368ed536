//! SERIAL: one transaction at a time, on the control thread
//!
//! The correctness baseline. Writes are applied in exactly the order
//! transactions were admitted.

use lockstep_core::{Transaction, TxnStatus};
use lockstep_storage::KvStore;
use std::sync::Arc;

use super::{Scheduler, SchedulerContext};
use crate::executor::{apply_writes, read_unversioned, run_program};

pub(crate) struct SerialScheduler {
    store: Arc<KvStore>,
    ctx: SchedulerContext,
}

impl SerialScheduler {
    pub(crate) fn new(store: Arc<KvStore>, ctx: SchedulerContext) -> Self {
        Self { store, ctx }
    }
}

impl Scheduler for SerialScheduler {
    fn admit(&mut self, mut txn: Transaction) {
        read_unversioned(&mut txn, self.store.as_ref());
        run_program(&mut txn);
        if txn.status() == TxnStatus::CompletedCommit {
            apply_writes(&txn, self.store.as_ref());
        }
        self.ctx.queues.finish(txn);
    }
}
