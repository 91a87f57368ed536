//! MVCC: timestamp ordering over version chains
//!
//! The control thread only dispatches. Reads, write checks, commits and
//! restarts all happen on the workers under per-key version locks.

use lockstep_core::Transaction;
use lockstep_storage::VersionStore;
use std::sync::Arc;

use super::{Scheduler, SchedulerContext};
use crate::executor::execute_mvcc;

pub(crate) struct MvccScheduler {
    versions: Arc<VersionStore>,
    ctx: SchedulerContext,
}

impl MvccScheduler {
    pub(crate) fn new(versions: Arc<VersionStore>, ctx: SchedulerContext) -> Self {
        Self { versions, ctx }
    }
}

impl Scheduler for MvccScheduler {
    fn admit(&mut self, txn: Transaction) {
        let id = txn.id();
        let versions = Arc::clone(&self.versions);
        let queues = Arc::clone(&self.ctx.queues);
        self.ctx
            .dispatch(id, move || execute_mvcc(txn, &versions, &queues));
    }
}
