//! Engine metrics
//!
//! Counters are purely observational and use Relaxed ordering: they do not
//! synchronize any other memory operations, and a snapshot taken while
//! transactions are moving may be slightly out of step across fields.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::pool::PoolStats;

/// Live counters shared by the control thread and the workers
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    submitted: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    restarted: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restart(&self) {
        self.restarted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pool: PoolStats) -> EngineStats {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let committed = self.committed.load(Ordering::Relaxed);
        let aborted = self.aborted.load(Ordering::Relaxed);
        EngineStats {
            submitted,
            committed,
            aborted,
            restarted: self.restarted.load(Ordering::Relaxed),
            in_flight: submitted.saturating_sub(committed + aborted),
            pool,
        }
    }
}

/// Engine statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Transactions accepted from clients
    pub submitted: u64,
    /// Transactions that reached COMMITTED
    pub committed: u64,
    /// Transactions that reached ABORTED
    pub aborted: u64,
    /// Restarts after a lock denial or failed validation
    pub restarted: u64,
    /// Submitted transactions not yet handed back
    pub in_flight: u64,
    /// Worker pool metrics
    pub pool: PoolStats,
}

impl EngineStats {
    /// Transactions handed back to clients
    pub fn finished(&self) -> u64 {
        self.committed + self.aborted
    }
}
