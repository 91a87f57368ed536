//! Transaction hand-off between clients, the control thread and workers
//!
//! Three unbounded channels move transactions through the engine:
//!
//! ```text
//! client ──submit──▶ requests ──▶ control thread ──▶ worker pool
//!                       ▲                ▲               │
//!                       └──── restart ───┼───────────────┤
//!                                        └── completed ◀─┤
//! client ◀── results ◀──── finish ◀──────────────────────┘
//! ```
//!
//! Ids are assigned under one mutex together with the enqueue, so the
//! request queue is always in ascending id order.

use crossbeam_channel::{Receiver, Sender};
use lockstep_core::{Error, Result, Transaction, TxnId, TxnStatus};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::stats::EngineCounters;

/// Receiving ends owned by the control thread and the client facade
pub(crate) struct QueueReceivers {
    pub(crate) requests: Receiver<Transaction>,
    pub(crate) completed: Receiver<Transaction>,
    pub(crate) results: Receiver<Transaction>,
}

/// Sending ends plus the id allocator, shared by every thread
pub(crate) struct TxnQueues {
    next_id: Mutex<u64>,
    requests: Sender<Transaction>,
    completed: Sender<Transaction>,
    results: Sender<Transaction>,
    counters: EngineCounters,
}

impl TxnQueues {
    pub(crate) fn new() -> (Self, QueueReceivers) {
        let (requests_tx, requests_rx) = crossbeam_channel::unbounded();
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();
        let (results_tx, results_rx) = crossbeam_channel::unbounded();
        let queues = Self {
            // 0 is the timestamp of the initial MVCC versions
            next_id: Mutex::new(1),
            requests: requests_tx,
            completed: completed_tx,
            results: results_tx,
            counters: EngineCounters::default(),
        };
        let receivers = QueueReceivers {
            requests: requests_rx,
            completed: completed_rx,
            results: results_rx,
        };
        (queues, receivers)
    }

    pub(crate) fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    /// Assign a fresh id and append to the request queue
    fn enqueue(&self, mut txn: Transaction) -> Result<TxnId> {
        let mut next_id = self.next_id.lock();
        let id = TxnId::new(*next_id);
        txn.assign_id(id);
        self.requests.send(txn).map_err(|_| Error::ShutDown)?;
        *next_id += 1;
        Ok(id)
    }

    /// Admit a client transaction
    pub(crate) fn submit(&self, txn: Transaction) -> Result<TxnId> {
        let id = self.enqueue(txn)?;
        self.counters.record_submit();
        Ok(id)
    }

    /// Reset a transaction and send it back through admission with a new id
    ///
    /// Every protocol restarts through here.
    pub(crate) fn restart(&self, mut txn: Transaction) {
        let old = txn.id();
        txn.cleanup();
        self.counters.record_restart();
        match self.enqueue(txn) {
            Ok(new) => {
                debug!(target: "lockstep::txn", txn_id = %old, new_id = %new, "transaction restarted")
            }
            Err(_) => {
                debug!(target: "lockstep::txn", txn_id = %old, "restart dropped, engine shut down")
            }
        }
    }

    /// Hand an executed transaction back to the control thread
    pub(crate) fn complete(&self, txn: Transaction) {
        let id = txn.id();
        if self.completed.send(txn).is_err() {
            debug!(target: "lockstep::txn", txn_id = %id, "completion dropped, engine shut down");
        }
    }

    /// Move a transaction to its terminal status and return it to the client
    ///
    /// The caller has already applied the writes of a committing transaction.
    pub(crate) fn finish(&self, mut txn: Transaction) {
        let status = terminal_status(&txn);
        txn.set_status(status);
        if status == TxnStatus::Committed {
            self.counters.record_commit();
        } else {
            self.counters.record_abort();
        }

        let id = txn.id();
        debug!(target: "lockstep::txn", txn_id = %id, ?status, "transaction finished");
        if self.results.send(txn).is_err() {
            debug!(target: "lockstep::txn", txn_id = %id, "result dropped, client gone");
        }
    }
}

/// Terminal status for an executed transaction
///
/// A program that returned without deciding commit or abort broke its
/// contract; the engine cannot guess the intent, so the process aborts.
pub(crate) fn terminal_status(txn: &Transaction) -> TxnStatus {
    match txn.terminal_status() {
        Ok(status) => status,
        Err(e) => {
            error!(target: "lockstep::txn", txn_id = %txn.id(), error = %e, "fatal: invalid transaction status");
            std::process::abort()
        }
    }
}
