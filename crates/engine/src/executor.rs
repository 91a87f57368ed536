//! Transaction execution
//!
//! The read → run → (validate/apply) sequence, run on a worker thread or, in
//! SERIAL mode, on the control thread itself.

use lockstep_core::{Key, Storage, Transaction, TxnStatus};
use lockstep_storage::{VersionGuard, VersionStore};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

use crate::queues::TxnQueues;

/// Buffer the current value of every readset and writeset key
///
/// A key the store has never seen gets no buffered read.
pub(crate) fn read_unversioned<S: Storage + ?Sized>(txn: &mut Transaction, store: &S) {
    let keys: Vec<Key> = txn.keys().collect();
    for key in keys {
        if let Some(value) = store.read(key) {
            txn.buffer_read(key, value);
        }
    }
}

/// Run the program; a program error counts as an abort decision
///
/// A panicking program is also an abort decision, so the transaction still
/// reaches the scheduler and gives back whatever locks it holds.
pub(crate) fn run_program(txn: &mut Transaction) {
    match catch_unwind(AssertUnwindSafe(|| txn.run())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!(target: "lockstep::txn", txn_id = %txn.id(), error = %e, "program failed, aborting");
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("(non-string panic)");
            error!(target: "lockstep::txn", txn_id = %txn.id(), panic = message, "program panicked, aborting");
            txn.set_status(TxnStatus::CompletedAbort);
        }
    }
}

/// Apply the buffered writes under the transaction's id
pub(crate) fn apply_writes<S: Storage + ?Sized>(txn: &Transaction, store: &S) {
    for (&key, &value) in txn.writes() {
        store.write(key, value, txn.id());
    }
}

/// Execute against the unversioned store and hand back for commit
///
/// Used by the locking protocols and OCC. The store clock is read before
/// the first read so OCC validation can spot writes that landed during
/// execution.
pub(crate) fn execute<S: Storage + ?Sized>(mut txn: Transaction, store: &S, queues: &TxnQueues) {
    txn.set_occ_start(store.now());
    read_unversioned(&mut txn, store);
    run_program(&mut txn);
    queues.complete(txn);
}

/// Execute under MVCC timestamp ordering, start to finish
///
/// Each key is locked only for its own read. The writeset keys are then
/// locked together in ascending order, every one is checked, and the writes
/// are applied only if all checks pass. A failed check restarts the
/// transaction with a new timestamp.
pub(crate) fn execute_mvcc(mut txn: Transaction, versions: &VersionStore, queues: &TxnQueues) {
    let ts = txn.id();

    let keys: Vec<Key> = txn.keys().collect();
    for key in keys {
        match versions.lock(key).and_then(|mut guard| guard.read(ts)) {
            Ok(value) => txn.buffer_read(key, value),
            Err(e) => debug!(target: "lockstep::mvcc", txn_id = %ts, key, error = %e, "no buffered read"),
        }
    }

    run_program(&mut txn);

    if txn.status() != TxnStatus::CompletedCommit {
        // An abort decision writes nothing; anything else is fatal in finish
        queues.finish(txn);
        return;
    }

    let writeset: Vec<Key> = txn.writeset().iter().copied().collect();
    let mut guards: Vec<VersionGuard<'_>> = Vec::with_capacity(writeset.len());
    for key in writeset {
        match versions.lock(key) {
            Ok(guard) => guards.push(guard),
            Err(e) => {
                warn!(target: "lockstep::mvcc", txn_id = %ts, key, error = %e, "write outside key space, aborting");
                drop(guards);
                txn.set_status(TxnStatus::CompletedAbort);
                queues.finish(txn);
                return;
            }
        }
    }

    if guards.iter().all(|guard| guard.check_write(ts)) {
        for guard in guards.iter_mut() {
            if let Some(&value) = txn.writes().get(&guard.key()) {
                guard.write(value, ts);
            }
        }
        drop(guards);
        queues.finish(txn);
    } else {
        drop(guards);
        debug!(target: "lockstep::mvcc", txn_id = %ts, "write check failed");
        queues.restart(txn);
    }
}
