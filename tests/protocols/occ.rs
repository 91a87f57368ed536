//! OCC Tests
//!
//! Aborted transactions, whether validation or the program decided it,
//! are restarted with fresh ids until they commit.

use crate::common::*;
use lockstep::internals::{validate_occ, ConflictType, KvStore, Storage};
use lockstep::{Expect, Noop, ReadModifyWrite};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Aborts its first `remaining` runs, then commits.
#[derive(Debug)]
struct AbortsFirst {
    remaining: u32,
}

impl Program for AbortsFirst {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        if self.remaining > 0 {
            self.remaining -= 1;
            ctx.abort();
        } else {
            ctx.commit();
        }
        Ok(())
    }
}

#[test]
fn contended_increments_all_land() {
    let processor = engine(CcMode::Occ, 8);
    let mut submitted = HashSet::new();
    for _ in 0..150 {
        let id = processor
            .submit(Transaction::new(
                [1],
                [1],
                ReadModifyWrite::with_work(Duration::from_micros(100)),
            ))
            .unwrap();
        submitted.insert(id);
    }
    let done = collect(&processor, 150);

    assert_eq!(processor.read_committed(1), Some(150));
    for txn in &done {
        assert_eq!(txn.status(), TxnStatus::Committed);
        // Restarted work always carries an id it was never submitted under
        assert_eq!(txn.restarts() > 0, !submitted.contains(&txn.id()));
        assert!(txn.reads().contains_key(&1));
    }
}

#[test]
fn program_abort_is_restarted() {
    let processor = engine(CcMode::Occ, 8);
    let id = processor
        .submit(Transaction::new([3], [], AbortsFirst { remaining: 2 }))
        .unwrap();

    let done = collect(&processor, 1);
    assert_eq!(done[0].status(), TxnStatus::Committed);
    assert_eq!(done[0].restarts(), 2);
    assert!(done[0].id() > id);

    let stats = processor.stats();
    assert_eq!(stats.restarted, 2);
    assert_eq!(stats.aborted, 0);
}

#[test]
fn unsatisfiable_program_keeps_restarting() {
    let processor = engine(CcMode::Occ, 8);
    processor
        .submit(Transaction::new([3], [], Expect::new([(3, 1)])))
        .unwrap();

    let deadline = Instant::now() + RESULT_WAIT;
    while processor.stats().restarted == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(processor.stats().restarted > 0);
    assert!(processor.poll_result().is_none());
    assert_eq!(processor.stats().aborted, 0);
}

#[test]
fn validation_flags_every_overwritten_key() {
    let store = KvStore::with_key_space(8);
    let mut txn = Transaction::new([1, 2], [3], Noop);
    txn.set_occ_start(store.now());

    store.write(2, 20, TxnId::new(50));
    store.write(3, 30, TxnId::new(51));

    let result = validate_occ(&txn, &store);
    assert!(!result.is_valid());
    assert_eq!(result.conflict_count(), 2);
    assert!(matches!(result.conflicts[0], ConflictType::StaleRead { key: 2, .. }));
    assert!(matches!(result.conflicts[1], ConflictType::StaleWrite { key: 3, .. }));
}

#[test]
fn writes_before_start_do_not_conflict() {
    let store = KvStore::with_key_space(8);
    store.write(1, 10, TxnId::new(1));
    let mut txn = Transaction::new([1], [1], Noop);
    txn.set_occ_start(store.now());

    assert!(validate_occ(&txn, &store).is_valid());
}
