//! MVCC Tests
//!
//! Version visibility, timestamp-order write checks, and end-to-end
//! behavior of the protocol under contention.

use crate::common::*;
use lockstep::internals::VersionStore;
use lockstep::{Expect, Put, ReadModifyWrite};
use std::collections::HashSet;
use std::time::Duration;

fn ts(raw: u64) -> TxnId {
    TxnId::new(raw)
}

// ============================================================================
// Version Store
// ============================================================================

#[test]
fn reads_pick_latest_visible_version() {
    let store = VersionStore::new(4);
    {
        let mut guard = store.lock(0).unwrap();
        guard.write(100, ts(10));
        guard.write(200, ts(20));
    }

    let mut guard = store.lock(0).unwrap();
    assert_eq!(guard.read(ts(15)).unwrap(), 100);
    assert_eq!(guard.read(ts(25)).unwrap(), 200);
    assert_eq!(guard.read(ts(5)).unwrap(), 0);
}

#[test]
fn later_read_blocks_earlier_write() {
    let store = VersionStore::new(4);
    let mut guard = store.lock(1).unwrap();
    guard.write(100, ts(10));
    guard.read(ts(20)).unwrap();

    assert!(!guard.check_write(ts(15)));
    assert!(guard.check_write(ts(25)));
}

#[test]
fn unknown_key_is_an_error() {
    let store = VersionStore::new(4);
    assert!(matches!(store.lock(4), Err(Error::KeyNotFound(4))));
}

// ============================================================================
// End to End
// ============================================================================

#[test]
fn contended_increments_all_land() {
    let processor = engine(CcMode::Mvcc, 8);
    let mut submitted = HashSet::new();
    for _ in 0..150 {
        let id = processor
            .submit(Transaction::new(
                [2],
                [2],
                ReadModifyWrite::with_work(Duration::from_micros(100)),
            ))
            .unwrap();
        submitted.insert(id);
    }
    let done = collect(&processor, 150);

    assert_eq!(processor.read_committed(2), Some(150));
    for txn in &done {
        assert_eq!(txn.status(), TxnStatus::Committed);
        assert_eq!(txn.restarts() > 0, !submitted.contains(&txn.id()));
    }
    assert_eq!(
        processor.stats().restarted,
        done.iter().map(|t| u64::from(t.restarts())).sum::<u64>()
    );
}

#[test]
fn restarted_transaction_starts_clean() {
    let processor = engine(CcMode::Mvcc, 8);
    for _ in 0..50 {
        processor
            .submit(Transaction::new([4], [4, 5], ReadModifyWrite::new()))
            .unwrap();
    }
    for txn in collect(&processor, 50) {
        // Only the final execution's buffers survive
        assert_eq!(txn.reads().len(), 2);
        assert_eq!(txn.writes().len(), 2);
        assert_eq!(txn.writes()[&4], txn.reads()[&4] + 1);
    }
    assert_eq!(processor.read_committed(5), Some(50));
}

#[test]
fn aborted_transaction_leaves_no_version() {
    let processor = engine(CcMode::Mvcc, 8);
    processor
        .submit(Transaction::new([6], [6], Expect::new([(6, 1)])))
        .unwrap();
    processor
        .submit(Transaction::new([], [7], Put::new([(7, 70)])))
        .unwrap();

    let done = collect(&processor, 2);
    let aborted = done.iter().filter(|t| t.status() == TxnStatus::Aborted).count();
    assert_eq!(aborted, 1);
    assert_eq!(processor.read_committed(6), Some(0));
    assert_eq!(processor.read_committed(7), Some(70));
}
