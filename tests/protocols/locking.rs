//! Two-Phase Locking Tests
//!
//! Both lock manager variants:
//! - Mutual exclusion while programs run
//! - Deadlock freedom under overlapping key sets
//! - Shared readers run side by side

use crate::common::*;
use lockstep::internals::{LockManager, LockStatus, SharedLockManager};
use lockstep::{Put, ReadModifyWrite};
use proptest::prelude::*;
use std::time::{Duration, Instant};

/// Buffers a write, then panics.
#[derive(Debug)]
struct Explodes;

impl Program for Explodes {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        ctx.write(1, 99)?;
        panic!("program bug");
    }
}

const LOCKING_MODES: [CcMode; 2] = [CcMode::LockingExclusiveOnly, CcMode::Locking];

fn run_shapes(mode: CcMode, shapes: &[Shape], table: &std::sync::Arc<OccupancyTable>) -> Vec<Transaction> {
    let processor = engine(mode, 16);
    for shape in shapes {
        processor
            .submit(Transaction::new(
                shape.readset.iter().copied(),
                shape.writeset.iter().copied(),
                Occupant::new(std::sync::Arc::clone(table), Duration::from_micros(200)),
            ))
            .unwrap();
    }
    collect(&processor, shapes.len())
}

// ============================================================================
// Mutual Exclusion
// ============================================================================

#[test]
fn no_conflicting_programs_overlap() {
    for mode in LOCKING_MODES {
        let table = OccupancyTable::new(16);
        let shapes = random_shapes(42, 150, 16);
        let done = run_shapes(mode, &shapes, &table);

        assert!(done.iter().all(|t| t.status() == TxnStatus::Committed));
        assert_eq!(table.violations(), 0, "mode {}", mode);
    }
}

#[test]
fn hot_key_increments_are_serialized() {
    for mode in LOCKING_MODES {
        let processor = engine(mode, 4);
        for _ in 0..200 {
            processor
                .submit(Transaction::new([0], [0], ReadModifyWrite::new()))
                .unwrap();
        }
        collect(&processor, 200);
        assert_eq!(processor.read_committed(0), Some(200), "mode {}", mode);
        // Single-key transactions wait instead of restarting
        assert_eq!(processor.stats().restarted, 0, "mode {}", mode);
    }
}

#[test]
fn panicking_program_gives_back_its_locks() {
    for mode in LOCKING_MODES {
        let processor = engine(mode, 4);
        processor
            .submit(Transaction::new([], [1], Explodes))
            .unwrap();
        processor
            .submit(Transaction::new([], [1], Put::new([(1, 10)])))
            .unwrap();

        let statuses: Vec<TxnStatus> = collect(&processor, 2).iter().map(Transaction::status).collect();
        assert_eq!(statuses, vec![TxnStatus::Aborted, TxnStatus::Committed], "mode {}", mode);
        assert_eq!(processor.read_committed(1), Some(10), "mode {}", mode);
        assert_eq!(processor.stats().in_flight, 0, "mode {}", mode);
    }
}

// ============================================================================
// Deadlock Freedom
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn overlapping_workloads_always_finish(seed in any::<u64>(), exclusive_only in any::<bool>()) {
        let mode = if exclusive_only { CcMode::LockingExclusiveOnly } else { CcMode::Locking };
        let table = OccupancyTable::new(8);
        let processor = engine(mode, 8);
        let shapes = random_shapes(seed, 60, 8);
        for shape in &shapes {
            processor
                .submit(Transaction::new(
                    shape.readset.iter().copied(),
                    shape.writeset.iter().copied(),
                    Occupant::new(std::sync::Arc::clone(&table), Duration::from_micros(50)),
                ))
                .unwrap();
        }

        let deadline = Instant::now() + RESULT_WAIT;
        let mut finished = 0;
        while finished < shapes.len() && Instant::now() < deadline {
            if processor.recv_result(Duration::from_millis(100)).is_some() {
                finished += 1;
            }
        }
        prop_assert_eq!(finished, shapes.len());
        prop_assert_eq!(table.violations(), 0);
    }
}

// ============================================================================
// Shared Locks
// ============================================================================

#[test]
fn readers_share_writer_waits() {
    let mut lm = SharedLockManager::new();
    let (r1, r2, w) = (TxnId::new(1), TxnId::new(2), TxnId::new(3));

    assert!(lm.read_lock(r1, 0));
    assert!(lm.read_lock(r2, 0));
    assert!(!lm.write_lock(w, 0));
    assert_eq!(lm.status(0).owners(), &[r1, r2]);

    lm.release(r1, 0);
    assert_eq!(lm.pop_ready(), None);
    lm.release(r2, 0);
    assert_eq!(lm.pop_ready(), Some(w));
    assert_eq!(lm.status(0), LockStatus::Exclusive(w));
}

#[test]
fn release_without_holding_is_a_no_op() {
    let mut lm = SharedLockManager::new();
    let (a, b) = (TxnId::new(1), TxnId::new(2));
    assert!(lm.write_lock(a, 3));
    assert!(!lm.read_lock(b, 3));

    lm.release(TxnId::new(99), 3);
    assert_eq!(lm.queue_len(3), 2);
    assert_eq!(lm.status(3), LockStatus::Exclusive(a));
    assert_eq!(lm.wait_count(b), 1);
    assert_eq!(lm.pop_ready(), None);
}

#[test]
fn read_only_workload_never_waits() {
    let processor = engine(CcMode::Locking, 4);
    let table = OccupancyTable::new(4);
    for _ in 0..40 {
        processor
            .submit(Transaction::new(
                [0, 1],
                [],
                Occupant::new(std::sync::Arc::clone(&table), Duration::from_micros(100)),
            ))
            .unwrap();
    }
    collect(&processor, 40);
    assert_eq!(processor.stats().restarted, 0);
    assert_eq!(table.violations(), 0);
}
