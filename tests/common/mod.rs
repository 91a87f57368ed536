//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use lockstep::{
    CcMode, EngineConfig, Error, Key, Program, Result, Transaction, TxnContext, TxnId,
    TxnProcessor, TxnStatus, Value,
};

/// How long any single result may take to arrive.
pub const RESULT_WAIT: Duration = Duration::from_secs(20);

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test writer (shown with `--nocapture`).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::INFO)
            .try_init();
    });
}

// ============================================================================
// Engines
// ============================================================================

/// Small engine for `mode`: 4 workers, keys `0..key_space`.
pub fn engine(mode: CcMode, key_space: u64) -> TxnProcessor {
    init_tracing();
    TxnProcessor::new(EngineConfig {
        mode,
        worker_threads: 4,
        key_space,
        ..EngineConfig::default()
    })
    .unwrap()
}

/// Wait for exactly `count` results.
pub fn collect(processor: &TxnProcessor, count: usize) -> Vec<Transaction> {
    (0..count)
        .map(|i| {
            processor
                .recv_result(RESULT_WAIT)
                .unwrap_or_else(|| panic!("{}: only {} of {} results", processor.mode(), i, count))
        })
        .collect()
}

// ============================================================================
// Workloads
// ============================================================================

/// Declared keys of one transaction.
#[derive(Debug, Clone)]
pub struct Shape {
    pub readset: BTreeSet<Key>,
    pub writeset: BTreeSet<Key>,
}

/// `count` random, heavily overlapping shapes over keys `0..keys`.
pub fn random_shapes(seed: u64, count: usize, keys: Key) -> Vec<Shape> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let reads = rng.gen_range(0..4);
            let writes = rng.gen_range(1..3);
            Shape {
                readset: (0..reads).map(|_| rng.gen_range(0..keys)).collect(),
                writeset: (0..writes).map(|_| rng.gen_range(0..keys)).collect(),
            }
        })
        .collect()
}

// ============================================================================
// Programs
// ============================================================================

/// Appends the executing id to a shared log, then commits.
#[derive(Debug, Clone)]
pub struct Recorder {
    log: Arc<Mutex<Vec<TxnId>>>,
}

impl Recorder {
    pub fn new(log: Arc<Mutex<Vec<TxnId>>>) -> Self {
        Self { log }
    }
}

impl Program for Recorder {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        self.log.lock().push(ctx.id());
        ctx.commit();
        Ok(())
    }
}

/// Per-key occupancy, counted while `Occupant` programs run
#[derive(Debug)]
pub struct OccupancyTable {
    readers: Vec<AtomicUsize>,
    writers: Vec<AtomicUsize>,
    violations: AtomicUsize,
}

impl OccupancyTable {
    pub fn new(keys: Key) -> Arc<Self> {
        Arc::new(Self {
            readers: (0..keys).map(|_| AtomicUsize::new(0)).collect(),
            writers: (0..keys).map(|_| AtomicUsize::new(0)).collect(),
            violations: AtomicUsize::new(0),
        })
    }

    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }
}

/// Records overlapping execution on the same keys.
///
/// While running, each write key must have no other reader or writer and
/// each read-only key no writer. Both sides of an overlap see it.
#[derive(Debug, Clone)]
pub struct Occupant {
    table: Arc<OccupancyTable>,
    hold: Duration,
}

impl Occupant {
    pub fn new(table: Arc<OccupancyTable>, hold: Duration) -> Self {
        Self { table, hold }
    }
}

impl Program for Occupant {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        let writes: Vec<Key> = ctx.writeset().iter().copied().collect();
        let reads: Vec<Key> = ctx
            .readset()
            .iter()
            .copied()
            .filter(|k| !ctx.writeset().contains(k))
            .collect();
        let t = &self.table;

        for &k in &writes {
            t.writers[k as usize].fetch_add(1, Ordering::SeqCst);
        }
        for &k in &reads {
            t.readers[k as usize].fetch_add(1, Ordering::SeqCst);
        }

        let clash = writes.iter().any(|&k| {
            t.writers[k as usize].load(Ordering::SeqCst) > 1
                || t.readers[k as usize].load(Ordering::SeqCst) > 0
        }) || reads
            .iter()
            .any(|&k| t.writers[k as usize].load(Ordering::SeqCst) > 0);
        if clash {
            t.violations.fetch_add(1, Ordering::SeqCst);
        }

        std::thread::sleep(self.hold);

        for &k in &writes {
            t.writers[k as usize].fetch_sub(1, Ordering::SeqCst);
        }
        for &k in &reads {
            t.readers[k as usize].fetch_sub(1, Ordering::SeqCst);
        }

        ctx.commit();
        Ok(())
    }
}
