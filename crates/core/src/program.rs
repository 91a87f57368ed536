//! Stock transaction programs
//!
//! Small programs covering the common shapes of benchmark and test
//! workloads. Anything else implements [`Program`] directly.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::txn::{Program, TxnContext};
use crate::types::{Key, Value};

/// Commits without touching anything
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Program for Noop {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        ctx.commit();
        Ok(())
    }
}

/// Writes a fixed set of values, then commits
#[derive(Debug, Clone, Default)]
pub struct Put {
    values: BTreeMap<Key, Value>,
}

impl Put {
    /// Program writing every `(key, value)` pair
    pub fn new(values: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl Program for Put {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        for (&key, &value) in &self.values {
            ctx.write(key, value)?;
        }
        ctx.commit();
        Ok(())
    }
}

/// Commits iff every expected key was read with the expected value
#[derive(Debug, Clone, Default)]
pub struct Expect {
    expected: BTreeMap<Key, Value>,
}

impl Expect {
    /// Program checking every `(key, value)` pair
    pub fn new(expected: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Self {
            expected: expected.into_iter().collect(),
        }
    }
}

impl Program for Expect {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        let matches = self
            .expected
            .iter()
            .all(|(&key, &value)| ctx.read(key) == Some(value));
        if matches {
            ctx.commit();
        } else {
            ctx.abort();
        }
        Ok(())
    }
}

/// Increments every writeset key by one
///
/// A key with no buffered read counts as 0. `work` keeps the program busy
/// for a fixed time to simulate expensive logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadModifyWrite {
    work: Duration,
}

impl ReadModifyWrite {
    /// Program with no simulated work
    pub fn new() -> Self {
        Self::default()
    }

    /// Program that spins for `work` before committing
    pub fn with_work(work: Duration) -> Self {
        Self { work }
    }
}

impl Program for ReadModifyWrite {
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()> {
        let keys: Vec<Key> = ctx.writeset().iter().copied().collect();
        for key in keys {
            let next = ctx.read(key).unwrap_or(0).wrapping_add(1);
            ctx.write(key, next)?;
        }

        if !self.work.is_zero() {
            let start = Instant::now();
            while start.elapsed() < self.work {
                std::hint::spin_loop();
            }
        }

        ctx.commit();
        Ok(())
    }
}
