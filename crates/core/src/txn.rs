//! Transactions and the program contract
//!
//! A `Transaction` couples a program with the keys it declares up front
//! (`readset`, `writeset`) and the buffers the engine fills and drains around
//! the program's execution.
//!
//! # Lifecycle
//!
//! ```text
//! created by client
//!   -> admitted (fresh unique id)
//!   -> executed: reads buffered, program runs, status INCOMPLETE -> COMPLETED_C | COMPLETED_A
//!   -> COMMITTED | ABORTED, handed back to the client
//! ```
//!
//! A restart clears the buffers, resets the status and hands the transaction
//! back to admission for a new id. Readset, writeset and program survive.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Key, TxnId, Value};

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Incomplete` → `CompletedCommit` | `CompletedAbort` (program logic or validation)
/// - `CompletedCommit` → `Committed` (scheduler)
/// - `CompletedAbort` → `Aborted` (scheduler)
///
/// Any other status after execution is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnStatus {
    /// Not yet executed, or reset by a restart
    Incomplete,
    /// Executed and ready to commit
    CompletedCommit,
    /// Executed and ready to abort
    CompletedAbort,
    /// Writes applied; terminal
    Committed,
    /// Discarded by program decision; terminal
    Aborted,
}

impl TxnStatus {
    /// Whether the engine is finished with the transaction
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxnStatus::Committed | TxnStatus::Aborted)
    }
}

/// Business logic of a transaction
///
/// `run` reads from the buffered reads, writes into the buffered writes and
/// must leave the status at `CompletedCommit` or `CompletedAbort` by calling
/// [`TxnContext::commit`] or [`TxnContext::abort`]. The engine never looks
/// inside a program beyond this contract.
///
/// An `Err` from `run` marks the transaction `CompletedAbort`.
pub trait Program: Send + fmt::Debug {
    /// Execute the program logic against the buffered state
    fn run(&mut self, ctx: &mut TxnContext<'_>) -> Result<()>;
}

/// The view of a transaction a program executes against
pub struct TxnContext<'a> {
    id: TxnId,
    readset: &'a BTreeSet<Key>,
    writeset: &'a BTreeSet<Key>,
    reads: &'a BTreeMap<Key, Value>,
    writes: &'a mut BTreeMap<Key, Value>,
    status: &'a mut TxnStatus,
}

impl<'a> TxnContext<'a> {
    /// Current id (timestamp) of the executing transaction
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Declared read keys
    pub fn readset(&self) -> &BTreeSet<Key> {
        self.readset
    }

    /// Declared write keys
    pub fn writeset(&self) -> &BTreeSet<Key> {
        self.writeset
    }

    /// Buffered value for `key`, if the engine found one
    ///
    /// Keys of both the readset and the writeset are buffered.
    pub fn read(&self, key: Key) -> Option<Value> {
        self.reads.get(&key).copied()
    }

    /// Every buffered read
    pub fn reads(&self) -> &BTreeMap<Key, Value> {
        self.reads
    }

    /// Buffer a write; applied only if the transaction commits
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInWriteset` if `key` was not declared for writing.
    pub fn write(&mut self, key: Key, value: Value) -> Result<()> {
        if !self.writeset.contains(&key) {
            return Err(Error::NotInWriteset { txn: self.id, key });
        }
        self.writes.insert(key, value);
        Ok(())
    }

    /// Decide to commit
    pub fn commit(&mut self) {
        *self.status = TxnStatus::CompletedCommit;
    }

    /// Decide to abort
    pub fn abort(&mut self) {
        *self.status = TxnStatus::CompletedAbort;
    }

    /// Status as currently set by the program
    pub fn status(&self) -> TxnStatus {
        *self.status
    }
}

/// A transaction: declared keys, buffers, status, and its program
#[derive(Debug)]
pub struct Transaction {
    unique_id: TxnId,
    readset: BTreeSet<Key>,
    writeset: BTreeSet<Key>,
    reads: BTreeMap<Key, Value>,
    writes: BTreeMap<Key, Value>,
    status: TxnStatus,
    /// Storage clock reading taken when OCC execution began
    occ_start: u64,
    restarts: u32,
    program: Box<dyn Program>,
}

impl Transaction {
    /// Create a transaction over the given keys
    ///
    /// The id stays `TxnId::ZERO` until the engine admits it.
    pub fn new<R, W, P>(readset: R, writeset: W, program: P) -> Self
    where
        R: IntoIterator<Item = Key>,
        W: IntoIterator<Item = Key>,
        P: Program + 'static,
    {
        Self {
            unique_id: TxnId::ZERO,
            readset: readset.into_iter().collect(),
            writeset: writeset.into_iter().collect(),
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            status: TxnStatus::Incomplete,
            occ_start: 0,
            restarts: 0,
            program: Box::new(program),
        }
    }

    /// Current id (timestamp)
    #[inline]
    pub fn id(&self) -> TxnId {
        self.unique_id
    }

    /// Assign a new id; only admission does this
    pub fn assign_id(&mut self, id: TxnId) {
        self.unique_id = id;
    }

    /// Declared read keys, ascending
    pub fn readset(&self) -> &BTreeSet<Key> {
        &self.readset
    }

    /// Declared write keys, ascending
    pub fn writeset(&self) -> &BTreeSet<Key> {
        &self.writeset
    }

    /// Readset keys followed by writeset keys, each ascending
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.readset.iter().chain(self.writeset.iter()).copied()
    }

    /// Number of distinct keys touched: `|readset ∪ writeset|`
    pub fn key_count(&self) -> usize {
        self.readset.union(&self.writeset).count()
    }

    /// Buffered reads
    pub fn reads(&self) -> &BTreeMap<Key, Value> {
        &self.reads
    }

    /// Buffered writes
    pub fn writes(&self) -> &BTreeMap<Key, Value> {
        &self.writes
    }

    /// Record the value observed for `key`
    pub fn buffer_read(&mut self, key: Key, value: Value) {
        self.reads.insert(key, value);
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> TxnStatus {
        self.status
    }

    /// Overwrite the status (validation and finalization)
    pub fn set_status(&mut self, status: TxnStatus) {
        self.status = status;
    }

    /// Storage clock reading taken at OCC start
    pub fn occ_start(&self) -> u64 {
        self.occ_start
    }

    /// Record the OCC start reading
    pub fn set_occ_start(&mut self, clock: u64) {
        self.occ_start = clock;
    }

    /// How many times the transaction has been restarted
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Run the program against the buffered state
    ///
    /// A program error is treated as an abort decision.
    pub fn run(&mut self) -> Result<()> {
        let mut ctx = TxnContext {
            id: self.unique_id,
            readset: &self.readset,
            writeset: &self.writeset,
            reads: &self.reads,
            writes: &mut self.writes,
            status: &mut self.status,
        };
        let outcome = self.program.run(&mut ctx);
        if outcome.is_err() {
            self.status = TxnStatus::CompletedAbort;
        }
        outcome
    }

    /// Drop buffered reads and writes and reset the status for re-execution
    pub fn cleanup(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.status = TxnStatus::Incomplete;
        self.occ_start = 0;
        self.restarts += 1;
    }

    /// Map a post-execution status to its terminal status
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStatus` unless the status is `CompletedCommit`
    /// or `CompletedAbort`.
    pub fn terminal_status(&self) -> Result<TxnStatus> {
        match self.status {
            TxnStatus::CompletedCommit => Ok(TxnStatus::Committed),
            TxnStatus::CompletedAbort => Ok(TxnStatus::Aborted),
            status => Err(Error::InvalidStatus {
                txn: self.unique_id,
                status,
            }),
        }
    }
}
