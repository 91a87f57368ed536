//! Lock managers for deterministic two-phase locking
//!
//! Every key has a FIFO queue of lock requests. A request is granted when it
//! falls inside the queue's *holder prefix*:
//!
//! - exclusive-only: the front request alone
//! - shared/exclusive: a front exclusive request alone, otherwise the run of
//!   consecutive shared requests at the front
//!
//! A denied request stays queued and bumps its transaction's wait counter.
//! When a release moves a queued request into the holder prefix, the request
//! is granted and the counter drops by one; a transaction whose counter
//! reaches zero holds everything it asked for and is appended to the ready
//! set.
//!
//! # Ownership
//!
//! A lock manager is owned and mutated by the scheduler's control thread
//! only. It carries no internal synchronization.
//!
//! # Deadlock freedom
//!
//! Callers request keys in ascending order and either wait on a single key or
//! release everything and restart. No wait-for cycle can form, so there is
//! no deadlock detector.

use std::collections::VecDeque;

use lockstep_core::{Key, TxnId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// Mode of a lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Compatible with other shared requests
    Shared,
    /// Compatible with nothing
    Exclusive,
}

/// Who currently holds a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// Queue is empty
    Unlocked,
    /// Every transaction in the leading shared run
    Shared(SmallVec<[TxnId; 4]>),
    /// The single front holder
    Exclusive(TxnId),
}

impl LockStatus {
    /// Mode held, or `None` when unlocked
    pub fn mode(&self) -> Option<LockMode> {
        match self {
            LockStatus::Unlocked => None,
            LockStatus::Shared(_) => Some(LockMode::Shared),
            LockStatus::Exclusive(_) => Some(LockMode::Exclusive),
        }
    }

    /// Current holders
    pub fn owners(&self) -> &[TxnId] {
        match self {
            LockStatus::Unlocked => &[],
            LockStatus::Shared(owners) => owners,
            LockStatus::Exclusive(owner) => std::slice::from_ref(owner),
        }
    }
}

/// A queued lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    /// Requested mode
    pub mode: LockMode,
    /// Requesting transaction
    pub txn: TxnId,
    granted: bool,
}

impl LockRequest {
    /// Whether the request is currently held
    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

/// Lock manager interface used by the locking scheduler
pub trait LockManager: Send {
    /// Request an exclusive lock; `true` if granted immediately
    ///
    /// A denied request stays queued and increments `txn`'s wait counter.
    fn write_lock(&mut self, txn: TxnId, key: Key) -> bool;

    /// Request a shared lock; `true` if granted immediately
    fn read_lock(&mut self, txn: TxnId, key: Key) -> bool;

    /// Drop every request `txn` has on `key` and reset its wait counter
    ///
    /// Requests that become holders are granted; their transactions join
    /// the ready set once nothing else is outstanding.
    fn release(&mut self, txn: TxnId, key: Key);

    /// Current holders of `key`
    fn status(&self, key: Key) -> LockStatus;

    /// Next transaction that acquired all its locks while waiting
    fn pop_ready(&mut self) -> Option<TxnId>;

    /// Number of requests `txn` still waits on
    fn wait_count(&self, txn: TxnId) -> usize;

    /// Number of requests queued on `key`
    fn queue_len(&self, key: Key) -> usize;
}

/// Length of the holder prefix of a queue
type HolderPrefix = fn(&VecDeque<LockRequest>) -> usize;

fn exclusive_prefix(queue: &VecDeque<LockRequest>) -> usize {
    queue.len().min(1)
}

fn shared_prefix(queue: &VecDeque<LockRequest>) -> usize {
    match queue.front() {
        None => 0,
        Some(front) if front.mode == LockMode::Exclusive => 1,
        Some(_) => queue
            .iter()
            .take_while(|r| r.mode == LockMode::Shared)
            .count(),
    }
}

/// Queues, wait counters and ready set shared by both variants
#[derive(Debug, Default)]
struct LockTable {
    queues: FxHashMap<Key, VecDeque<LockRequest>>,
    waits: FxHashMap<TxnId, usize>,
    ready: VecDeque<TxnId>,
}

impl LockTable {
    fn request(&mut self, txn: TxnId, key: Key, mode: LockMode, holders: HolderPrefix) -> bool {
        let queue = self.queues.entry(key).or_default();
        queue.push_back(LockRequest {
            mode,
            txn,
            granted: false,
        });

        // The new request is last, so it holds iff the prefix covers the queue.
        let granted = holders(queue) == queue.len();
        if granted {
            if let Some(request) = queue.back_mut() {
                request.granted = true;
            }
        } else {
            *self.waits.entry(txn).or_insert(0) += 1;
            trace!(target: "lockstep::lock", %txn, key, ?mode, "lock request queued");
        }
        granted
    }

    fn release(&mut self, txn: TxnId, key: Key, holders: HolderPrefix) {
        self.waits.remove(&txn);

        let Some(queue) = self.queues.get_mut(&key) else {
            return;
        };
        queue.retain(|r| r.txn != txn);

        let prefix = holders(queue);
        for request in queue.iter_mut().take(prefix) {
            if request.granted {
                continue;
            }
            request.granted = true;
            // A missing counter was reset by an earlier release; the owner is
            // not waiting on us any more.
            if let Some(waits) = self.waits.get_mut(&request.txn) {
                *waits = waits.saturating_sub(1);
                if *waits == 0 {
                    self.waits.remove(&request.txn);
                    self.ready.push_back(request.txn);
                    trace!(target: "lockstep::lock", txn = %request.txn, key, "transaction ready");
                }
            }
        }

        if queue.is_empty() {
            self.queues.remove(&key);
        }
    }

    fn status(&self, key: Key, holders: HolderPrefix) -> LockStatus {
        let Some(queue) = self.queues.get(&key) else {
            return LockStatus::Unlocked;
        };
        match queue.front() {
            None => LockStatus::Unlocked,
            Some(front) if front.mode == LockMode::Exclusive => LockStatus::Exclusive(front.txn),
            Some(_) => LockStatus::Shared(
                queue
                    .iter()
                    .take(holders(queue))
                    .map(|r| r.txn)
                    .collect(),
            ),
        }
    }

    fn wait_count(&self, txn: TxnId) -> usize {
        self.waits.get(&txn).copied().unwrap_or(0)
    }

    fn queue_len(&self, key: Key) -> usize {
        self.queues.get(&key).map_or(0, VecDeque::len)
    }

    fn queue(&self, key: Key) -> Option<&VecDeque<LockRequest>> {
        self.queues.get(&key)
    }
}

/// Lock manager with exclusive locks only
///
/// Read locks are taken as exclusive locks.
#[derive(Debug, Default)]
pub struct ExclusiveLockManager {
    table: LockTable,
}

impl ExclusiveLockManager {
    /// Create an empty lock manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests queued on `key`, front first
    pub fn requests(&self, key: Key) -> Vec<LockRequest> {
        self.table
            .queue(key)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl LockManager for ExclusiveLockManager {
    fn write_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.table
            .request(txn, key, LockMode::Exclusive, exclusive_prefix)
    }

    fn read_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.write_lock(txn, key)
    }

    fn release(&mut self, txn: TxnId, key: Key) {
        self.table.release(txn, key, exclusive_prefix);
    }

    fn status(&self, key: Key) -> LockStatus {
        self.table.status(key, exclusive_prefix)
    }

    fn pop_ready(&mut self) -> Option<TxnId> {
        self.table.ready.pop_front()
    }

    fn wait_count(&self, txn: TxnId) -> usize {
        self.table.wait_count(txn)
    }

    fn queue_len(&self, key: Key) -> usize {
        self.table.queue_len(key)
    }
}

/// Lock manager with shared and exclusive locks
///
/// A shared request is granted iff no exclusive request is queued ahead of
/// it. An exclusive request is granted iff the queue was empty.
#[derive(Debug, Default)]
pub struct SharedLockManager {
    table: LockTable,
}

impl SharedLockManager {
    /// Create an empty lock manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests queued on `key`, front first
    pub fn requests(&self, key: Key) -> Vec<LockRequest> {
        self.table
            .queue(key)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl LockManager for SharedLockManager {
    fn write_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.table
            .request(txn, key, LockMode::Exclusive, shared_prefix)
    }

    fn read_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.table.request(txn, key, LockMode::Shared, shared_prefix)
    }

    fn release(&mut self, txn: TxnId, key: Key) {
        self.table.release(txn, key, shared_prefix);
    }

    fn status(&self, key: Key) -> LockStatus {
        self.table.status(key, shared_prefix)
    }

    fn pop_ready(&mut self) -> Option<TxnId> {
        self.table.ready.pop_front()
    }

    fn wait_count(&self, txn: TxnId) -> usize {
        self.table.wait_count(txn)
    }

    fn queue_len(&self, key: Key) -> usize {
        self.table.queue_len(key)
    }
}
