//! Transaction processor: the engine's public facade
//!
//! `TxnProcessor` owns the store, the worker pool and one control thread
//! (`lockstep-scheduler`) that runs the configured protocol:
//!
//! ```text
//! loop until shutdown:
//!     handle every completed transaction
//!     wait (bounded by idle_wait) for a request or a completion
//! ```
//!
//! Clients submit from any thread and collect finished transactions with
//! [`TxnProcessor::poll_result`] or [`TxnProcessor::recv_result`].
//!
//! # Example
//!
//! ```no_run
//! use lockstep_core::{CcMode, ReadModifyWrite, Transaction};
//! use lockstep_engine::{EngineConfig, TxnProcessor};
//! use std::time::Duration;
//!
//! let processor = TxnProcessor::new(EngineConfig::for_mode(CcMode::Occ))?;
//! processor.submit(Transaction::new([1, 2], [3], ReadModifyWrite::new()))?;
//! let done = processor.recv_result(Duration::from_secs(1));
//! assert!(done.is_some());
//! # Ok::<(), lockstep_core::Error>(())
//! ```

use crossbeam_channel::{select, Receiver};
use lockstep_core::{CcMode, Error, Key, Result, Storage, Transaction, TxnId, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::pool::WorkerPool;
use crate::queues::TxnQueues;
use crate::scheduler::{self, Backend, Scheduler, SchedulerContext};
use crate::stats::EngineStats;

/// Concurrency-control engine running one protocol
pub struct TxnProcessor {
    mode: CcMode,
    backend: Backend,
    queues: Arc<TxnQueues>,
    results: Receiver<Transaction>,
    pool: Arc<WorkerPool>,
    shutdown: Arc<AtomicBool>,
    control: Mutex<Option<JoinHandle<()>>>,
}

impl TxnProcessor {
    /// Seed the store, start the workers and the control thread
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the config fails validation and
    /// `Error::Io` if a thread cannot be spawned.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let (queues, receivers) = TxnQueues::new();
        let queues = Arc::new(queues);
        let pool = Arc::new(WorkerPool::new(config.worker_threads)?);
        let ctx = SchedulerContext {
            pool: Arc::clone(&pool),
            queues: Arc::clone(&queues),
        };
        let (backend, scheduler) = scheduler::build(config.mode, config.key_space, ctx);

        let shutdown = Arc::new(AtomicBool::new(false));
        let control = {
            let shutdown = Arc::clone(&shutdown);
            let requests = receivers.requests;
            let completed = receivers.completed;
            let idle_wait = config.idle_wait();
            std::thread::Builder::new()
                .name("lockstep-scheduler".to_string())
                .spawn(move || control_loop(scheduler, requests, completed, &shutdown, idle_wait))
        };
        let control = match control {
            Ok(handle) => handle,
            Err(e) => {
                pool.shutdown();
                return Err(Error::Io(e));
            }
        };

        info!(
            target: "lockstep::engine",
            mode = %config.mode,
            workers = config.worker_threads,
            key_space = config.key_space,
            "engine started"
        );

        Ok(Self {
            mode: config.mode,
            backend,
            queues,
            results: receivers.results,
            pool,
            shutdown,
            control: Mutex::new(Some(control)),
        })
    }

    /// Protocol this engine runs
    pub fn mode(&self) -> CcMode {
        self.mode
    }

    /// Admit a transaction; returns the id it was assigned
    ///
    /// Never blocks on the engine. The id may change if the transaction is
    /// restarted; the finished transaction carries its final id.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShutDown` once the engine has been shut down.
    pub fn submit(&self, txn: Transaction) -> Result<TxnId> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShutDown);
        }
        self.queues.submit(txn)
    }

    /// Next finished transaction, if one is waiting
    pub fn poll_result(&self) -> Option<Transaction> {
        self.results.try_recv().ok()
    }

    /// Next finished transaction, waiting up to `timeout`
    pub fn recv_result(&self, timeout: Duration) -> Option<Transaction> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Latest committed value of `key`
    ///
    /// The stored value for the unversioned protocols, the newest version
    /// under MVCC.
    pub fn read_committed(&self, key: Key) -> Option<Value> {
        match &self.backend {
            Backend::Unversioned(store) => store.read(key),
            Backend::Versioned(versions) => versions.latest_value(key),
        }
    }

    /// Counter and pool snapshot
    pub fn stats(&self) -> EngineStats {
        self.queues.counters().snapshot(self.pool.stats())
    }

    /// Stop the control thread, then join the workers
    ///
    /// Transactions still in flight are dropped. Calling this more than
    /// once is harmless.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let handle = self.control.lock().take();
        let Some(handle) = handle else {
            return;
        };
        let _ = handle.join();
        self.pool.shutdown();

        let stats = self.stats();
        info!(
            target: "lockstep::engine",
            mode = %self.mode,
            committed = stats.committed,
            aborted = stats.aborted,
            restarted = stats.restarted,
            "engine stopped"
        );
    }
}

impl Drop for TxnProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TxnProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnProcessor")
            .field("mode", &self.mode)
            .field("stats", &self.stats())
            .finish()
    }
}

fn control_loop(
    mut scheduler: Box<dyn Scheduler>,
    requests: Receiver<Transaction>,
    completed: Receiver<Transaction>,
    shutdown: &AtomicBool,
    idle_wait: Duration,
) {
    debug!(target: "lockstep::scheduler", "control thread started");
    while !shutdown.load(Ordering::Acquire) {
        // Completions first: they free locks and produce results
        while let Ok(txn) = completed.try_recv() {
            scheduler.complete(txn);
        }

        let disconnected = select! {
            recv(requests) -> msg => match msg {
                Ok(txn) => {
                    scheduler.admit(txn);
                    false
                }
                Err(_) => true,
            },
            recv(completed) -> msg => match msg {
                Ok(txn) => {
                    scheduler.complete(txn);
                    false
                }
                Err(_) => true,
            },
            default(idle_wait) => false,
        };
        if disconnected {
            break;
        }
    }
    debug!(target: "lockstep::scheduler", "control thread stopped");
}
