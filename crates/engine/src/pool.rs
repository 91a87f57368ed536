//! Worker pool executing transaction bodies.
//!
//! A fixed set of threads pulls boxed tasks from one FIFO queue. The control
//! thread never waits on a worker: `submit` only enqueues and notifies.

use lockstep_core::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// Pool metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Total number of tasks completed since pool creation.
    pub tasks_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

type Task = Box<dyn FnOnce() + Send>;

struct PoolInner {
    queue: Mutex<VecDeque<Task>>,
    work_ready: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    tasks_completed: AtomicU64,
}

/// Fixed-size FIFO thread pool.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Create a pool with the given number of worker threads.
    ///
    /// Workers are named `lockstep-worker-0`, `lockstep-worker-1`, etc.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a thread cannot be spawned. Workers spawned
    /// before the failure are shut down again.
    pub fn new(num_threads: usize) -> Result<Self> {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            tasks_completed: AtomicU64::new(0),
        });

        let pool = Self {
            inner,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
        };

        for i in 0..num_threads {
            let inner = Arc::clone(&pool.inner);
            let spawned = std::thread::Builder::new()
                .name(format!("lockstep-worker-{}", i))
                .spawn(move || worker_loop(&inner));
            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(Error::Io(e));
                }
            }
        }

        debug!(target: "lockstep::pool", workers = num_threads, "worker pool started");
        Ok(pool)
    }

    /// Queue a task for execution.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShutDown` if the pool has been shut down; the task is
    /// dropped without running.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<()> {
        // Workers are joined after shutdown; the task would never run
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShutDown);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Signal workers to exit and join all threads.
    ///
    /// Workers finish the remaining queued tasks before exiting.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Holding the queue lock while notifying means a worker is either
        // already waiting or will observe the flag before it waits.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active_tasks: self.inner.active_tasks.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Decrements `active_tasks` on drop, including when the task panicked.
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        self.inner.active_tasks.fetch_sub(1, Ordering::Release);
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break task;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            error!(
                target: "lockstep::pool",
                "worker task panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
