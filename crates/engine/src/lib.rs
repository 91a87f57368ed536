//! Transaction engine for lockstep
//!
//! This crate orchestrates the lower layers:
//! - TxnProcessor: the public facade (submit, poll/recv results, shutdown)
//! - Per-protocol schedulers driven by one control thread
//! - WorkerPool: fixed threads executing transaction bodies
//! - EngineConfig: `lockstep.toml` configuration
//! - EngineStats: commit/abort/restart counters
//!
//! The engine is the only component that knows about:
//! - Protocol dispatch (which store, which lock manager)
//! - The restart path shared by every protocol

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod executor;
pub mod pool;
pub mod processor;
mod queues;
mod scheduler;
pub mod stats;

pub use config::EngineConfig;
pub use pool::{PoolStats, WorkerPool};
pub use processor::TxnProcessor;
pub use stats::EngineStats;
