//! Cross-Protocol Integration Tests
//!
//! One module per concurrency-control protocol, each exercising the engine
//! end to end through `TxnProcessor`.

#[path = "../common/mod.rs"]
mod common;

mod locking;
mod mvcc;
mod occ;
mod serial;
