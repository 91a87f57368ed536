//! Core types and traits for lockstep
//!
//! This crate defines the foundational types used throughout the system:
//! - Key, Value: record identifiers and payloads
//! - TxnId: transaction timestamp
//! - CcMode: concurrency-control protocol selector
//! - Transaction, TxnStatus, Program, TxnContext: the transaction contract
//! - Stock programs: Noop, Put, Expect, ReadModifyWrite
//! - Error: Error type hierarchy
//! - Traits: Storage (unversioned store)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod program;
pub mod traits;
pub mod txn;
pub mod types;

pub use error::{Error, Result};
pub use program::{Expect, Noop, Put, ReadModifyWrite};
pub use traits::Storage;
pub use txn::{Program, Transaction, TxnContext, TxnStatus};
pub use types::{CcMode, Key, TxnId, Value};
