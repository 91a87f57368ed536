//! Error types for the lockstep engine
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Lock conflicts and validation failures are not errors: they are routed
//! through the restart path and never reach a caller.

use crate::txn::TxnStatus;
use crate::types::{Key, TxnId};
use std::io;
use thiserror::Error;

/// Result type alias for lockstep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the lockstep engine
#[derive(Debug, Error)]
pub enum Error {
    /// Key lies outside the initialized key space
    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    /// No version of the key is visible at the requested timestamp
    #[error("No version of key {key} visible at timestamp {timestamp}")]
    VersionNotFound {
        /// Key that was read
        key: Key,
        /// Reader timestamp
        timestamp: TxnId,
    },

    /// A transaction program returned without deciding commit or abort
    #[error("Completed transaction {txn} has invalid status {status:?}")]
    InvalidStatus {
        /// Offending transaction
        txn: TxnId,
        /// Status observed after execution
        status: TxnStatus,
    },

    /// A program buffered a write for an undeclared key
    #[error("Transaction {txn} wrote key {key} outside its writeset")]
    NotInWriteset {
        /// Offending transaction
        txn: TxnId,
        /// Undeclared key
        key: Key,
    },

    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (config file access)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine no longer accepts work
    #[error("Engine has been shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_key_not_found() {
        let err = Error::KeyNotFound(17);
        assert_eq!(err.to_string(), "Key not found: 17");
    }

    #[test]
    fn test_error_display_version_not_found() {
        let err = Error::VersionNotFound {
            key: 3,
            timestamp: TxnId::new(9),
        };
        let msg = err.to_string();
        assert!(msg.contains("key 3"));
        assert!(msg.contains("txn#9"));
    }

    #[test]
    fn test_error_display_invalid_status() {
        let err = Error::InvalidStatus {
            txn: TxnId::new(5),
            status: TxnStatus::Incomplete,
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid status"));
        assert!(msg.contains("Incomplete"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::VersionNotFound {
            key: 1,
            timestamp: TxnId::new(2),
        };
        match err {
            Error::VersionNotFound { key, timestamp } => {
                assert_eq!(key, 1);
                assert_eq!(timestamp, TxnId::new(2));
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
