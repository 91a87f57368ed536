//! Transaction validation for OCC
//!
//! Validation runs serially on the scheduler's control thread, after a
//! transaction finished executing and before its writes are applied.
//!
//! Key rules:
//! - A transaction records the store clock before its first read
//! - Every key in readset ∪ writeset is checked
//! - A key written after that clock reading is a conflict: some other
//!   transaction committed underneath this one
//! - Only a commit decision is validated; an abort decision stands as is

use lockstep_core::traits::Storage;
use lockstep_core::{Key, Transaction, TxnStatus};

/// Types of conflicts that can occur during OCC validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A read key was overwritten after the transaction started
    StaleRead {
        /// The key that has a conflict
        key: Key,
        /// Store clock when the transaction started
        start: u64,
        /// Clock tick of the conflicting write
        written_at: u64,
    },

    /// A write key was overwritten after the transaction started
    StaleWrite {
        /// The key that has a conflict
        key: Key,
        /// Store clock when the transaction started
        start: u64,
        /// Clock tick of the conflicting write
        written_at: u64,
    },
}

impl ConflictType {
    /// Key the conflict was found on
    pub fn key(&self) -> Key {
        match self {
            ConflictType::StaleRead { key, .. } | ConflictType::StaleWrite { key, .. } => *key,
        }
    }
}

/// Result of transaction validation
///
/// Accumulates all conflicts found during validation.
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Check every key of the transaction against the store's write clock
pub fn validate_occ<S: Storage + ?Sized>(txn: &Transaction, store: &S) -> ValidationResult {
    let start = txn.occ_start();
    let mut result = ValidationResult::ok();

    for &key in txn.readset() {
        let written_at = store.timestamp(key);
        if written_at > start {
            result.conflicts.push(ConflictType::StaleRead {
                key,
                start,
                written_at,
            });
        }
    }

    for &key in txn.writeset() {
        let written_at = store.timestamp(key);
        if written_at > start {
            result.conflicts.push(ConflictType::StaleWrite {
                key,
                start,
                written_at,
            });
        }
    }

    result
}

/// Validate a finished transaction and record the verdict in its status
///
/// Only a `CompletedCommit` decision is validated; a conflict turns it into
/// `CompletedAbort`. Any other status is left for the caller to finalize.
///
/// Returns the validation result; an unvalidated transaction yields an
/// empty one.
pub fn validate_transaction<S: Storage + ?Sized>(
    txn: &mut Transaction,
    store: &S,
) -> ValidationResult {
    if txn.status() != TxnStatus::CompletedCommit {
        return ValidationResult::ok();
    }

    let result = validate_occ(txn, store);
    if !result.is_valid() {
        txn.set_status(TxnStatus::CompletedAbort);
    }
    result
}
