//! Core types for the lockstep engine
//!
//! This module defines the foundational types:
//! - Key: totally ordered record identifier
//! - Value: record payload
//! - TxnId: transaction timestamp, reassigned on every restart
//! - CcMode: the concurrency-control protocol an engine runs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Record identifier
///
/// Keys are totally ordered. Lock acquisition walks read and write sets in
/// ascending key order, so the ordering is load-bearing.
pub type Key = u64;

/// Record payload
pub type Value = u64;

/// Transaction identity and timestamp
///
/// Allocated from a single monotonically increasing counter. A restarted
/// transaction receives a brand-new id, so ids double as MVCC timestamps:
/// a larger id is logically later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// The id of the dummy writer that seeded every key at initialization
    pub const ZERO: TxnId = TxnId(0);

    /// Wrap a raw timestamp
    #[inline]
    pub const fn new(raw: u64) -> Self {
        TxnId(raw)
    }

    /// Raw timestamp value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

impl From<u64> for TxnId {
    fn from(raw: u64) -> Self {
        TxnId(raw)
    }
}

/// Concurrency-control protocol
///
/// Chosen once when an engine is built and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcMode {
    /// One transaction at a time on the control thread
    #[default]
    Serial,
    /// Two-phase locking with exclusive locks only
    LockingExclusiveOnly,
    /// Two-phase locking with shared and exclusive locks
    Locking,
    /// Optimistic concurrency control with serial validation
    Occ,
    /// Multi-version timestamp ordering
    Mvcc,
}

impl CcMode {
    /// All modes, in declaration order
    pub const ALL: [CcMode; 5] = [
        CcMode::Serial,
        CcMode::LockingExclusiveOnly,
        CcMode::Locking,
        CcMode::Occ,
        CcMode::Mvcc,
    ];

    /// Canonical lowercase name, as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            CcMode::Serial => "serial",
            CcMode::LockingExclusiveOnly => "locking_exclusive_only",
            CcMode::Locking => "locking",
            CcMode::Occ => "occ",
            CcMode::Mvcc => "mvcc",
        }
    }

    /// Whether this mode coordinates through a lock manager
    pub fn is_locking(&self) -> bool {
        matches!(self, CcMode::LockingExclusiveOnly | CcMode::Locking)
    }
}

impl fmt::Display for CcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CcMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CcMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "unknown concurrency mode '{}', expected one of serial, \
                     locking_exclusive_only, locking, occ, mvcc",
                    s
                ))
            })
    }
}
