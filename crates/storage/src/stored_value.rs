//! Storage-layer value wrapper
//!
//! The unversioned store keeps exactly one value per key. `StoredValue`
//! pairs it with who wrote it and when, which is what OCC validation
//! compares against.

use lockstep_core::{TxnId, Value};

/// A stored value with its write stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredValue {
    value: Value,
    writer: TxnId,
    written_at: u64,
}

impl StoredValue {
    /// Create a stored value
    pub fn new(value: Value, writer: TxnId, written_at: u64) -> Self {
        StoredValue {
            value,
            writer,
            written_at,
        }
    }

    /// Value seeded at initialization: clock 0, dummy writer
    pub fn initial(value: Value) -> Self {
        Self::new(value, TxnId::ZERO, 0)
    }

    /// Get the value
    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    /// Id of the transaction that wrote the value
    #[inline]
    pub fn writer(&self) -> TxnId {
        self.writer
    }

    /// Clock tick of the write
    #[inline]
    pub fn written_at(&self) -> u64 {
        self.written_at
    }
}
