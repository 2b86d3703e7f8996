//! # Memory Error Types
//!
//! Every condition the memory core can detect. Most of them are fatal at the
//! point of detection; the `try_*` entry points hand them back as values so
//! callers (and tests) can observe them without tearing the process down.

use std::fmt;

use thiserror::Error;

/// Kind of an instrumented allocation.
///
/// Objects and arrays are tracked in separate ledgers so that releasing
/// through the wrong path is caught.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AllocKind {
    /// Single-object allocation.
    Object = 0,
    /// Array allocation.
    Array = 1,
}

impl AllocKind {
    /// Both kinds, in ledger order.
    pub const ALL: [Self; 2] = [Self::Object, Self::Array];

    /// Ledger slot of this kind.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The other kind.
    #[inline]
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Object => Self::Array,
            Self::Array => Self::Object,
        }
    }
}

impl fmt::Display for AllocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Array => f.write_str("array"),
        }
    }
}

/// Errors that can occur in the memory core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A requested capacity does not fit in the address space or index range.
    #[error("capacity overflow: requested {requested}")]
    CapacityOverflow {
        /// The offending request.
        requested: usize,
    },

    /// The system allocator refused a request.
    #[error("out of memory: failed to allocate {size} B ({kind})")]
    OutOfMemory {
        /// Payload bytes requested.
        size: usize,
        /// Allocation kind.
        kind: AllocKind,
    },

    /// Memory was released through the path of the other allocation kind.
    #[error("{allocated_as} -> {released_as} mismatch for block at {address:#x} of size {size} B")]
    KindMismatch {
        /// Payload address.
        address: usize,
        /// Recorded payload size.
        size: usize,
        /// Kind the block was allocated as.
        allocated_as: AllocKind,
        /// Kind the release was attempted as.
        released_as: AllocKind,
    },

    /// Released memory was never handed out by the tracker (or was already released).
    #[error("releasing unregistered {kind} block at {address:#x} of size {size} B")]
    Unregistered {
        /// Payload address.
        address: usize,
        /// Size claimed by the caller.
        size: usize,
        /// Kind the release was attempted as.
        kind: AllocKind,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(String),
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_other() {
        assert_eq!(AllocKind::Object.other(), AllocKind::Array);
        assert_eq!(AllocKind::Array.other(), AllocKind::Object);
        assert_eq!(AllocKind::Array.index(), 1);
    }

    #[test]
    fn test_mismatch_message() {
        let err = MemoryError::KindMismatch {
            address: 0x1000,
            size: 32,
            allocated_as: AllocKind::Array,
            released_as: AllocKind::Object,
        };
        assert_eq!(
            err.to_string(),
            "array -> object mismatch for block at 0x1000 of size 32 B"
        );
    }
}
