//! Error taxonomy for cell and handle operations.
//!
//! Contention is deliberately absent: lock contention is resolved by retry
//! inside the protocol, never surfaced to the caller as an error.

use core::fmt;

/// Error returned by [`MemoryCell`](crate::MemoryCell) and
/// [`CellHandle`](crate::CellHandle) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    /// A cell was constructed with capacity zero.
    InvalidCapacity,
    /// A position (or a position plus run length) falls past the end of the
    /// buffer. The access touched no memory.
    OutOfRange {
        /// The requested starting position.
        position: usize,
        /// The fixed capacity of the cell.
        capacity: usize,
    },
    /// An operation was invoked on an empty (detached) handle.
    InvalidHandle,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => write!(f, "cell capacity must be non-zero"),
            Self::OutOfRange { position, capacity } => {
                write!(f, "position {position} out of range for capacity {capacity}")
            }
            Self::InvalidHandle => write!(f, "operation on an empty handle"),
        }
    }
}

impl std::error::Error for CellError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CellError::OutOfRange { position: 9, capacity: 4 }.to_string(),
            "position 9 out of range for capacity 4"
        );
        assert_eq!(CellError::InvalidCapacity.to_string(), "cell capacity must be non-zero");
        assert_eq!(CellError::InvalidHandle.to_string(), "operation on an empty handle");
    }
}
