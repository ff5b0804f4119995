//! # `seqcell` - Versioned Concurrent Memory Cell
//!
//! A fixed-capacity typed buffer that supports many concurrent readers and
//! serialized writers without putting readers behind a mutex, plus a counted
//! handle type that defers teardown of the buffer until every outstanding
//! handle has been released.
//!
//! ## Protocol
//!
//! Writers bump a version counter to an odd value before mutating the buffer
//! and back to an even value after, so the counter encodes "write in flight"
//! (odd) versus "quiescent" (even). Readers copy optimistically and re-check
//! the version before trusting the copy; a mismatch means the copy may be
//! torn and is retried. This is the classic seqlock pattern:
//!
//! - **Readers never block.** Worst case is retrying under sustained write
//!   pressure; there is no progress guarantee against an adversarial writer.
//! - **Writers are serialized** by a compare-and-swap admission gate with a
//!   configurable spin/yield policy. The gate is not fair: no ordering is
//!   guaranteed among contending writers.
//! - **Batched operations are atomic.** A batched read never observes a mix
//!   of elements from two different write generations.
//!
//! ## Safety Guarantees
//!
//! - **Torn-read freedom**: element accesses themselves are not atomic; a
//!   read is valid only because the version re-check discards any copy that
//!   overlapped a write. This argument requires `T: Copy` — duplicating an
//!   element must not run user logic or claim resources.
//! - **Lifetime safety**: a [`CellHandle`] keeps the live-handle count above
//!   zero, and [`MemoryCell`] teardown parks until that count reaches zero.
//!   An emptied handle is an explicit, checked state ([`CellError::InvalidHandle`]),
//!   never an undefined dereference.
//! - **Happens-before**: a reader that observes a given even version sees
//!   every write published before that version, via release/acquire fencing
//!   on the counter.
//!
//! ## Liveness Caveats
//!
//! Dropping a [`MemoryCell`] blocks the dropping thread until all handles
//! are gone. Leaking a handle therefore stalls teardown forever; that is a
//! violated precondition of correct use, not a condition the cell detects.
//!
//! ## Example
//!
//! ```rust
//! use seqcell::MemoryCell;
//!
//! let cell = MemoryCell::<u64>::new(4)?;
//! let handle = cell.handle();
//!
//! handle.write(7, 2)?;
//! assert_eq!(handle.read(2)?, 7);
//!
//! handle.write_array(&[1, 2, 3], 0)?;
//! assert_eq!(handle.read_array(0, 3)?, vec![1, 2, 3]);
//!
//! drop(handle);
//! // The cell drops without blocking: no handles remain.
//! # Ok::<(), seqcell::CellError>(())
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod error;
pub mod sync;

pub use cell::{CellHandle, MemoryCell};
pub use error::CellError;
pub use sync::{AdmissionGate, ReleaseLatch, SpinPolicy};

// Compile-time assertions for memory layout claims.
const _: () = {
    use core::mem;

    // The cell and its handle stay pointer-sized: one shared allocation,
    // with the handle's empty state carried in the pointer niche.
    assert!(mem::size_of::<MemoryCell<u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<CellHandle<u64>>() == mem::size_of::<usize>());

    // The admission gate is a word-sized lock plus its spin policy.
    assert!(mem::size_of::<AdmissionGate>() <= mem::size_of::<usize>() * 2);
};
