//! Synchronization primitives backing the memory cell.
//!
//! Two small building blocks with disjoint jobs: [`AdmissionGate`] grants
//! exclusive write admission by spinning (never parking), and
//! [`ReleaseLatch`] counts live references and lets one thread park until
//! the count reaches zero. Neither protects the buffer data itself; that is
//! the version counter's job in [`crate::cell`].

pub mod gate;
pub mod latch;

pub use gate::{AdmissionGate, AdmissionGuard, SpinPolicy};
pub use latch::ReleaseLatch;
