//! The versioned memory cell.
//!
//! [`MemoryCell`] owns a fixed-capacity buffer and coordinates readers and
//! writers with a seqlock: the version counter is odd while a write is in
//! flight and even while the buffer is quiescent. Readers copy first and
//! validate after; writers are serialized by a spinning admission gate.
//!
//! All shared state sits in one heap block so that handles can never
//! observe freed memory; the blocking-teardown contract is nevertheless
//! driven by the explicit live-handle latch, not by reference counting of
//! the allocation.

mod handle;

pub use handle::CellHandle;

use crate::error::CellError;
use crate::sync::{AdmissionGate, ReleaseLatch, SpinPolicy};
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{fence, AtomicUsize, Ordering};
use crossbeam_utils::{Backoff, CachePadded};
use std::sync::Arc;

/// Buffer plus protocol state, shared between a cell and its handles.
pub(crate) struct CellShared<T> {
    version: CachePadded<AtomicUsize>,
    gate: AdmissionGate,
    latch: ReleaseLatch,
    buffer: Box<[UnsafeCell<T>]>,
}

// Safety: element slots are written only under gate admission inside an odd
// version window, and readers discard any copy whose version re-check
// fails. `T: Copy` rules out drop logic and owned resources, so a torn
// copy that gets discarded is inert.
unsafe impl<T: Copy + Send> Send for CellShared<T> {}
unsafe impl<T: Copy + Send> Sync for CellShared<T> {}

impl<T: Copy> CellShared<T> {
    fn check_run(&self, position: usize, len: usize) -> Result<(), CellError> {
        let capacity = self.buffer.len();
        if len > capacity || position > capacity - len {
            return Err(CellError::OutOfRange { position, capacity });
        }
        Ok(())
    }

    /// Stores `values` at `position..position + values.len()` under a
    /// single version bump.
    pub(crate) fn write_run(&self, values: &[T], position: usize) -> Result<(), CellError> {
        self.check_run(position, values.len())?;

        let _admission = self.gate.acquire();

        // Odd: write in flight. The release fence keeps the element stores
        // from being reordered before the bump.
        self.version.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);

        for (offset, value) in values.iter().enumerate() {
            // Safety: in bounds per check_run; this thread holds the only
            // write admission, so no other store aliases the slot.
            unsafe { ptr::write_volatile(self.buffer[position + offset].get(), *value) };
        }

        // Even: quiescent again; publishes the stores to readers.
        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Copies `position..position + out.len()` into `out` within a single
    /// consistent version window.
    pub(crate) fn read_run(&self, position: usize, out: &mut [T]) -> Result<(), CellError> {
        self.check_run(position, out.len())?;

        let backoff = Backoff::new();
        loop {
            let before = self.version.load(Ordering::Acquire);
            if before & 1 == 1 {
                backoff.snooze();
                continue;
            }

            for (offset, slot) in out.iter_mut().enumerate() {
                // Safety: in bounds per check_run. A concurrent write may
                // race this load; the version re-check below discards any
                // such torn copy before it escapes.
                *slot = unsafe { ptr::read_volatile(self.buffer[position + offset].get()) };
            }

            // Order the element loads before the version re-check.
            fence(Ordering::Acquire);
            if self.version.load(Ordering::Relaxed) == before {
                return Ok(());
            }
            backoff.snooze();
        }
    }
}

impl<T> CellShared<T> {
    pub(crate) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn latch(&self) -> &ReleaseLatch {
        &self.latch
    }
}

/// A fixed-capacity buffer with lock-free optimistic reads, serialized
/// writes, and a teardown that waits for all outstanding handles.
///
/// The element type must be `Copy` (duplication cannot run user logic or
/// claim resources, which the torn-read safety argument requires) and
/// `Default` (supplies the initial buffer contents).
pub struct MemoryCell<T> {
    shared: Arc<CellShared<T>>,
}

impl<T: Copy + Default> MemoryCell<T> {
    /// Creates a cell holding `capacity` default-valued elements.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CellError> {
        Self::with_policy(capacity, SpinPolicy::default())
    }

    /// Creates a cell with an explicit writer-admission spin policy.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_policy(capacity: usize, policy: SpinPolicy) -> Result<Self, CellError> {
        if capacity == 0 {
            return Err(CellError::InvalidCapacity);
        }
        let buffer = (0..capacity).map(|_| UnsafeCell::new(T::default())).collect();
        Ok(Self {
            shared: Arc::new(CellShared {
                version: CachePadded::new(AtomicUsize::new(0)),
                gate: AdmissionGate::new(policy),
                latch: ReleaseLatch::new(),
                buffer,
            }),
        })
    }

    /// The fixed capacity set at construction.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// The number of outstanding bound handles.
    pub fn live_handles(&self) -> usize {
        self.shared.latch.count()
    }

    /// Issues a new handle to this cell, incrementing the live-handle
    /// count. The cell's drop will block until the handle is released.
    pub fn handle(&self) -> CellHandle<T> {
        self.shared.latch.add();
        CellHandle::bound(Arc::clone(&self.shared))
    }

    /// Reads the element at `position` without blocking.
    ///
    /// Retries while a write is in flight or a torn copy is detected; the
    /// returned value is always one that some completed write stored.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::OutOfRange`] if `position >= capacity`.
    pub fn read(&self, position: usize) -> Result<T, CellError> {
        let mut value = [T::default()];
        self.shared.read_run(position, &mut value)?;
        Ok(value[0])
    }

    /// Writes `value` at `position`, serialized against other writers.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::OutOfRange`] if `position >= capacity`.
    pub fn write(&self, value: T, position: usize) -> Result<(), CellError> {
        self.shared.write_run(&[value], position)
    }

    /// Reads `count` elements starting at `position` as one atomic batch:
    /// the result never mixes elements from two write generations.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::OutOfRange`] if `position + count > capacity`.
    pub fn read_array(&self, position: usize, count: usize) -> Result<Vec<T>, CellError> {
        let mut out = vec![T::default(); count];
        self.shared.read_run(position, &mut out)?;
        Ok(out)
    }

    /// Like [`read_array`](Self::read_array), but copies into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::OutOfRange`] if `position + out.len() > capacity`.
    pub fn read_into(&self, position: usize, out: &mut [T]) -> Result<(), CellError> {
        self.shared.read_run(position, out)
    }

    /// Writes all of `values` starting at `position` under one version
    /// bump, so readers observe either none or all of the batch.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::OutOfRange`] if `position + values.len() > capacity`.
    pub fn write_array(&self, values: &[T], position: usize) -> Result<(), CellError> {
        self.shared.write_run(values, position)
    }
}

impl<T> Drop for MemoryCell<T> {
    /// Parks until every handle has been dropped or detached.
    ///
    /// Leaking a handle stalls this drop forever; releasing all handles
    /// before (or concurrently with) the cell going out of scope is a
    /// documented precondition of correct use.
    fn drop(&mut self) {
        self.shared.latch.wait_zero();
    }
}

impl<T> core::fmt::Debug for MemoryCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryCell")
            .field("capacity", &self.shared.capacity())
            .field("live_handles", &self.shared.latch.count())
            .finish_non_exhaustive()
    }
}
