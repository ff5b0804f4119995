//! Counted handles onto a [`MemoryCell`](crate::MemoryCell).
//!
//! A handle is either bound to a cell or empty. Binding is what keeps the
//! cell's teardown parked; every bound handle holds exactly one increment
//! of the live-handle count and returns it on drop or detach. Operations
//! on an empty handle are a reported error, never an unchecked dereference.

use super::CellShared;
use crate::error::CellError;
use std::sync::Arc;

/// A cloneable reference to a [`MemoryCell`](crate::MemoryCell) that
/// forwards reads and writes and participates in the live-handle count.
///
/// Cloning a bound handle yields an independent handle with identical
/// access. The empty state is explicit: [`CellHandle::default`] creates
/// one, [`detach`](Self::detach) or `std::mem::take` produces one, and
/// every operation on it fails with [`CellError::InvalidHandle`].
/// Moved-from bindings are already unusable at compile time, so the empty
/// state is only ever reached deliberately.
pub struct CellHandle<T> {
    shared: Option<Arc<CellShared<T>>>,
}

impl<T> CellHandle<T> {
    /// Binds a handle whose latch increment the caller has already taken.
    pub(super) fn bound(shared: Arc<CellShared<T>>) -> Self {
        Self { shared: Some(shared) }
    }

    /// Whether this handle currently references a cell.
    pub fn is_bound(&self) -> bool {
        self.shared.is_some()
    }

    /// Releases this handle's reference to the cell, waking a teardown
    /// parked on it. The handle becomes empty; detaching an already empty
    /// handle is a no-op.
    pub fn detach(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.latch().release();
        }
    }

    /// The capacity of the referenced cell.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] if the handle is empty.
    pub fn capacity(&self) -> Result<usize, CellError> {
        Ok(self.target()?.capacity())
    }

    fn target(&self) -> Result<&CellShared<T>, CellError> {
        self.shared.as_deref().ok_or(CellError::InvalidHandle)
    }
}

impl<T: Copy + Default> CellHandle<T> {
    /// Reads the element at `position`; see
    /// [`MemoryCell::read`](crate::MemoryCell::read).
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] on an empty handle, or
    /// [`CellError::OutOfRange`] if `position >= capacity`.
    pub fn read(&self, position: usize) -> Result<T, CellError> {
        let mut value = [T::default()];
        self.target()?.read_run(position, &mut value)?;
        Ok(value[0])
    }

    /// Writes `value` at `position`; see
    /// [`MemoryCell::write`](crate::MemoryCell::write).
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] on an empty handle, or
    /// [`CellError::OutOfRange`] if `position >= capacity`.
    pub fn write(&self, value: T, position: usize) -> Result<(), CellError> {
        self.target()?.write_run(&[value], position)
    }

    /// Reads `count` elements starting at `position` as one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] on an empty handle, or
    /// [`CellError::OutOfRange`] if `position + count > capacity`.
    pub fn read_array(&self, position: usize, count: usize) -> Result<Vec<T>, CellError> {
        let mut out = vec![T::default(); count];
        self.target()?.read_run(position, &mut out)?;
        Ok(out)
    }

    /// Like [`read_array`](Self::read_array), but copies into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] on an empty handle, or
    /// [`CellError::OutOfRange`] if `position + out.len() > capacity`.
    pub fn read_into(&self, position: usize, out: &mut [T]) -> Result<(), CellError> {
        self.target()?.read_run(position, out)
    }

    /// Writes all of `values` starting at `position` under one version
    /// bump.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidHandle`] on an empty handle, or
    /// [`CellError::OutOfRange`] if `position + values.len() > capacity`.
    pub fn write_array(&self, values: &[T], position: usize) -> Result<(), CellError> {
        self.target()?.write_run(values, position)
    }
}

impl<T> Clone for CellHandle<T> {
    /// Clones the binding, incrementing the live-handle count; cloning an
    /// empty handle yields another empty handle.
    fn clone(&self) -> Self {
        if let Some(shared) = &self.shared {
            shared.latch().add();
        }
        Self { shared: self.shared.clone() }
    }
}

impl<T> Default for CellHandle<T> {
    /// Creates an empty handle.
    fn default() -> Self {
        Self { shared: None }
    }
}

impl<T> Drop for CellHandle<T> {
    /// Returns the live-handle increment, waking a parked teardown on the
    /// zero transition. Dropping an empty handle is a no-op.
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T> core::fmt::Debug for CellHandle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CellHandle")
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}
