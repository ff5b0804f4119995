//! Live-reference counting with a blocking wait for the zero transition.
//!
//! This is a "shared with blocking teardown" primitive: releasers decrement
//! an atomic count, and a single teardown thread may park until the count
//! reaches zero. The waiter slot is guarded by a tiny spinlock; operations
//! on it are just a pointer-sized move, so contention is negligible.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, Thread};

/// An atomic count of live references paired with a single-waiter
/// park/unpark channel for the count-reaches-zero event.
pub struct ReleaseLatch {
    count: AtomicUsize,
    slot_lock: AtomicBool,
    waiter: UnsafeCell<Option<Thread>>,
}

// Safety: the waiter slot is only accessed while `slot_lock` is held; the
// count is plain atomic arithmetic.
unsafe impl Send for ReleaseLatch {}
unsafe impl Sync for ReleaseLatch {}

impl ReleaseLatch {
    /// Creates a latch with a count of zero.
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            slot_lock: AtomicBool::new(false),
            waiter: UnsafeCell::new(None),
        }
    }

    /// Registers one more live reference.
    pub fn add(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// The current live-reference count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Drops one live reference; on the transition to zero, wakes the
    /// thread parked in [`wait_zero`](Self::wait_zero), if any.
    ///
    /// The `AcqRel` decrement makes every access performed through the
    /// released reference visible to the waiter before it proceeds.
    pub fn release(&self) {
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "release without matching add");
        if previous == 1 {
            if let Some(waiter) = self.take_waiter() {
                waiter.unpark();
            }
        }
    }

    /// Parks the current thread until the count reads zero.
    ///
    /// At most one thread may wait at a time. Unpark tokens left over from
    /// earlier wakeups make `park` return early; the loop re-checks the
    /// count, so spurious wakeups are harmless.
    pub fn wait_zero(&self) {
        if self.count.load(Ordering::Acquire) == 0 {
            return;
        }
        self.store_waiter(Some(thread::current()));
        while self.count.load(Ordering::Acquire) != 0 {
            thread::park();
        }
        self.store_waiter(None);
    }

    fn store_waiter(&self, waiter: Option<Thread>) {
        self.lock_slot();
        // Safety: slot lock held.
        unsafe { *self.waiter.get() = waiter };
        self.unlock_slot();
    }

    fn take_waiter(&self) -> Option<Thread> {
        self.lock_slot();
        // Safety: slot lock held.
        let waiter = unsafe { (*self.waiter.get()).take() };
        self.unlock_slot();
        waiter
    }

    fn lock_slot(&self) {
        while self.slot_lock.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }
    }

    fn unlock_slot(&self) {
        self.slot_lock.store(false, Ordering::Release);
    }
}

impl Default for ReleaseLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[test]
    fn counts_adds_and_releases() {
        let latch = ReleaseLatch::new();
        assert_eq!(latch.count(), 0);

        latch.add();
        latch.add();
        assert_eq!(latch.count(), 2);

        latch.release();
        assert_eq!(latch.count(), 1);
        latch.release();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn wait_zero_returns_immediately_when_idle() {
        let latch = ReleaseLatch::new();
        latch.wait_zero();
    }

    #[test]
    fn wait_zero_blocks_until_released() {
        let latch = ReleaseLatch::new();
        latch.add();
        latch.add();

        let latch = &latch;
        let woke = AtomicBool::new(false);
        let woke = &woke;

        thread::scope(|s| {
            s.spawn(move || {
                latch.wait_zero();
                woke.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(20));
            latch.release();
            thread::sleep(Duration::from_millis(20));
            assert!(!woke.load(Ordering::SeqCst));

            latch.release();
        });

        assert!(woke.load(Ordering::SeqCst));
    }
}
