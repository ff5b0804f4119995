//! Writer admission: a compare-and-swap spinlock with a configurable
//! spin/yield policy.
//!
//! Writers are assumed rare and short-lived, so contention is resolved by
//! spinning rather than parking. The gate is not fair: contending writers
//! acquire in no particular order.

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Spin bound applied while contending for write admission.
///
/// Each failed acquisition attempt issues a `spin_loop` hint until
/// `yield_after` attempts have been made, then starts yielding the scheduler
/// instead so a spinning writer cannot starve the thread that holds the
/// gate on an oversubscribed machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPolicy {
    yield_after: u32,
}

impl SpinPolicy {
    /// Creates a policy that yields after `yield_after` spin hints.
    pub const fn new(yield_after: u32) -> Self {
        Self { yield_after }
    }

    /// The number of spin hints issued before yielding begins.
    pub const fn yield_after(self) -> u32 {
        self.yield_after
    }
}

impl Default for SpinPolicy {
    fn default() -> Self {
        Self { yield_after: 64 }
    }
}

/// Grants exclusive write admission without a blocking OS primitive.
pub struct AdmissionGate {
    locked: AtomicBool,
    policy: SpinPolicy,
}

impl AdmissionGate {
    /// Creates an unlocked gate with the given spin policy.
    pub const fn new(policy: SpinPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            policy,
        }
    }

    /// The spin policy this gate was built with.
    pub const fn policy(&self) -> SpinPolicy {
        self.policy
    }

    /// Acquires admission, spinning until granted.
    #[inline]
    pub fn acquire(&self) -> AdmissionGuard<'_> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return AdmissionGuard { gate: self };
        }
        self.acquire_slow()
    }

    #[cold]
    fn acquire_slow(&self) -> AdmissionGuard<'_> {
        let mut spin_count = 0;
        loop {
            // Test before the CAS to keep the line shared while contended.
            if !self.locked.load(Ordering::Relaxed)
                && self
                    .locked
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return AdmissionGuard { gate: self };
            }
            if spin_count < self.policy.yield_after {
                spin_count += 1;
                core::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }

    /// Acquires admission only if the gate is currently free.
    pub fn try_acquire(&self) -> Option<AdmissionGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| AdmissionGuard { gate: self })
    }
}

/// Holds write admission; releases it on drop.
pub struct AdmissionGuard<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.gate.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn try_acquire_excludes() {
        let gate = AdmissionGate::new(SpinPolicy::default());

        let guard = gate.acquire();
        assert!(gate.try_acquire().is_none());
        drop(guard);

        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn serializes_increments() {
        let gate = AdmissionGate::new(SpinPolicy::new(8));
        let gate = &gate;
        let counter = core::cell::UnsafeCell::new(0_u64);

        struct Shared<'a>(&'a core::cell::UnsafeCell<u64>);
        unsafe impl Send for Shared<'_> {}
        unsafe impl Sync for Shared<'_> {}
        let shared = Shared(&counter);
        let shared = &shared;

        const THREADS: u64 = 4;
        const ITERS: u64 = 10_000;

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(move || {
                    for _ in 0..ITERS {
                        let _guard = gate.acquire();
                        // Safety: exclusive access under the gate.
                        unsafe { *shared.0.get() += 1 };
                    }
                });
            }
        });

        assert_eq!(unsafe { *counter.get() }, THREADS * ITERS);
    }
}
