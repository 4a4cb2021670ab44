//! Atomic reference counter used for both halves of a control block.

use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Counts past this point can only be reached by leaking handles; abort
/// instead of risking a wrap to zero.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// An atomic reference count.
///
/// Increments of an existing reference are `Relaxed`: a new reference can
/// only be formed from an existing one, and handing that reference to
/// another thread already synchronizes. Decrements are `Release`, and the
/// one caller that takes the count to zero issues an `Acquire` fence so
/// every earlier use happens-before the teardown it is about to run.
#[derive(Debug)]
pub(crate) struct RefCount(AtomicUsize);

impl RefCount {
    /// Create a counter initialized to the given value.
    #[inline]
    pub(crate) const fn new(initial: usize) -> Self {
        Self(AtomicUsize::new(initial))
    }

    /// Snapshot of the current value. Stale the moment it is read.
    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Unconditionally add one.
    #[inline]
    pub(crate) fn increment(&self) {
        let prev = self.0.fetch_add(1, Ordering::Relaxed);
        if prev > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Subtract one. Returns `true` for exactly one caller: the one that
    /// observed the transition to zero.
    #[inline]
    pub(crate) fn decrement(&self) -> bool {
        let prev = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "Decrementing zero reference count");
        if prev != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }

    /// Add one unless the count is zero.
    ///
    /// A zero count is permanent: the payload is being (or has been)
    /// destroyed, so a plain `fetch_add` here would resurrect it. The loop
    /// re-checks for zero after every failed exchange.
    #[inline]
    pub(crate) fn try_increment(&self) -> bool {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            if cur == 0 {
                return false;
            }
            if cur > MAX_REFCOUNT {
                std::process::abort();
            }
            match self
                .0
                .compare_exchange_weak(cur, cur + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }
}
