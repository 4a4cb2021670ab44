//! Shared control block: the two counters and the teardown protocol.
//!
//! Every block variant starts with a [`ControlBlock`] header (`#[repr(C)]`,
//! first field), so a `NonNull<ControlBlock>` can be cast back to the
//! concrete variant by the variant's own vtable entries.
//!
//! # Protocol
//!
//! ```text
//!   birth              strong = 1, weak = 1 (implicit unit)
//!   Shared::clone      strong += 1
//!   Shared::drop       strong -= 1 -> 0 ? dispose(); weak -= 1 -> 0 ? destroy()
//!   downgrade/clone    weak += 1
//!   Weak::drop         weak -= 1 -> 0 ? destroy()
//!   upgrade            strong += 1 unless strong == 0
//! ```

use std::ptr::NonNull;

use crate::counter::RefCount;

/// Teardown entry points of one block variant.
pub(crate) struct BlockVTable {
    /// Destroy the payload. Runs exactly once, when `strong` reaches zero.
    pub(crate) dispose: unsafe fn(NonNull<ControlBlock>),
    /// Free the block's storage. Runs exactly once, after `dispose`, when
    /// `weak` reaches zero.
    pub(crate) destroy: unsafe fn(NonNull<ControlBlock>),
}

/// Header shared by all block variants.
#[repr(C)]
pub(crate) struct ControlBlock {
    strong: RefCount,
    weak: RefCount,
    vtable: &'static BlockVTable,
}

impl ControlBlock {
    /// A fresh header: one strong reference (the creator) and the implicit
    /// weak unit held collectively by all strong references.
    pub(crate) const fn new(vtable: &'static BlockVTable) -> Self {
        Self {
            strong: RefCount::new(1),
            weak: RefCount::new(1),
            vtable,
        }
    }

    #[inline]
    pub(crate) fn add_strong_ref(&self) {
        self.strong.increment();
    }

    #[inline]
    pub(crate) fn add_weak_ref(&self) {
        self.weak.increment();
    }

    /// The upgrade primitive. Fails once the strong count has hit zero.
    #[inline]
    pub(crate) fn try_add_strong_ref(&self) -> bool {
        self.strong.try_increment()
    }

    /// Advisory snapshot of the strong count.
    #[inline]
    pub(crate) fn use_count(&self) -> usize {
        self.strong.get()
    }

    /// Give up one strong unit.
    ///
    /// # Safety
    ///
    /// `this` must point to a live block and the caller must own one strong
    /// unit of it, which is consumed.
    #[inline]
    pub(crate) unsafe fn release_strong(this: NonNull<Self>) {
        if unsafe { this.as_ref() }.strong.decrement() {
            unsafe { Self::drop_payload(this) };
        }
    }

    /// Give up one weak unit.
    ///
    /// # Safety
    ///
    /// `this` must point to a live block and the caller must own one weak
    /// unit of it, which is consumed. The block may be freed on return.
    #[inline]
    pub(crate) unsafe fn release_weak(this: NonNull<Self>) {
        if unsafe { this.as_ref() }.weak.decrement() {
            let destroy = unsafe { this.as_ref() }.vtable.destroy;
            log::trace!("freeing control block {:p}", this);
            unsafe { destroy(this) };
        }
    }

    // Non-inlined part of `release_strong`.
    #[inline(never)]
    unsafe fn drop_payload(this: NonNull<Self>) {
        // Release the implicit weak unit even if the payload's destructor
        // unwinds, so the block itself is never leaked by a panicking drop.
        let _implicit = ImplicitWeak(this);
        let dispose = unsafe { this.as_ref() }.vtable.dispose;
        log::trace!("disposing payload of control block {:p}", this);
        unsafe { dispose(this) };
    }
}

/// Object address plus the block that governs it, as stored in a non-null
/// handle.
pub(crate) struct BlockRef<T> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) block: NonNull<ControlBlock>,
}

// Manual Clone/Copy that don't require T: Clone
impl<T> Clone for BlockRef<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BlockRef<T> {}

impl<T> BlockRef<T> {
    #[inline]
    pub(crate) fn header(&self) -> &ControlBlock {
        // A handle holding this pair owns a unit, so the header is live.
        unsafe { self.block.as_ref() }
    }
}

/// The weak unit collectively owned by the strong references.
struct ImplicitWeak(NonNull<ControlBlock>);

impl Drop for ImplicitWeak {
    fn drop(&mut self) {
        unsafe { ControlBlock::release_weak(self.0) };
    }
}
