//! Allocators for single-allocation control blocks.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::error::AllocError;

/// Memory source for inline control blocks.
///
/// A block built through an allocator keeps a copy of it and hands the
/// block's memory back to that copy when the last reference goes away, so
/// the allocator must be able to free memory obtained from any of its
/// clones.
///
/// # Safety
///
/// `allocate` must return memory fitting `layout` (size and alignment) that
/// stays valid until passed to `deallocate` with the same layout.
pub unsafe trait BlockAlloc: Clone {
    /// Returns an uninitialized memory block fitting `layout`, or an
    /// `AllocError` if none is available. `layout` never has zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Returns a block obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or a clone of it)
    /// with this same `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global Rust allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl BlockAlloc for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() > 0);
        NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError::new(layout))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
