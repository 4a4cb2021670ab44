//! Separate control block: bookkeeping for an address allocated elsewhere.

use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

use crate::control::{BlockVTable, ControlBlock};
use crate::deleter::Deleter;

/// Control block for an adopted address and the deleter that releases it.
#[repr(C)]
pub(crate) struct SeparateBlock<T, D> {
    header: ControlBlock,
    ptr: NonNull<T>,
    deleter: ManuallyDrop<D>,
}

impl<T, D: Deleter<T>> SeparateBlock<T, D> {
    const VTABLE: BlockVTable = BlockVTable {
        dispose: Self::dispose,
        destroy: Self::destroy,
    };

    /// Allocate a block owning `ptr`, with strong and weak counts of one.
    pub(crate) fn alloc(ptr: NonNull<T>, deleter: D) -> NonNull<ControlBlock> {
        let block = Box::new(Self {
            header: ControlBlock::new(&Self::VTABLE),
            ptr,
            deleter: ManuallyDrop::new(deleter),
        });
        NonNull::from(Box::leak(block)).cast()
    }

    unsafe fn dispose(this: NonNull<ControlBlock>) {
        let this = this.cast::<Self>().as_ptr();
        // Only the fields past the header are touched; weak handles may be
        // reading the counters concurrently.
        unsafe {
            let ptr = ptr::addr_of!((*this).ptr).read();
            let deleter = &mut *ptr::addr_of_mut!((*this).deleter);
            deleter.delete(ptr);
            ManuallyDrop::drop(deleter);
        }
    }

    unsafe fn destroy(this: NonNull<ControlBlock>) {
        // The deleter was dropped by `dispose`; `ManuallyDrop` keeps the
        // `Box` drop from touching it again.
        drop(unsafe { Box::from_raw(this.cast::<Self>().as_ptr()) });
    }
}
