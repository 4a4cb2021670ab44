//! Inline control block: counters and payload in a single allocation.

use std::alloc::Layout;
use std::mem::{self, ManuallyDrop, MaybeUninit};
use std::ptr::{self, NonNull};

use crate::alloc::BlockAlloc;
use crate::control::{BlockVTable, ControlBlock};
use crate::error::MakeError;

/// Control block that stores its payload in place, next to the counters.
///
/// The allocator that produced the block travels inside it, so whichever
/// thread frees the block returns the memory to the right place.
#[repr(C)]
pub(crate) struct InlineBlock<T, A> {
    header: ControlBlock,
    alloc: ManuallyDrop<A>,
    value: MaybeUninit<T>,
}

impl<T, A: BlockAlloc> InlineBlock<T, A> {
    const VTABLE: BlockVTable = BlockVTable {
        dispose: Self::dispose,
        destroy: Self::destroy,
    };

    /// Allocate a block from `alloc`, then build the payload with `init`.
    ///
    /// All or nothing: if `init` fails or unwinds, the raw storage goes back
    /// to `alloc` and no counter is ever initialized. On success returns the
    /// block header and the payload address inside it.
    pub(crate) fn try_new_with<E, F>(
        alloc: A,
        init: F,
    ) -> Result<(NonNull<ControlBlock>, NonNull<T>), MakeError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let layout = Layout::new::<Self>();
        let raw = alloc.allocate(layout)?;
        let storage = Uncommitted {
            alloc: &alloc,
            ptr: raw,
            layout,
        };

        let value = match init() {
            Ok(value) => value,
            Err(e) => {
                log::debug!("payload construction failed, returning block {:p}", raw);
                drop(storage);
                return Err(MakeError::Construct(e));
            }
        };
        mem::forget(storage);

        let block = raw.cast::<Self>().as_ptr();
        unsafe {
            block.write(Self {
                header: ControlBlock::new(&Self::VTABLE),
                alloc: ManuallyDrop::new(alloc),
                value: MaybeUninit::new(value),
            });
            let payload = ptr::addr_of_mut!((*block).value).cast::<T>();
            Ok((NonNull::new_unchecked(block).cast(), NonNull::new_unchecked(payload)))
        }
    }

    unsafe fn dispose(this: NonNull<ControlBlock>) {
        let this = this.cast::<Self>().as_ptr();
        unsafe { ptr::drop_in_place(ptr::addr_of_mut!((*this).value).cast::<T>()) };
    }

    unsafe fn destroy(this: NonNull<ControlBlock>) {
        let block = this.cast::<Self>();
        let alloc = unsafe { ManuallyDrop::into_inner(ptr::addr_of!((*block.as_ptr()).alloc).read()) };
        unsafe { alloc.deallocate(block.cast(), Layout::new::<Self>()) };
    }
}

/// Raw block storage not yet holding a payload; returned to its allocator
/// unless forgotten.
struct Uncommitted<'a, A: BlockAlloc> {
    alloc: &'a A,
    ptr: NonNull<u8>,
    layout: Layout,
}

impl<A: BlockAlloc> Drop for Uncommitted<'_, A> {
    fn drop(&mut self) {
        unsafe { self.alloc.deallocate(self.ptr, self.layout) };
    }
}
