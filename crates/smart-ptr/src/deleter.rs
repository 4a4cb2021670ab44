//! Release behaviors for adopted addresses.

use std::ptr::NonNull;

/// Releases an object that a handle owns by address.
///
/// Any `FnMut(NonNull<T>)` closure is a deleter, which covers most custom
/// release policies:
///
/// ```
/// use smart_ptr::Unique;
///
/// let raw = Box::into_raw(Box::new(7));
/// let handle = unsafe {
///     Unique::from_raw_with(raw, |p: std::ptr::NonNull<i32>| drop(Box::from_raw(p.as_ptr())))
/// };
/// assert_eq!(*handle, 7);
/// ```
pub trait Deleter<T: ?Sized> {
    /// Release the object at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be an address this deleter knows how to release, and it
    /// must not be used afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Frees an object allocated through `Box`, including boxed slices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}
