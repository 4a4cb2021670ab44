//! Exclusive, move-only owner of a heap object or slice.

use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice::SliceIndex;

use crate::deleter::{DefaultDelete, Deleter};

/// Sole owner of an object, released by `D` when the handle is dropped.
///
/// No control block and no shared state: moving a `Unique` transfers
/// ownership, and it cannot be cloned. `T` may be a slice, in which case
/// the handle owns every element and indexes like one.
pub struct Unique<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    ptr: Option<NonNull<T>>,
    deleter: D,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send + ?Sized, D: Deleter<T> + Send> Send for Unique<T, D> {}
unsafe impl<T: Sync + ?Sized, D: Deleter<T> + Sync> Sync for Unique<T, D> {}

/// Box `value` into a new [`Unique`].
pub fn make_unique<T>(value: T) -> Unique<T> {
    Unique::new(value)
}

/// A [`Unique`] slice of `len` default-initialized elements.
///
/// ```
/// let mut counts = smart_ptr::make_unique_slice::<u32>(3);
/// counts[1] += 5;
/// assert_eq!(&*counts, &[0, 5, 0]);
/// ```
pub fn make_unique_slice<T: Default>(len: usize) -> Unique<[T]> {
    iter::repeat_with(T::default).take(len).collect::<Box<[T]>>().into()
}

impl<T> Unique<T> {
    pub fn new(value: T) -> Self {
        Self::from(Box::new(value))
    }
}

impl<T: ?Sized> Unique<T> {
    /// Adopt a `Box`-allocated object; a null `ptr` gives a null handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::<T>::into_raw` and not be owned
    /// by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        unsafe { Self::from_raw_with(ptr, DefaultDelete) }
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Adopt an object to be released by `deleter`; a null `ptr` gives a
    /// null handle that still carries the deleter.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes until released,
    /// releasable by `deleter`, and not owned by anything else.
    pub unsafe fn from_raw_with(ptr: *mut T, deleter: D) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            deleter,
            _marker: PhantomData,
        }
    }

    /// The null handle.
    pub fn null() -> Self
    where
        D: Default,
    {
        Self {
            ptr: None,
            deleter: D::default(),
            _marker: PhantomData,
        }
    }

    /// Give up ownership without releasing. The caller becomes responsible
    /// for the returned address.
    #[must_use = "the released object leaks unless the address is used"]
    pub fn release_non_null(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Release the owned object, if any, and become null.
    pub fn reset(&mut self) {
        if let Some(old) = self.ptr.take() {
            unsafe { self.deleter.delete(old) };
        }
    }

    /// Take ownership of `ptr`, then release the previously owned object.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw_with`](Self::from_raw_with) for this
    /// handle's deleter.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        let old = mem::replace(&mut self.ptr, NonNull::new(ptr));
        if let Some(old) = old {
            unsafe { self.deleter.delete(old) };
        }
    }

    /// Exchange objects and deleters.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.deleter, &mut other.deleter);
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|p| unsafe { &*p.as_ptr() })
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.map(|p| unsafe { &mut *p.as_ptr() })
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn deleter(&self) -> &D {
        &self.deleter
    }

    #[inline]
    pub fn deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }

    // Address without metadata, for comparisons.
    #[inline]
    fn addr(&self) -> *const () {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const ())
    }

    /// Split into address and deleter without releasing anything.
    pub(crate) fn into_raw_parts(self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(self);
        let deleter = unsafe { ptr::read(&this.deleter) };
        (this.ptr, deleter)
    }
}

impl<T, D: Deleter<T>> Unique<T, D> {
    /// Give up ownership without releasing; returns the address (null if
    /// there was none). The caller becomes responsible for it.
    #[must_use = "the released object leaks unless the address is used"]
    pub fn release(&mut self) -> *mut T {
        self.ptr.take().map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// The owned address; null for a null handle.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for Unique<T, D> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> From<Box<T>> for Unique<T> {
    fn from(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }
}

impl<T> From<Vec<T>> for Unique<[T]> {
    fn from(items: Vec<T>) -> Self {
        Self::from(items.into_boxed_slice())
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is null.
    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => crate::null_deref("Unique"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for Unique<T, D> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => crate::null_deref("Unique"),
        }
    }
}

impl<T, D: Deleter<[T]>, I: SliceIndex<[T]>> Index<I> for Unique<[T], D> {
    type Output = I::Output;

    /// # Panics
    ///
    /// Panics if the handle is null or the index is out of bounds.
    #[track_caller]
    fn index(&self, index: I) -> &I::Output {
        &(**self)[index]
    }
}

impl<T, D: Deleter<[T]>, I: SliceIndex<[T]>> IndexMut<I> for Unique<[T], D> {
    #[track_caller]
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut (**self)[index]
    }
}

/// Compares owned addresses. Two null handles are equal, so
/// `handle == Unique::null()` is the same test as `handle.is_null()`.
impl<T: ?Sized, D: Deleter<T>, E: Deleter<T>> PartialEq<Unique<T, E>> for Unique<T, D> {
    fn eq(&self, other: &Unique<T, E>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized, D: Deleter<T>> Eq for Unique<T, D> {}

impl<T: fmt::Debug + ?Sized, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Unique").field(&value).finish(),
            None => f.write_str("Unique(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked {
        value: i32,
        live: Rc<Cell<i32>>,
    }

    impl Tracked {
        fn new(value: i32, live: &Rc<Cell<i32>>) -> Self {
            live.set(live.get() + 1);
            Self {
                value,
                live: Rc::clone(live),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn test_basics() {
        let live = Rc::new(Cell::new(0));
        {
            let p = Unique::new(Tracked::new(10, &live));
            assert!(!p.is_null());
            assert_eq!(p.value, 10);
            assert_eq!(live.get(), 1);
            assert!(!p.as_ptr().is_null());
        }
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_move() {
        let live = Rc::new(Cell::new(0));
        let p1 = make_unique(Tracked::new(20, &live));
        let p2 = p1;
        assert_eq!(p2.value, 20);

        let mut p3: Unique<Tracked> = Unique::null();
        assert!(p3.is_null());
        p3 = p2;
        assert_eq!(p3.value, 20);
        assert_eq!(live.get(), 1);

        drop(p3);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_release_and_reset() {
        let live = Rc::new(Cell::new(0));
        let mut p = Unique::new(Tracked::new(30, &live));

        let raw = p.release();
        assert!(p.is_null());
        assert_eq!(live.get(), 1);

        unsafe { p.reset_raw(raw) };
        assert_eq!(live.get(), 1);

        unsafe { p.reset_raw(Box::into_raw(Box::new(Tracked::new(40, &live)))) };
        assert_eq!(live.get(), 1);
        assert_eq!(p.value, 40);

        p.reset();
        assert!(p.is_null());
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_custom_deleter() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let raw = Box::into_raw(Box::new(60));
        {
            let p = unsafe {
                Unique::from_raw_with(raw, move |q: NonNull<i32>| {
                    seen.set(seen.get() + 1);
                    drop(Box::from_raw(q.as_ptr()));
                })
            };
            assert_eq!(*p, 60);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_get_mut_and_swap() {
        let mut a = Unique::new(1);
        let mut b = Unique::from(Box::new(2));
        *a.get_mut().unwrap() += 10;
        a.swap(&mut b);
        assert_eq!(*a, 2);
        assert_eq!(*b, 11);
    }

    #[test]
    fn test_slice_index() {
        let mut p = make_unique_slice::<i32>(4);
        assert_eq!(p.len(), 4);
        assert_eq!(p[2], 0);

        p[0] = 10;
        p[3] += 7;
        p[1..3].copy_from_slice(&[20, 30]);
        assert_eq!(&p[..], &[10, 20, 30, 7]);
        assert_eq!(format!("{:?}", p), "Unique([10, 20, 30, 7])");
    }

    #[test]
    #[should_panic]
    fn test_slice_index_out_of_bounds() {
        let p = make_unique_slice::<u8>(2);
        let _value = p[2];
    }

    #[test]
    fn test_slice_drops_every_element_once() {
        let live = Rc::new(Cell::new(0));
        let items: Vec<_> = (0..5).map(|i| Tracked::new(i, &live)).collect();
        let mut p = Unique::<[Tracked]>::from(items);
        assert_eq!(live.get(), 5);
        assert_eq!(p[4].value, 4);

        let mut other: Unique<[Tracked]> = Unique::null();
        p.swap(&mut other);
        assert!(p.is_null());
        assert_eq!(live.get(), 5);

        drop(other);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_slice_release_and_custom_deleter() {
        let live = Rc::new(Cell::new(0));
        let boxed: Box<[Tracked]> = (0..3).map(|i| Tracked::new(i, &live)).collect();
        let mut p: Unique<[Tracked]> = Unique::from(boxed);

        let raw = p.release_non_null().unwrap();
        assert!(p.is_null());
        assert_eq!(live.get(), 3);

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let q = unsafe {
            Unique::from_raw_with(raw.as_ptr(), move |s: NonNull<[Tracked]>| {
                seen.set(seen.get() + 1);
                drop(Box::from_raw(s.as_ptr()));
            })
        };
        assert_eq!(q.len(), 3);
        drop(q);
        assert_eq!(calls.get(), 1);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_compare_with_null() {
        let empty: Unique<[u8]> = Unique::default();
        assert!(empty.is_null());
        assert_eq!(empty, Unique::<[u8]>::null());
        assert_eq!(format!("{:?}", empty), "Unique(null)");

        let full = make_unique_slice::<u8>(1);
        assert_ne!(full, empty);
    }

    #[test]
    fn test_compare() {
        let a = Unique::new(70);
        let b: Unique<i32> = Unique::default();
        assert_ne!(a, b);
        assert_eq!(b, Unique::<i32>::null());
        assert_eq!(format!("{:?}", a), "Unique(70)");
        assert_eq!(format!("{:?}", b), "Unique(null)");
    }
}
