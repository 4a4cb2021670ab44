//! Strong, clonable, dereferenceable handle.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use crate::alloc::{BlockAlloc, Global};
use crate::control::{BlockRef, ControlBlock};
use crate::deleter::{DefaultDelete, Deleter};
use crate::error::{AllocError, BadWeakRef, MakeError};
use crate::inline::InlineBlock;
use crate::separate::SeparateBlock;
use crate::unique::Unique;
use crate::weak::Weak;

/// A thread-safe, atomically counted, shared owner of a heap object.
///
/// Cloning shares the control block and bumps the strong count; dropping
/// the last `Shared` destroys the object. A `Shared` may also be null, in
/// which case it owns nothing.
///
/// # Example
///
/// ```
/// use smart_ptr::{make_shared, Shared};
///
/// let a = make_shared(vec![1, 2, 3]);
/// let b = a.clone();
///
/// assert_eq!(a.use_count(), 2);
/// assert!(Shared::ptr_eq(&a, &b));
/// assert_eq!(b[1], 2);
/// ```
pub struct Shared<T> {
    pub(crate) raw: Option<BlockRef<T>>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send + Sync> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}

impl<T> Shared<T> {
    /// The null handle.
    #[inline]
    pub const fn null() -> Self {
        Self {
            raw: None,
            _marker: PhantomData,
        }
    }

    /// Takes ownership of an already-incremented strong unit.
    #[inline]
    pub(crate) unsafe fn from_block_ref(raw: BlockRef<T>) -> Self {
        Self {
            raw: Some(raw),
            _marker: PhantomData,
        }
    }

    /// Build `value` into a single-allocation block.
    ///
    /// Aborts through [`handle_alloc_error`](std::alloc::handle_alloc_error)
    /// if the block cannot be allocated, like `Box::new`.
    pub fn new(value: T) -> Self {
        Self::new_in(value, Global)
    }

    /// Like [`new`](Self::new), but reports allocation failure.
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        Self::try_new_in(value, Global)
    }

    /// Allocate the block first, then run `init` to build the payload.
    ///
    /// If `init` fails (or unwinds) the block is freed before the error is
    /// returned and no handle to it ever exists.
    pub fn try_new_with<E, F>(init: F) -> Result<Self, MakeError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        Self::try_new_with_in(init, Global)
    }

    /// [`new`](Self::new) through a caller-supplied allocator.
    pub fn new_in<A>(value: T, alloc: A) -> Self
    where
        A: BlockAlloc + Send + 'static,
    {
        match Self::try_new_in(value, alloc) {
            Ok(shared) => shared,
            Err(e) => std::alloc::handle_alloc_error(e.layout()),
        }
    }

    /// [`try_new`](Self::try_new) through a caller-supplied allocator.
    pub fn try_new_in<A>(value: T, alloc: A) -> Result<Self, AllocError>
    where
        A: BlockAlloc + Send + 'static,
    {
        Self::try_new_with_in(|| Ok::<T, Infallible>(value), alloc).map_err(|e| match e {
            MakeError::Alloc(e) => e,
            MakeError::Construct(never) => match never {},
        })
    }

    /// [`try_new_with`](Self::try_new_with) through a caller-supplied
    /// allocator. Memory obtained from `alloc` is returned to it on every
    /// failure path.
    pub fn try_new_with_in<A, E, F>(init: F, alloc: A) -> Result<Self, MakeError<E>>
    where
        A: BlockAlloc + Send + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let (block, ptr) = InlineBlock::<T, A>::try_new_with(alloc, init)?;
        Ok(unsafe { Self::from_block_ref(BlockRef { ptr, block }) })
    }

    /// Adopt a `Box`-allocated object.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, come from `Box::<T>::into_raw`, and not be
    /// owned by anything else. A handle built from a null address must not
    /// be dereferenced.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        unsafe { Self::from_raw_with(ptr, DefaultDelete) }
    }

    /// Adopt an object released by `deleter` once the last strong reference
    /// goes. The object and control block are two separate allocations.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, valid for reads for as long as any strong
    /// reference exists, and releasable by `deleter`.
    pub unsafe fn from_raw_with<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + Send + 'static,
    {
        debug_assert!(!ptr.is_null(), "adopting a null address");
        let ptr = unsafe { NonNull::new_unchecked(ptr) };
        let block = SeparateBlock::alloc(ptr, deleter);
        unsafe { Self::from_block_ref(BlockRef { ptr, block }) }
    }

    /// Adopt a boxed object.
    pub fn from_box(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }

    /// Become null, releasing the previous referent.
    #[inline]
    pub fn reset(&mut self) {
        Self::null().swap(self);
    }

    /// Replace the referent with an adopted `Box` address.
    ///
    /// The new state is fully built before the old referent is released.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw`](Self::from_raw).
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        unsafe { Self::from_raw(ptr) }.swap(self);
    }

    /// Replace the referent with an address released by `deleter`.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw_with`](Self::from_raw_with).
    pub unsafe fn reset_raw_with<D>(&mut self, ptr: *mut T, deleter: D)
    where
        D: Deleter<T> + Send + 'static,
    {
        unsafe { Self::from_raw_with(ptr, deleter) }.swap(self);
    }

    /// Replace the referent with a boxed object.
    pub fn reset_box(&mut self, value: Box<T>) {
        Self::from_box(value).swap(self);
    }

    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.raw, &mut other.raw);
    }

    /// Shared reference to the object, `None` if null.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.raw.map(|raw| unsafe { &*raw.ptr.as_ptr() })
    }

    /// The stored address; null for a null handle.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        match self.raw {
            Some(raw) => raw.ptr.as_ptr(),
            None => ptr::null(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    /// Number of strong references, zero for a null handle.
    ///
    /// Advisory: other threads may change it right after it is read.
    #[inline]
    pub fn use_count(&self) -> usize {
        self.raw.map_or(0, |raw| raw.header().use_count())
    }

    /// `use_count() == 1`, with the same caveat.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    /// Create a weak observer of this object.
    pub fn downgrade(&self) -> Weak<T> {
        Weak::from(self)
    }

    /// Whether both handles store the same address.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        ptr::eq(this.as_ptr(), other.as_ptr())
    }
}

impl<T> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(raw) = self.raw {
            raw.header().add_strong_ref();
        }
        Self {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Shared<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { ControlBlock::release_strong(raw.block) };
        }
    }
}

impl<T> Default for Shared<T> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is null.
    #[inline]
    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => crate::null_deref("Shared"),
        }
    }
}

impl<T> TryFrom<&Weak<T>> for Shared<T> {
    type Error = BadWeakRef;

    /// Upgrade, failing loudly if the object is gone. A null `Weak` gives a
    /// null `Shared`.
    fn try_from(weak: &Weak<T>) -> Result<Self, BadWeakRef> {
        let Some(raw) = weak.raw else {
            return Ok(Self::null());
        };
        if raw.header().try_add_strong_ref() {
            Ok(unsafe { Self::from_block_ref(raw) })
        } else {
            log::debug!("upgrade of expired weak reference to {:p} refused", raw.ptr);
            Err(BadWeakRef)
        }
    }
}

impl<T> From<Box<T>> for Shared<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T, D> From<Unique<T, D>> for Shared<T>
where
    D: Deleter<T> + Send + 'static,
{
    /// Move the object and its deleter into a separate control block.
    fn from(unique: Unique<T, D>) -> Self {
        match unique.into_raw_parts() {
            (Some(ptr), deleter) => unsafe { Self::from_raw_with(ptr.as_ptr(), deleter) },
            (None, _) => Self::null(),
        }
    }
}

/// Compares stored addresses. All null handles are equal to each other and
/// order before every non-null one, so `handle == Shared::null()` is the
/// same test as `handle.is_null()`.
impl<T> PartialEq for Shared<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Shared<T> {}

impl<T> PartialOrd for Shared<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Shared<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ptr().cmp(&other.as_ptr())
    }
}

impl<T> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ptr().hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f
                .debug_struct("Shared")
                .field("value", value)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("Shared(null)"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_null_handle() {
        let s: Shared<i32> = Shared::null();
        assert!(s.is_null());
        assert!(s.get().is_none());
        assert!(s.as_ptr().is_null());
        assert_eq!(s.use_count(), 0);
        assert!(!s.is_unique());
        assert_eq!(s, Shared::default());
    }

    #[test]
    fn test_clone_and_drop_counts() {
        let drops = counter();
        let a = Shared::new(DropCounter(Arc::clone(&drops)));
        assert_eq!(a.use_count(), 1);
        assert!(a.is_unique());

        let b = a.clone();
        assert_eq!(a.use_count(), 2);
        assert_eq!(b.use_count(), 2);

        drop(a);
        assert_eq!(b.use_count(), 1);
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 0);

        drop(b);
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_take_leaves_null() {
        let mut a = Shared::new(5);
        let b = mem::take(&mut a);
        assert!(a.is_null());
        assert_eq!(*b, 5);
        assert_eq!(b.use_count(), 1);
    }

    #[test]
    fn test_reset_variants() {
        let drops = counter();
        let mut s = Shared::new(DropCounter(Arc::clone(&drops)));

        s.reset_box(Box::new(DropCounter(Arc::clone(&drops))));
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
        assert_eq!(s.use_count(), 1);

        let raw = Box::into_raw(Box::new(DropCounter(Arc::clone(&drops))));
        unsafe { s.reset_raw(raw) };
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 2);
        assert_eq!(s.as_ptr(), raw as *const _);

        s.reset();
        assert!(s.is_null());
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 3);
    }

    #[test]
    fn test_reset_with_deleter() {
        let released = counter();
        let seen = Arc::clone(&released);
        let mut s = Shared::new(1u8);

        let raw = Box::into_raw(Box::new(2u8));
        unsafe {
            s.reset_raw_with(raw, move |p: NonNull<u8>| {
                seen.fetch_add(1, AtomicOrdering::Relaxed);
                drop(Box::from_raw(p.as_ptr()));
            })
        };
        assert_eq!(*s, 2);

        drop(s);
        assert_eq!(released.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_swap() {
        let mut a = Shared::new("a");
        let mut b = Shared::new("b");
        a.swap(&mut b);
        assert_eq!(*a, "b");
        assert_eq!(*b, "a");
    }

    #[test]
    fn test_compare_by_address() {
        let a = Shared::new(7);
        let b = Shared::new(7);
        let c = a.clone();

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(a.cmp(&b), a.as_ptr().cmp(&b.as_ptr()));
        assert!(Shared::<i32>::null() < a);
    }

    #[test]
    fn test_compare_with_null() {
        let live = Shared::new(1);
        let mut gone = live.clone();
        gone.reset();

        assert_eq!(gone, Shared::null());
        assert_eq!(Shared::<i32>::default(), Shared::null());
        assert_ne!(live, Shared::null());
        assert!(Shared::null() < live);
        assert!(live > gone);

        let dangling = live.downgrade();
        drop(live);
        assert_eq!(dangling.lock(), Shared::null());
    }

    #[test]
    fn test_from_unique_keeps_deleter() {
        let released = counter();
        let seen = Arc::clone(&released);
        let raw = Box::into_raw(Box::new(10));
        let unique = unsafe {
            Unique::from_raw_with(raw, move |p: NonNull<i32>| {
                seen.fetch_add(1, AtomicOrdering::Relaxed);
                drop(Box::from_raw(p.as_ptr()));
            })
        };

        let shared = Shared::from(unique);
        assert_eq!(shared.as_ptr(), raw as *const i32);
        assert_eq!(released.load(AtomicOrdering::Relaxed), 0);

        drop(shared);
        assert_eq!(released.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_formatting() {
        let s = Shared::new(3);
        assert_eq!(s.to_string(), "3");
        assert_eq!(format!("{:?}", s), "Shared { value: 3, use_count: 1 }");
        assert_eq!(Shared::<i32>::null().to_string(), "null");
        assert_eq!(format!("{:?}", Shared::<i32>::null()), "Shared(null)");
        assert_eq!(format!("{:p}", s), format!("{:p}", s.as_ptr()));
    }

    #[test]
    #[should_panic(expected = "null Shared")]
    fn test_deref_null_panics() {
        let s: Shared<i32> = Shared::null();
        let _value: i32 = *s;
    }
}
