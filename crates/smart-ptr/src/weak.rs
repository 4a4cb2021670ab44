//! Weak references for cycle prevention.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use crate::control::{BlockRef, ControlBlock};
use crate::shared::Shared;

/// A weak (non-owning) observer of a [`Shared`] object.
///
/// A `Weak` keeps the control block alive but not the object. It cannot be
/// dereferenced; upgrade it with [`lock`](Self::lock), which yields a null
/// `Shared` once the object is gone, or with `Shared::try_from`, which
/// reports that case as a [`BadWeakRef`](crate::BadWeakRef) error.
///
/// # Example
///
/// ```
/// use smart_ptr::{make_shared, Weak};
///
/// let strong = make_shared(42);
/// let weak = Weak::from(&strong);
/// assert!(!weak.expired());
///
/// drop(strong);
///
/// // Now it's dead
/// assert!(weak.expired());
/// assert!(weak.lock().is_null());
/// ```
pub struct Weak<T> {
    pub(crate) raw: Option<BlockRef<T>>,
    _marker: PhantomData<fn() -> T>,
}

unsafe impl<T: Send + Sync> Send for Weak<T> {}
unsafe impl<T: Send + Sync> Sync for Weak<T> {}

impl<T> Weak<T> {
    /// A null weak reference; always expired.
    #[inline]
    pub const fn new() -> Self {
        Self {
            raw: None,
            _marker: PhantomData,
        }
    }

    /// Stop observing.
    #[inline]
    pub fn reset(&mut self) {
        Self::new().swap(self);
    }

    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.raw, &mut other.raw);
    }

    /// Number of strong references to the observed object.
    ///
    /// Advisory: other threads may change it right after it is read.
    #[inline]
    pub fn use_count(&self) -> usize {
        self.raw.map_or(0, |raw| raw.header().use_count())
    }

    /// Whether the object is gone (or this reference is null).
    #[inline]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Upgrade to a strong reference, or a null `Shared` if the object has
    /// already been destroyed. Never fails otherwise.
    pub fn lock(&self) -> Shared<T> {
        match self.raw {
            Some(raw) if raw.header().try_add_strong_ref() => unsafe { Shared::from_block_ref(raw) },
            _ => Shared::null(),
        }
    }

    /// [`lock`](Self::lock) as an `Option`.
    #[inline]
    pub fn upgrade(&self) -> Option<Shared<T>> {
        let shared = self.lock();
        (!shared.is_null()).then_some(shared)
    }

    /// The observed address. Never dereference it: the object may be gone.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        match self.raw {
            Some(raw) => raw.ptr.as_ptr(),
            None => ptr::null(),
        }
    }

    /// Whether both references observe the same address.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        ptr::eq(this.as_ptr(), other.as_ptr())
    }
}

impl<T> From<&Shared<T>> for Weak<T> {
    fn from(shared: &Shared<T>) -> Self {
        if let Some(raw) = shared.raw {
            raw.header().add_weak_ref();
        }
        Self {
            raw: shared.raw,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Weak<T> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(raw) = self.raw {
            raw.header().add_weak_ref();
        }
        Self {
            raw: self.raw,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Weak<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            unsafe { ControlBlock::release_weak(raw.block) };
        }
    }
}

impl<T> Default for Weak<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
