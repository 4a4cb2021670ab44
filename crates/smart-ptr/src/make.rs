//! Single-allocation factories.
//!
//! These build the payload directly into an inline control block, so the
//! object and its counters share one allocation, and hand back a ready
//! [`Shared`]. Use [`Shared::from_raw`] or [`Shared::from_box`] instead to
//! adopt an object that already exists.

use crate::alloc::BlockAlloc;
use crate::error::{AllocError, MakeError};
use crate::shared::Shared;

/// Build `value` into a new inline block from the global allocator.
///
/// # Example
///
/// ```
/// let answer = smart_ptr::make_shared(42);
/// assert_eq!(*answer, 42);
/// assert_eq!(answer.use_count(), 1);
/// ```
#[inline]
pub fn make_shared<T>(value: T) -> Shared<T> {
    Shared::new(value)
}

/// Allocate an inline block, then build its payload with `init`.
///
/// If `init` fails the block is freed and the error comes back as
/// [`MakeError::Construct`].
///
/// ```
/// use smart_ptr::{try_make_shared, MakeError};
///
/// let parsed = try_make_shared(|| "17".parse::<u32>()).unwrap();
/// assert_eq!(*parsed, 17);
///
/// let failed = try_make_shared(|| "x".parse::<u32>());
/// assert!(matches!(failed, Err(MakeError::Construct(_))));
/// ```
#[inline]
pub fn try_make_shared<T, E, F>(init: F) -> Result<Shared<T>, MakeError<E>>
where
    F: FnOnce() -> Result<T, E>,
{
    Shared::try_new_with(init)
}

/// [`make_shared`] with the block memory drawn from a copy of `alloc`.
#[inline]
pub fn allocate_shared<T, A>(alloc: &A, value: T) -> Shared<T>
where
    A: BlockAlloc + Send + 'static,
{
    Shared::new_in(value, alloc.clone())
}

/// [`try_make_shared`] with the block memory drawn from a copy of `alloc`.
///
/// On any failure the memory is returned to `alloc` before the error
/// propagates.
#[inline]
pub fn try_allocate_shared<T, A, E, F>(alloc: &A, init: F) -> Result<Shared<T>, MakeError<E>>
where
    A: BlockAlloc + Send + 'static,
    F: FnOnce() -> Result<T, E>,
{
    Shared::try_new_with_in(init, alloc.clone())
}

/// [`allocate_shared`] that reports allocation failure instead of aborting.
#[inline]
pub fn try_allocate_shared_value<T, A>(alloc: &A, value: T) -> Result<Shared<T>, AllocError>
where
    A: BlockAlloc + Send + 'static,
{
    Shared::try_new_in(value, alloc.clone())
}
