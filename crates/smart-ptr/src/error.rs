//! Error types.

use std::alloc::Layout;

use thiserror::Error;

/// Upgrading a [`Weak`](crate::Weak) through
/// [`Shared::try_from`](crate::Shared) failed: the object is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("bad weak reference: the managed object has already been destroyed")]
pub struct BadWeakRef;

/// A control block could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("control block allocation of {} bytes (align {}) failed", .layout.size(), .layout.align())]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    #[inline]
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The layout that could not be satisfied.
    #[inline]
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}

/// Failure of a fallible single-allocation factory.
///
/// Either way, no block became observable: memory that was obtained has
/// been returned to its allocator before this error was produced.
#[derive(Debug, Error)]
pub enum MakeError<E> {
    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("payload construction failed")]
    Construct(#[source] E),
}

impl<E> MakeError<E> {
    /// The payload constructor's own error, if that is what failed.
    pub fn into_construct(self) -> Option<E> {
        match self {
            MakeError::Construct(e) => Some(e),
            MakeError::Alloc(_) => None,
        }
    }
}
