//! # smart-ptr
//!
//! Manual-lifetime ownership handles built on an atomically counted
//! control block.
//!
//! ## Features
//!
//! - **`Shared<T>`**: clonable strong handle; the object is destroyed when the last one goes
//! - **`Weak<T>`**: non-owning observer, upgraded with `lock()` (null on failure) or
//!   `Shared::try_from` (`BadWeakRef` on failure)
//! - **`Unique<T, D>`**: move-only exclusive owner with a pluggable `Deleter`; `Unique<[T]>`
//!   owns a slice and indexes like one
//! - **Two block layouts**: adopt an existing address (separate block) or build the object
//!   inside the block with `make_shared` (one allocation)
//! - **Custom allocators**: `allocate_shared` draws the block from any `BlockAlloc`
//! - **Lock-free**: counters are atomics, upgrades a bounded CAS loop
//!
//! ## Quick Start
//!
//! ```rust
//! use smart_ptr::{make_shared, Weak};
//!
//! let strong = make_shared(String::from("hello"));
//! let weak = Weak::from(&strong);
//!
//! assert_eq!(weak.lock().as_str(), "hello");
//! drop(strong); // Destroyed when the strong count hits 0
//! assert!(weak.expired());
//! ```
//!
//! Strong cycles are never collected; break them with `Weak`.

mod alloc;
mod control;
mod counter;
mod deleter;
mod error;
mod inline;
mod make;
mod separate;
mod shared;
mod unique;
mod weak;

pub use alloc::{BlockAlloc, Global};
pub use deleter::{DefaultDelete, Deleter};
pub use error::{AllocError, BadWeakRef, MakeError};
pub use make::{
    allocate_shared, make_shared, try_allocate_shared, try_allocate_shared_value, try_make_shared,
};
pub use shared::Shared;
pub use unique::{make_unique, make_unique_slice, Unique};
pub use weak::Weak;

#[cold]
#[track_caller]
#[allow(clippy::panic)]
fn null_deref(handle: &str) -> ! {
    panic!("dereferenced a null {handle} handle")
}
