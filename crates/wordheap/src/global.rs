//! A per-thread default heap behind free functions.
//!
//! This is the classic "one heap per program" surface: [`init`] once near
//! the top of the thread, then call [`allocate`], [`release`], [`collect`]
//! and [`dump`] from anywhere below. The heap lives in thread-local storage,
//! outside the scanned stack range.
//!
//! ```
//! use wordheap::{global, HeapConfig, ListKind};
//!
//! global::init(HeapConfig::new().capacity_words(32)).unwrap();
//! let p = global::allocate(16).unwrap();
//! global::release(p);
//! assert!(global::dump(ListKind::Allocated).starts_with("Allocated Chunks (0)"));
//! global::teardown();
//! ```

use std::cell::RefCell;
use std::io;
use std::ptr::NonNull;

use crate::config::HeapConfig;
use crate::heap::{Heap, ListKind};
use crate::metrics::CollectStats;

thread_local! {
    static HEAP: RefCell<Option<Heap>> = const { RefCell::new(None) };
}

/// Create this thread's heap.
///
/// # Errors
///
/// `AlreadyExists` if the thread already has a heap, otherwise any error
/// from [`Heap::with_config`].
pub fn init(config: HeapConfig) -> io::Result<()> {
    HEAP.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "thread heap already initialised",
            ));
        }
        *slot = Some(Heap::with_config(config)?);
        Ok(())
    })
}

/// Drop this thread's heap, unmapping its arena. Returns whether one existed.
///
/// Every pointer obtained from the heap dangles afterwards.
pub fn teardown() -> bool {
    HEAP.with(|slot| slot.borrow_mut().take()).is_some()
}

/// Whether [`init`] has run on this thread (and [`teardown`] has not).
#[must_use]
pub fn is_initialized() -> bool {
    HEAP.with(|slot| slot.borrow().is_some())
}

/// Run `f` with exclusive access to this thread's heap.
///
/// # Panics
///
/// Panics if the heap is not initialised, or if called re-entrantly from
/// inside another `with_heap`.
pub fn with_heap<F, R>(f: F) -> R
where
    F: FnOnce(&mut Heap) -> R,
{
    HEAP.with(|slot| {
        let mut slot = slot.borrow_mut();
        let Some(heap) = slot.as_mut() else {
            panic!("wordheap: thread heap used before init()");
        };
        f(heap)
    })
}

/// [`Heap::allocate`] on the thread heap.
pub fn allocate(size_bytes: usize) -> Option<NonNull<u8>> {
    with_heap(|heap| heap.allocate(size_bytes))
}

/// [`Heap::release`] on the thread heap.
pub fn release(ptr: NonNull<u8>) {
    with_heap(|heap| heap.release(ptr));
}

/// [`Heap::collect`] on the thread heap.
pub fn collect() -> CollectStats {
    with_heap(Heap::collect)
}

/// [`Heap::dump`] on the thread heap.
pub fn dump(kind: ListKind) -> String {
    with_heap(|heap| heap.dump(kind))
}

/// [`Heap::set_stack_root_bound`] on the thread heap.
///
/// # Safety
///
/// Same contract as [`Heap::set_stack_root_bound`].
pub unsafe fn set_stack_root_bound(bound: usize) {
    // SAFETY: forwarded from the caller.
    with_heap(|heap| unsafe { heap.set_stack_root_bound(bound) });
}
