//! A fixed-capacity word heap with a conservative garbage collector.
//!
//! `wordheap` manages one arena of machine words obtained from the OS at
//! construction. Space is tracked by two address-sorted chunk lists, one for
//! live allocations and one for free regions. Allocation is first-fit over the
//! free list after coalescing adjacent free chunks; release moves a chunk back
//! verbatim. A conservative **mark-sweep** collector treats every word of the
//! stack (or of an explicit root range) and of every reachable chunk as a
//! potential pointer, and releases whatever it cannot reach.
//!
//! # Quick Start
//!
//! ```
//! use wordheap::{Heap, HeapConfig, ListKind, WORD_SIZE};
//!
//! let mut heap = Heap::with_config(HeapConfig::new().capacity_words(10)).unwrap();
//!
//! let a = heap.allocate(2 * WORD_SIZE).unwrap();
//! let b = heap.allocate(3 * WORD_SIZE).unwrap();
//! heap.release(a);
//!
//! // First fit reuses the lowest free address.
//! let c = heap.allocate(2 * WORD_SIZE).unwrap();
//! assert_eq!(a, c);
//!
//! // Only `b` is referenced from the roots; `c` is reclaimed.
//! let stats = heap.collect_with_roots(&[b.as_ptr() as usize]);
//! assert_eq!(stats.chunks_reclaimed, 1);
//! println!("{}", heap.dump(ListKind::Allocated));
//! ```
//!
//! # Stack roots
//!
//! [`Heap::collect`] scans the calling thread's stack from the current frame
//! to a bound recorded beforehand with [`Heap::bind_to_thread_stack`] or the
//! unsafe [`Heap::set_stack_root_bound`] (for example from [`stack_marker!`]).
//! The collector snapshots that range before building any marking state, so
//! only the caller's frames and spilled registers act as roots.
//!
//! # Thread Safety
//!
//! A [`Heap`] is `!Send` and `!Sync`; [`global`] offers one heap per thread.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod arena;
mod chunk;
mod config;
mod gc;
pub mod global;
mod heap;
mod metrics;
mod scan;
pub mod stack;
mod tracing;

/// Size of the allocation granule in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

pub use chunk::{Chunk, ChunkList};
pub use config::{HeapConfig, DEFAULT_CAPACITY_BYTES, DEFAULT_LIST_CAPACITY};
pub use heap::{Heap, ListKind};
pub use metrics::{CollectStats, HeapStats};
pub use stack::{thread_stack_bounds, StackBounds};

