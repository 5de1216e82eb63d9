//! The heap instance: one arena, its allocated and free chunk lists, and the
//! first-fit allocator over them.
//!
//! # Layout
//!
//! ```text
//!   arena base                                              arena end
//!   +--------+-----------+--------+--------------+-----------+
//!   | alloc  |   free    | alloc  |    alloc     |   free    |
//!   +--------+-----------+--------+--------------+-----------+
//!   allocated: [(base, 2), (base+5w, 2), (base+7w, 4)]
//!   freed:     [(base+2w, 3), (base+11w, 3)]
//! ```
//!
//! Every word of the arena belongs to exactly one chunk of exactly one list.
//! Free chunks are coalesced lazily, right before an allocation scans them.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::arena::Arena;
use crate::chunk::{Chunk, ChunkList};
use crate::config::HeapConfig;
use crate::metrics::{CollectStats, HeapStats};
use crate::stack;
use crate::tracing as trace;
use crate::WORD_SIZE;

/// Selects one of the heap's two chunk lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Live allocations.
    Allocated,
    /// Available regions.
    Freed,
}

impl ListKind {
    /// Label used by [`Heap::dump`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Allocated => "Allocated",
            Self::Freed => "Freed",
        }
    }
}

/// A fixed-capacity heap with a conservative collector.
///
/// All bookkeeping lives outside the arena, in lists sized once at
/// construction. Dropping the heap returns the arena to the OS.
///
/// The heap holds the arena's base address, which is also the address of the
/// lowest chunk. If the `Heap` value itself sits inside the scanned stack
/// range, that word conservatively keeps the lowest chunk alive. Box the heap
/// or use the thread-local heap in [`crate::global`] to avoid this.
///
/// `Heap` is neither `Send` nor `Sync`: its collector scans the stack of the
/// thread that calls [`Heap::collect`].
pub struct Heap {
    pub(crate) arena: Arena,
    pub(crate) allocated: ChunkList,
    pub(crate) freed: ChunkList,
    /// Merge target for coalescing; swapped with `freed` afterwards.
    scratch: ChunkList,
    pub(crate) marks: Vec<bool>,
    pub(crate) worklist: Vec<usize>,
    /// Indices of unmarked chunks collected by the sweep.
    pub(crate) garbage: Vec<usize>,
    pub(crate) stack_root_bound: Option<usize>,
    /// Stack words copied out by `collect` before marking.
    pub(crate) stack_roots: Vec<usize>,
    pub(crate) collections: usize,
    pub(crate) last_collect: Option<CollectStats>,
    _not_send: PhantomData<*mut ()>,
}

impl Heap {
    /// Create a heap with the default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to map the arena.
    pub fn new() -> io::Result<Self> {
        Self::with_config(HeapConfig::default())
    }

    /// Create a heap from `config`.
    ///
    /// The free list starts as a single chunk spanning the whole arena.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero capacity or zero list capacity, or
    /// the OS error if the arena cannot be mapped.
    pub fn with_config(config: HeapConfig) -> io::Result<Self> {
        config.validate()?;

        let arena = Arena::map(config.capacity_words, config.populate)?;
        let cap = config.list_capacity;

        let mut freed = ChunkList::with_capacity(cap);
        let whole = arena.whole();
        freed.insert(whole.start, whole.size);

        Ok(Self {
            arena,
            allocated: ChunkList::with_capacity(cap),
            freed,
            scratch: ChunkList::with_capacity(cap),
            marks: Vec::with_capacity(cap),
            worklist: Vec::with_capacity(cap),
            garbage: Vec::with_capacity(cap),
            stack_root_bound: None,
            stack_roots: Vec::new(),
            collections: 0,
            last_collect: None,
            _not_send: PhantomData,
        })
    }

    /// Arena size in words.
    #[must_use]
    pub const fn capacity_words(&self) -> usize {
        self.arena.capacity_words()
    }

    /// Address of the first arena word.
    #[must_use]
    pub fn arena_base(&self) -> usize {
        self.arena.base()
    }

    /// Whether `addr` points into this heap's arena.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.arena.contains(addr)
    }

    /// Live allocations, ascending by address.
    #[must_use]
    pub const fn allocated(&self) -> &ChunkList {
        &self.allocated
    }

    /// Free regions, ascending by address. Not necessarily coalesced.
    #[must_use]
    pub const fn freed(&self) -> &ChunkList {
        &self.freed
    }

    /// The list selected by `kind`.
    #[must_use]
    pub const fn list(&self, kind: ListKind) -> &ChunkList {
        match kind {
            ListKind::Allocated => &self.allocated,
            ListKind::Freed => &self.freed,
        }
    }

    /// Allocate `size_bytes`, rounded up to whole words.
    ///
    /// Free space is coalesced first, then the lowest-addressed free chunk
    /// that is large enough is split: its prefix becomes the allocation and
    /// any tail goes back to the free list.
    ///
    /// Returns `None` for a zero-size request, or when no free chunk is large
    /// enough. A failed request leaves the allocated list untouched.
    ///
    /// # Panics
    ///
    /// Panics if the allocated list is already at capacity.
    pub fn allocate(&mut self, size_bytes: usize) -> Option<NonNull<u8>> {
        let words = size_bytes.div_ceil(WORD_SIZE);
        if words == 0 {
            return None;
        }
        if words > self.capacity_words() {
            trace::log_alloc_failure(words, self.freed.total_words());
            return None;
        }

        self.coalesce();

        let Some(index) = self.freed.iter().position(|c| c.size >= words) else {
            trace::log_alloc_failure(words, self.freed.total_words());
            return None;
        };

        assert!(
            self.allocated.len() < self.allocated.capacity(),
            "heap: allocated list full ({} chunks)",
            self.allocated.capacity()
        );

        let chunk = self.freed.remove(index);
        self.allocated.insert(chunk.start, words);

        let tail = chunk.size - words;
        if tail > 0 {
            self.freed.insert(chunk.start + words * WORD_SIZE, tail);
        }

        self.check_paranoid();
        NonNull::new(chunk.start as *mut u8)
    }

    /// Return the chunk starting at `ptr` to the free list.
    ///
    /// The chunk is moved verbatim; it is only coalesced with its neighbours
    /// by a later allocation.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not the start of a live allocation of this heap,
    /// which covers double release and foreign pointers.
    pub fn release(&mut self, ptr: NonNull<u8>) {
        let start = ptr.as_ptr() as usize;
        let Some(index) = self.allocated.find(start) else {
            panic!("heap: release of {start:#x}, which is not a live allocation of this heap");
        };
        self.release_at(index);
        self.check_paranoid();
    }

    /// Move `allocated[index]` to the free list.
    pub(crate) fn release_at(&mut self, index: usize) {
        if self.freed.len() == self.freed.capacity() {
            self.coalesce();
        }

        let Some(&chunk) = self.allocated.get(index) else {
            panic!(
                "heap: release index {index} out of range (len {})",
                self.allocated.len()
            );
        };
        self.freed.insert(chunk.start, chunk.size);
        self.allocated.remove(index);
    }

    /// Merge adjacent free chunks into the minimal sorted set.
    pub fn coalesce(&mut self) {
        self.scratch.merge_from(&self.freed);
        std::mem::swap(&mut self.freed, &mut self.scratch);
    }

    /// Return every chunk to the free list, as if the heap were new.
    ///
    /// Any pointer previously handed out becomes dangling.
    pub fn reset(&mut self) {
        self.allocated.clear();
        self.freed.clear();
        let whole = self.arena.whole();
        self.freed.insert(whole.start, whole.size);
        self.last_collect = None;
    }

    /// Record the far end of the stack range scanned by [`Heap::collect`].
    ///
    /// Typically captured once with [`stack_marker!`](crate::stack_marker)
    /// near the top of the region whose locals should act as roots.
    /// [`Heap::collect`] rejects bounds outside the current thread's stack on
    /// platforms where its extent is known.
    ///
    /// # Safety
    ///
    /// Every later [`Heap::collect`] reads the memory between its own frame
    /// and `bound`. `bound` must be an address on the stack of the thread
    /// that collects, in a frame that is still live when it does.
    pub unsafe fn set_stack_root_bound(&mut self, bound: usize) {
        self.stack_root_bound = Some(bound);
    }

    /// Use the base of the current thread's stack as the root bound, so
    /// every live frame is scanned.
    ///
    /// Returns `false` (and leaves the bound unchanged) where thread stack
    /// bounds are not available.
    pub fn bind_to_thread_stack(&mut self) -> bool {
        match stack::thread_stack_bounds() {
            Some(bounds) => {
                self.stack_root_bound = Some(bounds.bottom);
                true
            }
            None => false,
        }
    }

    /// The recorded stack root bound, if any.
    #[must_use]
    pub const fn stack_root_bound(&self) -> Option<usize> {
        self.stack_root_bound
    }

    /// Statistics from the most recent collection.
    #[must_use]
    pub const fn last_collect_stats(&self) -> Option<CollectStats> {
        self.last_collect
    }

    /// Current occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            capacity_words: self.capacity_words(),
            allocated_words: self.allocated.total_words(),
            free_words: self.freed.total_words(),
            allocated_chunks: self.allocated.len(),
            free_chunks: self.freed.len(),
            largest_free_words: self.freed.iter().map(|c| c.size).max().unwrap_or(0),
        }
    }

    /// Diagnostic listing of one chunk list.
    #[must_use]
    pub fn dump(&self, kind: ListKind) -> String {
        self.list(kind).dump(kind.label())
    }

    /// Check every bookkeeping invariant.
    ///
    /// - both lists strictly ascending, no zero-size chunks
    /// - every chunk inside the arena and word aligned
    /// - no overlap across the two lists
    /// - allocated plus free words equal the arena capacity
    ///
    /// # Panics
    ///
    /// Panics describing the first violation found.
    pub fn verify(&self) {
        for kind in [ListKind::Allocated, ListKind::Freed] {
            let list = self.list(kind);
            for pair in list.as_slice().windows(2) {
                assert!(
                    pair[0].start < pair[1].start,
                    "heap: {} list out of order at {:#x}",
                    kind.label(),
                    pair[1].start
                );
            }
            for chunk in list {
                assert!(
                    chunk.size > 0,
                    "heap: zero-size chunk at {:#x} in {} list",
                    chunk.start,
                    kind.label()
                );
                assert!(
                    self.arena.holds(chunk),
                    "heap: chunk {chunk:?} in {} list lies outside the arena",
                    kind.label()
                );
            }
        }

        let mut all: Vec<Chunk> = self
            .allocated
            .iter()
            .chain(self.freed.iter())
            .copied()
            .collect();
        all.sort_unstable_by_key(|c| c.start);
        for pair in all.windows(2) {
            assert!(
                !pair[0].overlaps(&pair[1]),
                "heap: chunks {:?} and {:?} overlap",
                pair[0],
                pair[1]
            );
        }

        let total = self.allocated.total_words() + self.freed.total_words();
        assert_eq!(
            total,
            self.capacity_words(),
            "heap: word conservation violated ({} allocated + {} free != {})",
            self.allocated.total_words(),
            self.freed.total_words(),
            self.capacity_words()
        );
    }

    #[inline]
    pub(crate) fn check_paranoid(&self) {
        #[cfg(feature = "paranoid")]
        self.verify();
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("arena", &self.arena)
            .field("allocated", &self.allocated)
            .field("freed", &self.freed)
            .field("stack_root_bound", &self.stack_root_bound)
            .finish_non_exhaustive()
    }
}
