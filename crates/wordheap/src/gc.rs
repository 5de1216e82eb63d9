//! Conservative mark-sweep collection.
//!
//! A cycle runs in two phases over the heap's own bookkeeping:
//!
//! 1. **Mark**: every candidate word from the root range is looked up in the
//!    allocated list. A hit on an unmarked chunk marks it and pushes it on an
//!    explicit work-list; popping a chunk scans its whole contents as more
//!    candidate words. Traversal depth is bounded by the work-list, not by
//!    the native stack.
//! 2. **Sweep**: every chunk left unmarked is released through the same path
//!    as [`Heap::release`].
//!
//! Any word that falls inside a live chunk keeps it alive, whether or not it
//! was meant as a pointer. Garbage may be retained; live chunks never are
//! freed.

use std::time::Instant;

use crate::arena::Arena;
use crate::chunk::ChunkList;
use crate::heap::Heap;
use crate::metrics::CollectStats;
use crate::scan::scan_region_conservatively;
use crate::stack;
use crate::tracing::{self as trace, Phase};

/// Marking state for one cycle.
pub(crate) struct Marker<'h> {
    arena_lo: usize,
    arena_hi: usize,
    allocated: &'h ChunkList,
    marks: &'h mut [bool],
    worklist: &'h mut Vec<usize>,
    limit: usize,
    words_scanned: usize,
}

impl<'h> Marker<'h> {
    fn new(
        arena: &Arena,
        allocated: &'h ChunkList,
        marks: &'h mut [bool],
        worklist: &'h mut Vec<usize>,
    ) -> Self {
        Self {
            arena_lo: arena.base(),
            arena_hi: arena.end(),
            allocated,
            marks,
            worklist,
            limit: allocated.capacity(),
            words_scanned: 0,
        }
    }

    /// Treat `word` as a potential pointer.
    #[inline]
    pub(crate) fn visit(&mut self, word: usize) {
        self.words_scanned += 1;
        if word < self.arena_lo || word >= self.arena_hi {
            return;
        }
        let Some(index) = self.allocated.find_containing(word) else {
            return;
        };
        if self.marks[index] {
            return;
        }
        self.marks[index] = true;
        assert!(
            self.worklist.len() < self.limit,
            "collector: mark work-list overflow ({} entries)",
            self.limit
        );
        self.worklist.push(index);
    }

    /// Scan pending chunks until the reachable set is closed.
    fn drain(&mut self) {
        while let Some(index) = self.worklist.pop() {
            let chunk = self.allocated.as_slice()[index];
            // SAFETY: allocated chunks lie inside the arena, which is mapped
            // for as long as the heap lives.
            unsafe {
                scan_region_conservatively(chunk.start as *const u8, chunk.size_bytes(), self);
            }
        }
    }
}

impl Heap {
    /// Run a mark-sweep cycle rooted at the stack.
    ///
    /// Scans from the current stack position to the bound recorded with
    /// [`Heap::set_stack_root_bound`] (or [`Heap::bind_to_thread_stack`]),
    /// after spilling callee-saved registers. Values living only in frames
    /// that have already returned are not seen.
    ///
    /// The stack is copied out before any marking state is built, so the
    /// collector's own frames never act as roots.
    ///
    /// # Panics
    ///
    /// Panics if no stack root bound has been recorded, or if the bound lies
    /// outside the current thread's stack where its extent is known.
    #[inline(never)]
    pub fn collect(&mut self) -> CollectStats {
        let Some(bound) = self.stack_root_bound else {
            panic!("collector: no stack root bound recorded; call set_stack_root_bound first");
        };
        if let Some(bounds) = stack::thread_stack_bounds() {
            assert!(
                bounds.contains(bound),
                "collector: stack root bound {bound:#x} is outside the current thread's stack \
                 ({:#x}..{:#x})",
                bounds.top,
                bounds.bottom
            );
        }

        // Nothing derived from the arena may be live in this frame before
        // the snapshot.
        let mut roots = std::mem::take(&mut self.stack_roots);
        roots.clear();
        // SAFETY: the bound was checked against this thread's stack above, or
        // recorded under the contract of `set_stack_root_bound`.
        unsafe { stack::spill_registers_and_scan(bound, |word| roots.push(word)) };

        let stats = self.run_cycle("stack", |marker| {
            for &word in &roots {
                marker.visit(word);
            }
        });
        roots.clear();
        self.stack_roots = roots;
        stats
    }

    /// Run a mark-sweep cycle rooted at the words of `roots`.
    pub fn collect_with_roots(&mut self, roots: &[usize]) -> CollectStats {
        self.run_cycle("slice", |marker| {
            for &word in roots {
                marker.visit(word);
            }
        })
    }

    /// Run a mark-sweep cycle rooted at the memory range `[lo, hi)`.
    ///
    /// # Safety
    ///
    /// The whole range must be readable for the duration of the call.
    pub unsafe fn collect_from_range(&mut self, lo: *const u8, hi: *const u8) -> CollectStats {
        let len = (hi as usize).saturating_sub(lo as usize);
        self.run_cycle("range", |marker| {
            // SAFETY: forwarded from the caller.
            unsafe { scan_region_conservatively(lo, len, marker) };
        })
    }

    fn run_cycle<F>(&mut self, root_source: &str, feed_roots: F) -> CollectStats
    where
        F: FnOnce(&mut Marker<'_>),
    {
        let id = trace::next_collect_id();
        let _span = trace::trace_collection(root_source, id);

        let mark_start = Instant::now();
        let words_scanned = {
            let _phase = trace::trace_phase(Phase::Mark);
            trace::log_phase_start(Phase::Mark, self.allocated.len());

            self.marks.clear();
            self.marks.resize(self.allocated.len(), false);
            self.worklist.clear();

            let mut marker = Marker::new(
                &self.arena,
                &self.allocated,
                &mut self.marks,
                &mut self.worklist,
            );
            feed_roots(&mut marker);
            marker.drain();
            marker.words_scanned
        };
        let marked = self.marks.iter().filter(|&&m| m).count();
        trace::log_phase_end(Phase::Mark, marked, words_scanned);
        let mark_duration = mark_start.elapsed();

        let sweep_start = Instant::now();
        let (chunks_reclaimed, words_reclaimed) = {
            let _phase = trace::trace_phase(Phase::Sweep);
            trace::log_phase_start(Phase::Sweep, self.allocated.len());
            let reclaimed = self.sweep();
            trace::log_phase_end(Phase::Sweep, reclaimed.0, reclaimed.1);
            reclaimed
        };
        let sweep_duration = sweep_start.elapsed();

        self.marks.clear();
        self.collections += 1;

        let stats = CollectStats {
            chunks_reclaimed,
            words_reclaimed,
            chunks_surviving: self.allocated.len(),
            words_surviving: self.allocated.total_words(),
            words_scanned,
            mark_duration,
            sweep_duration,
            total_collections: self.collections,
        };
        self.last_collect = Some(stats);
        self.check_paranoid();
        stats
    }

    /// Release every unmarked chunk. Returns `(chunks, words)` reclaimed.
    fn sweep(&mut self) -> (usize, usize) {
        let limit = self.allocated.capacity();
        let mut garbage = std::mem::take(&mut self.garbage);
        garbage.clear();

        for (index, &marked) in self.marks.iter().enumerate() {
            if !marked {
                assert!(
                    garbage.len() < limit,
                    "collector: release work-list overflow ({limit} entries)"
                );
                garbage.push(index);
            }
        }

        // Highest index first so the remaining indices stay valid.
        let mut words = 0;
        for &index in garbage.iter().rev() {
            words += self.allocated.as_slice()[index].size;
            self.release_at(index);
        }

        let chunks = garbage.len();
        self.garbage = garbage;
        (chunks, words)
    }
}
