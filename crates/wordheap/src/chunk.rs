//! Address-ordered chunk bookkeeping.
//!
//! A [`ChunkList`] is the only data structure the heap uses to track both
//! live allocations and free space. It never allocates after construction:
//! its storage is reserved up front and exceeding it is a fatal error.

use std::fmt;

use crate::WORD_SIZE;

/// A contiguous run of words inside the arena.
///
/// `start` is a byte address (always word aligned), `size` is a word count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Address of the first word.
    pub start: usize,
    /// Length in words. Never zero for a chunk stored in a list.
    pub size: usize,
}

impl Chunk {
    /// Create a chunk covering `size` words from `start`.
    #[must_use]
    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// One-past-the-end byte address.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.size * WORD_SIZE
    }

    /// Size of the chunk in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        self.size * WORD_SIZE
    }

    /// Whether `addr` lies in `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Whether the two chunks share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// A capacity-bounded list of chunks kept sorted ascending by `start`.
///
/// # Invariants
///
/// - Entries are strictly ascending by `start`.
/// - No entry has `size == 0`.
/// - `len() <= capacity()`.
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkList {
    chunks: Vec<Chunk>,
    capacity: usize,
}

impl ChunkList {
    /// Create an empty list able to hold `capacity` chunks.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chunks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of chunks currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the list holds no chunks.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Maximum number of chunks this list may hold.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Chunk at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Iterate chunks in ascending address order.
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// The chunks as a sorted slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Sum of all chunk sizes, in words.
    #[must_use]
    pub fn total_words(&self) -> usize {
        self.chunks.iter().map(|c| c.size).sum()
    }

    /// Index of the chunk whose `start` is exactly `start`.
    #[must_use]
    pub fn find(&self, start: usize) -> Option<usize> {
        self.chunks.iter().position(|c| c.start == start)
    }

    /// Index of the chunk whose `[start, end)` range contains `addr`.
    ///
    /// Relies on the list being sorted and non-overlapping, so a binary
    /// search gives the same answer as testing every chunk.
    #[inline]
    #[must_use]
    pub fn find_containing(&self, addr: usize) -> Option<usize> {
        let idx = self.chunks.partition_point(|c| c.start <= addr);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        self.chunks[candidate].contains(addr).then_some(candidate)
    }

    /// Insert a chunk, restoring ascending order by adjacent swaps.
    ///
    /// # Panics
    ///
    /// Panics if the list is full or `size` is zero.
    pub fn insert(&mut self, start: usize, size: usize) {
        assert!(size > 0, "chunk list: refusing zero-size chunk at {start:#x}");
        assert!(
            self.chunks.len() < self.capacity,
            "chunk list: capacity of {} chunks exceeded",
            self.capacity
        );

        self.chunks.push(Chunk::new(start, size));

        let mut i = self.chunks.len() - 1;
        while i > 0 && self.chunks[i].start < self.chunks[i - 1].start {
            self.chunks.swap(i, i - 1);
            i -= 1;
        }
    }

    /// Remove and return the chunk at `index`, shifting later entries down.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Chunk {
        assert!(
            index < self.chunks.len(),
            "chunk list: index {index} out of range (len {})",
            self.chunks.len()
        );
        self.chunks.remove(index)
    }

    /// Drop every entry, keeping the reserved storage.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Rebuild `self` from `src`, fusing neighbours that touch.
    ///
    /// Two consecutive chunks fuse when `prior.end() == next.start`. The
    /// result is the minimal sorted set covering exactly the same words, so
    /// merging an already-merged list is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the merged result would not fit in `self`'s capacity.
    pub fn merge_from(&mut self, src: &Self) {
        self.chunks.clear();
        for chunk in src.iter() {
            match self.chunks.last_mut() {
                Some(top) if top.end() == chunk.start => top.size += chunk.size,
                _ => self.insert(chunk.start, chunk.size),
            }
        }
    }

    /// Human-readable listing of every `(start, size)` pair.
    #[must_use]
    pub fn dump(&self, label: &str) -> String {
        format!("{label} {self}")
    }
}

impl fmt::Display for ChunkList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chunks ({}):", self.chunks.len())?;
        for chunk in &self.chunks {
            writeln!(f, "  start: {:#x}, size: {}", chunk.start, chunk.size)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkList")
            .field("len", &self.chunks.len())
            .field("capacity", &self.capacity)
            .field("chunks", &self.chunks)
            .finish()
    }
}

impl<'a> IntoIterator for &'a ChunkList {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = WORD_SIZE;
    const BASE: usize = 0x1000;

    fn addr(word: usize) -> usize {
        BASE + word * W
    }

    fn list_of(chunks: &[(usize, usize)]) -> ChunkList {
        let mut list = ChunkList::with_capacity(16);
        for &(word, size) in chunks {
            list.insert(addr(word), size);
        }
        list
    }

    fn is_sorted(list: &ChunkList) -> bool {
        list.as_slice().windows(2).all(|w| w[0].start < w[1].start)
    }

    #[test]
    fn new_list_is_empty() {
        let list = ChunkList::with_capacity(4);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 4);
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let list = list_of(&[(10, 1), (2, 3), (7, 1), (0, 2), (20, 5)]);
        assert!(is_sorted(&list));
        let starts: Vec<usize> = list.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![addr(0), addr(2), addr(7), addr(10), addr(20)]);
    }

    #[test]
    fn find_is_exact_start_match() {
        let list = list_of(&[(0, 4), (8, 2)]);
        assert_eq!(list.find(addr(8)), Some(1));
        assert_eq!(list.find(addr(1)), None);
    }

    #[test]
    fn find_containing_handles_interior_and_gaps() {
        let list = list_of(&[(0, 4), (8, 2)]);
        assert_eq!(list.find_containing(addr(0)), Some(0));
        assert_eq!(list.find_containing(addr(3) + W - 1), Some(0));
        assert_eq!(list.find_containing(addr(4)), None);
        assert_eq!(list.find_containing(addr(9)), Some(1));
        assert_eq!(list.find_containing(addr(10)), None);
        assert_eq!(list.find_containing(BASE - 1), None);
    }

    #[test]
    fn remove_shifts_later_entries() {
        let mut list = list_of(&[(0, 1), (2, 1), (4, 1)]);
        let removed = list.remove(1);
        assert_eq!(removed, Chunk::new(addr(2), 1));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).map(|c| c.start), Some(addr(4)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn remove_out_of_range_panics() {
        let mut list = list_of(&[(0, 1)]);
        list.remove(1);
    }

    #[test]
    #[should_panic(expected = "capacity of 2 chunks exceeded")]
    fn insert_past_capacity_panics() {
        let mut list = ChunkList::with_capacity(2);
        list.insert(addr(0), 1);
        list.insert(addr(1), 1);
        list.insert(addr(2), 1);
    }

    #[test]
    #[should_panic(expected = "zero-size")]
    fn insert_zero_size_panics() {
        let mut list = ChunkList::with_capacity(2);
        list.insert(addr(0), 0);
    }

    #[test]
    fn merge_fuses_touching_neighbours() {
        let src = list_of(&[(0, 2), (2, 3), (6, 1), (7, 1), (10, 2)]);
        let mut dst = ChunkList::with_capacity(16);
        dst.merge_from(&src);

        assert_eq!(
            dst.as_slice(),
            &[
                Chunk::new(addr(0), 5),
                Chunk::new(addr(6), 2),
                Chunk::new(addr(10), 2)
            ]
        );
        assert_eq!(dst.total_words(), src.total_words());
    }

    #[test]
    fn merge_is_idempotent() {
        let src = list_of(&[(3, 1), (0, 3), (4, 4), (12, 1), (9, 3)]);
        let mut once = ChunkList::with_capacity(16);
        once.merge_from(&src);
        let mut twice = ChunkList::with_capacity(16);
        twice.merge_from(&once);

        assert_eq!(once, twice);
        assert!(once.len() <= src.len());
        assert_eq!(once.as_slice(), &[Chunk::new(addr(0), 13)]);
    }

    #[test]
    fn merge_replaces_previous_contents() {
        let mut dst = list_of(&[(40, 1)]);
        dst.merge_from(&list_of(&[(0, 1)]));
        assert_eq!(dst.as_slice(), &[Chunk::new(addr(0), 1)]);
    }

    #[test]
    fn dump_lists_every_chunk() {
        let list = list_of(&[(0, 2), (5, 1)]);
        let out = list.dump("Freed");
        assert!(out.starts_with("Freed Chunks (2):"));
        assert!(out.contains(&format!("start: {:#x}, size: 2", addr(0))));
        assert!(out.contains(&format!("start: {:#x}, size: 1", addr(5))));
    }

    #[test]
    fn overlap_detection() {
        let a = Chunk::new(addr(0), 2);
        assert!(a.overlaps(&Chunk::new(addr(1), 5)));
        assert!(!a.overlaps(&Chunk::new(addr(2), 1)));
    }
}
