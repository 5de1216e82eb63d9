//! The fixed backing store every chunk lives in.

use std::io;

use sys_alloc::{Mmap, MmapOptions};

use crate::chunk::Chunk;
use crate::WORD_SIZE;

/// A zero-filled, word-aligned buffer of `capacity_words` words.
///
/// The mapping is obtained once and released when the arena is dropped; its
/// base address never changes in between.
#[derive(Debug)]
pub struct Arena {
    map: Mmap,
    capacity_words: usize,
}

impl Arena {
    /// Map a fresh arena of `capacity_words` words.
    pub(crate) fn map(capacity_words: usize, populate: bool) -> io::Result<Self> {
        let map = MmapOptions::new()
            .len(capacity_words * WORD_SIZE)
            .populate(populate)
            .map_anon()?;
        Ok(Self {
            map,
            capacity_words,
        })
    }

    /// Address of the first word.
    #[inline]
    #[must_use]
    pub fn base(&self) -> usize {
        self.map.ptr() as usize
    }

    /// One-past-the-end address.
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.base() + self.capacity_words * WORD_SIZE
    }

    /// Size in words.
    #[inline]
    #[must_use]
    pub const fn capacity_words(&self) -> usize {
        self.capacity_words
    }

    /// The chunk spanning the whole arena.
    pub(crate) fn whole(&self) -> Chunk {
        Chunk::new(self.base(), self.capacity_words)
    }

    /// Whether `addr` points into the arena.
    #[inline]
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.map.contains(addr)
    }

    /// Whether `chunk` lies entirely inside the arena and is word aligned.
    pub(crate) fn holds(&self, chunk: &Chunk) -> bool {
        chunk.start % WORD_SIZE == 0 && chunk.start >= self.base() && chunk.end() <= self.end()
    }
}
