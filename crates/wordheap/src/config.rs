//! Heap construction parameters.

use std::io;

use crate::WORD_SIZE;

/// Default arena size in bytes (the classic 640 KB).
pub const DEFAULT_CAPACITY_BYTES: usize = 640_000;

/// Default maximum number of chunks per list.
pub const DEFAULT_LIST_CAPACITY: usize = 1024;

/// Configuration for a [`Heap`](crate::Heap).
///
/// # Example
///
/// ```
/// use wordheap::{Heap, HeapConfig};
///
/// let heap = Heap::with_config(HeapConfig::new().capacity_words(64).list_capacity(16)).unwrap();
/// assert_eq!(heap.capacity_words(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena size in words.
    pub capacity_words: usize,
    /// Maximum chunks held by each of the allocated and free lists.
    pub list_capacity: usize,
    /// Pre-fault the arena pages when mapping it.
    pub populate: bool,
}

impl HeapConfig {
    /// Defaults: 640 KB arena, 1024 chunks per list, lazy paging.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity_words: DEFAULT_CAPACITY_BYTES / WORD_SIZE,
            list_capacity: DEFAULT_LIST_CAPACITY,
            populate: false,
        }
    }

    /// Set the arena size in words.
    #[must_use]
    pub const fn capacity_words(mut self, words: usize) -> Self {
        self.capacity_words = words;
        self
    }

    /// Set the arena size in bytes, rounded up to whole words.
    #[must_use]
    pub const fn capacity_bytes(mut self, bytes: usize) -> Self {
        self.capacity_words = bytes.div_ceil(WORD_SIZE);
        self
    }

    /// Set the per-list chunk capacity.
    #[must_use]
    pub const fn list_capacity(mut self, chunks: usize) -> Self {
        self.list_capacity = chunks;
        self
    }

    /// Pre-fault arena pages at construction.
    #[must_use]
    pub const fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    pub(crate) fn validate(&self) -> io::Result<()> {
        if self.capacity_words == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "heap capacity must be at least one word",
            ));
        }
        if self.list_capacity == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "chunk list capacity must be at least one",
            ));
        }
        if self.capacity_words.checked_mul(WORD_SIZE).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "heap capacity overflows the address space",
            ));
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}
