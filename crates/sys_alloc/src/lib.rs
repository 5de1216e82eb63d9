//! Anonymous memory mappings for fixed-capacity arenas.
//!
//! A mapping is requested once, is zero-filled and page aligned, and is
//! returned to the OS when its [`Mmap`] handle is dropped. Nothing here ever
//! grows or moves a mapping.

use std::io;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;

/// An owned, zero-initialised anonymous mapping.
///
/// The memory stays valid and at the same address for as long as the handle
/// is alive.
pub struct Mmap {
    inner: os::MmapInner,
}

impl Mmap {
    /// Pointer to the first byte of the mapping.
    #[must_use]
    pub fn ptr(&self) -> *mut u8 {
        self.inner.ptr()
    }

    /// Length of the mapping in bytes, as requested.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if `addr` points inside `[ptr, ptr + len)`.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.ptr() as usize;
        addr >= base && addr < base + self.len()
    }
}

impl std::fmt::Debug for Mmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mmap")
            .field("ptr", &self.ptr())
            .field("len", &self.len())
            .finish()
    }
}

/// Configuration for creating an anonymous mapping.
#[derive(Debug, Clone, Default)]
pub struct MmapOptions {
    len: usize,
    populate: bool,
}

impl MmapOptions {
    /// Creates options with length 0. A length must be set before mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            len: 0,
            populate: false,
        }
    }

    /// Sets the length of the mapping in bytes.
    #[must_use]
    pub const fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Pre-faults the page tables (`MAP_POPULATE` on Linux; ignored elsewhere).
    #[must_use]
    pub const fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// Maps a fresh anonymous, zero-filled region.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero length, otherwise whatever error the
    /// OS reports for the mapping call.
    pub fn map_anon(&self) -> io::Result<Mmap> {
        if self.len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "length must be greater than 0",
            ));
        }

        // SAFETY: a fresh anonymous mapping aliases nothing; the handle owns it.
        let inner = unsafe { os::MmapInner::map_anon(self.len, self.populate)? };
        Ok(Mmap { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_zero_length_rejected() {
        let err = MmapOptions::new().map_anon().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_mapping_is_zeroed_and_writable() {
        let len = 4 * std::mem::size_of::<usize>();
        let mmap = MmapOptions::new().len(len).map_anon().expect("failed to map");

        let words = mmap.ptr().cast::<usize>();
        assert_eq!(words as usize % std::mem::align_of::<usize>(), 0);

        unsafe {
            for i in 0..4 {
                assert_eq!(ptr::read_volatile(words.add(i)), 0);
            }
            ptr::write_volatile(words.add(3), 42);
            assert_eq!(ptr::read_volatile(words.add(3)), 42);
        }
    }

    #[test]
    fn test_contains_bounds() {
        let mmap = MmapOptions::new().len(64).populate(true).map_anon().unwrap();
        let base = mmap.ptr() as usize;

        assert!(mmap.contains(base));
        assert!(mmap.contains(base + 63));
        assert!(!mmap.contains(base + 64));
        assert!(!mmap.contains(base.wrapping_sub(1)));
        assert_eq!(mmap.len(), 64);
    }
}
