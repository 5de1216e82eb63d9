use std::io::{self, Error};
#[cfg(not(miri))]
use std::ptr;

#[cfg(any(target_os = "linux", target_os = "android"))]
const MAP_POPULATE: libc::c_int = libc::MAP_POPULATE;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const MAP_POPULATE: libc::c_int = 0;

/// Alignment of the stand-in allocation used under Miri.
#[cfg(miri)]
const MIRI_PAGE_ALIGN: usize = 4096;

pub struct MmapInner {
    ptr: *mut libc::c_void,
    len: usize,
}

impl MmapInner {
    /// Maps `len` bytes of private, anonymous, read-write memory.
    ///
    /// # Safety
    ///
    /// Calls `mmap`; the returned handle must be the only owner of the region.
    pub unsafe fn map_anon(len: usize, populate: bool) -> io::Result<Self> {
        #[cfg(miri)]
        {
            let _ = populate;
            let layout = std::alloc::Layout::from_size_align(len, MIRI_PAGE_ALIGN)
                .map_err(|_| Error::from(io::ErrorKind::InvalidInput))?;
            let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
            if ptr.is_null() {
                return Err(Error::from(io::ErrorKind::OutOfMemory));
            }
            Ok(Self {
                ptr: ptr.cast::<libc::c_void>(),
                len,
            })
        }
        #[cfg(not(miri))]
        {
            let populate = if populate { MAP_POPULATE } else { 0 };
            let flags = libc::MAP_PRIVATE | libc::MAP_ANON | populate;
            let prot = libc::PROT_READ | libc::PROT_WRITE;

            let ptr = unsafe { libc::mmap(ptr::null_mut(), len, prot, flags, -1, 0) };

            if ptr == libc::MAP_FAILED {
                return Err(Error::last_os_error());
            }

            Ok(Self { ptr, len })
        }
    }

    pub const fn ptr(&self) -> *mut u8 {
        self.ptr.cast::<u8>()
    }

    pub const fn len(&self) -> usize {
        self.len
    }
}

impl Drop for MmapInner {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        #[cfg(miri)]
        unsafe {
            let layout = std::alloc::Layout::from_size_align_unchecked(self.len, MIRI_PAGE_ALIGN);
            std::alloc::dealloc(self.ptr.cast::<u8>(), layout);
        }
        #[cfg(not(miri))]
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}
