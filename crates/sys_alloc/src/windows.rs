use std::io::{self, Error};
#[cfg(not(miri))]
use std::ptr;

#[cfg(not(miri))]
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

/// Alignment of the stand-in allocation used under Miri.
#[cfg(miri)]
const MIRI_PAGE_ALIGN: usize = 4096;

pub struct MmapInner {
    ptr: *mut std::ffi::c_void,
    len: usize,
}

impl MmapInner {
    /// Commits `len` bytes of read-write memory. `VirtualAlloc` always hands
    /// back zeroed pages, so `populate` has nothing extra to do here.
    ///
    /// # Safety
    ///
    /// Calls `VirtualAlloc`; the returned handle must be the only owner of the region.
    pub unsafe fn map_anon(len: usize, _populate: bool) -> io::Result<Self> {
        #[cfg(miri)]
        {
            let layout = std::alloc::Layout::from_size_align(len, MIRI_PAGE_ALIGN)
                .map_err(|_| Error::from(io::ErrorKind::InvalidInput))?;
            let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
            if ptr.is_null() {
                return Err(Error::from(io::ErrorKind::OutOfMemory));
            }
            Ok(Self {
                ptr: ptr.cast::<std::ffi::c_void>(),
                len,
            })
        }
        #[cfg(not(miri))]
        {
            let ptr = unsafe {
                VirtualAlloc(ptr::null(), len, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE)
            };
            if ptr.is_null() {
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
            // MEM_RELEASE requires dwSize to be 0
            VirtualFree(self.ptr, 0, MEM_RELEASE);
        }
    }
}
