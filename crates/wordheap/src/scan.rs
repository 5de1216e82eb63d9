//! Conservative scanning of arbitrary memory regions.

use crate::gc::Marker;

/// Feed every aligned word of a memory region to `marker`.
///
/// Each word is treated as a potential pointer into the heap; the content is
/// never interpreted beyond that.
///
/// # Safety
///
/// `region_ptr` must be valid for reading `region_len` bytes.
pub(crate) unsafe fn scan_region_conservatively(
    region_ptr: *const u8,
    region_len: usize,
    marker: &mut Marker<'_>,
) {
    if region_ptr.is_null() || region_len == 0 {
        return;
    }

    let mut current = region_ptr as usize;
    let end = current + region_len;

    let align = std::mem::align_of::<usize>();
    if current % align != 0 {
        current += align - (current % align);
    }

    while current + std::mem::size_of::<usize>() <= end {
        // SAFETY: the caller guarantees the region is readable.
        let word = unsafe { (current as *const usize).read_unaligned() };
        marker.visit(word);
        current += align;
    }
}
