//! Conservative stack scanning for root discovery.
//!
//! The collector treats every aligned word between the current stack
//! position and a caller-recorded bound as a potential pointer. Callee-saved
//! registers are spilled into the scanning frame first so values that only
//! live in a register of some caller are still seen.

/// Bounds of a thread's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBounds {
    /// The bottom of the stack (highest address).
    pub bottom: usize,
    /// The top of the stack (lowest address).
    pub top: usize,
}

impl StackBounds {
    /// Whether `addr` lies within the stack, the bottom address included.
    #[must_use]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.top && addr <= self.bottom
    }
}

/// Retrieve the stack bounds for the current thread.
#[cfg(all(target_os = "linux", not(miri)))]
#[must_use]
pub fn thread_stack_bounds() -> Option<StackBounds> {
    use libc::{
        pthread_attr_destroy, pthread_attr_getstack, pthread_attr_t, pthread_getattr_np,
        pthread_self,
    };

    unsafe {
        let mut attr: pthread_attr_t = std::mem::zeroed();
        if pthread_getattr_np(pthread_self(), &raw mut attr) != 0 {
            return None;
        }

        let mut stackaddr: *mut libc::c_void = std::ptr::null_mut();
        let mut stacksize: libc::size_t = 0;
        let ret = pthread_attr_getstack(&raw const attr, &raw mut stackaddr, &raw mut stacksize);
        pthread_attr_destroy(&raw mut attr);
        if ret != 0 {
            return None;
        }

        let top = stackaddr as usize;
        Some(StackBounds {
            bottom: top + stacksize,
            top,
        })
    }
}

/// Retrieve the stack bounds for the current thread.
#[cfg(all(target_vendor = "apple", not(miri)))]
#[must_use]
pub fn thread_stack_bounds() -> Option<StackBounds> {
    unsafe {
        let thread = libc::pthread_self();
        let bottom = libc::pthread_get_stackaddr_np(thread) as usize;
        let size = libc::pthread_get_stacksize_np(thread);
        Some(StackBounds {
            bottom,
            top: bottom - size,
        })
    }
}

/// Stack bounds are unavailable here; callers must record a bound with
/// [`stack_marker`] instead.
#[cfg(any(miri, not(any(target_os = "linux", target_vendor = "apple"))))]
#[must_use]
pub const fn thread_stack_bounds() -> Option<StackBounds> {
    None
}

/// Address of a local in the calling frame.
///
/// Record this near the top of the region whose locals should act as roots;
/// frames called from there sit at lower addresses and are covered by the
/// scan. Locals of the recording frame itself may fall on either side of the
/// marker, so keep the roots you care about in callees or use
/// [`thread_stack_bounds`].
#[macro_export]
macro_rules! stack_marker {
    () => {{
        let marker = 0usize;
        ::core::hint::black_box(&marker) as *const usize as usize
    }};
}

/// Spill callee-saved registers and feed every candidate word to `scan_fn`.
///
/// Words are read from the current stack position up to `bound` (in either
/// direction, whichever side `bound` is on), followed by the spilled
/// register values.
///
/// # Safety
///
/// `bound` must delimit memory on the current thread's stack that is still
/// mapped, i.e. it was recorded in a frame that has not yet returned or it
/// lies inside [`thread_stack_bounds`].
#[inline(never)]
pub unsafe fn spill_registers_and_scan<F>(bound: usize, mut scan_fn: F)
where
    F: FnMut(usize),
{
    #[cfg(all(target_arch = "x86_64", not(miri)))]
    let mut regs = [0usize; 6];
    #[cfg(all(target_arch = "x86_64", not(miri)))]
    unsafe {
        std::arch::asm!(
            "mov {0}, rbx",
            "mov {1}, rbp",
            "mov {2}, r12",
            "mov {3}, r13",
            "mov {4}, r14",
            "mov {5}, r15",
            out(reg) regs[0],
            out(reg) regs[1],
            out(reg) regs[2],
            out(reg) regs[3],
            out(reg) regs[4],
            out(reg) regs[5],
        );
    }

    // No asm for this target: a stack array behind an optimization barrier
    // at least forces the compiler to flush live values to memory.
    #[cfg(any(not(target_arch = "x86_64"), miri))]
    let regs = [0usize; 32];

    std::hint::black_box(&regs);

    for r in &regs {
        scan_fn(*r);
    }

    // The current stack pointer is approximately the address of a local.
    let sp = std::ptr::addr_of!(scan_fn) as usize;
    let (lo, hi) = if sp <= bound { (sp, bound) } else { (bound, sp) };

    let mut current = lo & !(std::mem::align_of::<usize>() - 1);
    while current + std::mem::size_of::<usize>() <= hi {
        // SAFETY: [lo, hi) is live stack of this thread per the caller's contract.
        let word = unsafe { std::ptr::read_volatile(current as *const usize) };
        scan_fn(word);
        current += std::mem::size_of::<usize>();
    }
}
