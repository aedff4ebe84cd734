//! Software prefetch hints and the address plan used by the prefetching searches.
//!
//! From node `i` the plan targets `multiplier * i + offset`: the middle of the
//! run of `multiplier` consecutive descendants `log2(multiplier)` levels below
//! `i`. For `u32` those are the 16 nodes `16i + 15 ..= 16i + 30`, a single cache
//! line when the buffer is aligned, so one hint covers every node the search can
//! reach a few iterations later. Hints are never dereferenced; an out-of-range
//! target only costs a wasted prefetch.

/// Cache-line size assumed for prefetch planning and aligned allocation.
pub const CACHE_LINE: usize = 64;

/// Multiplier, offset and mask for prefetch target computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchPlan {
    multiplier: usize,
    offset: usize,
    mask: usize,
}

impl PrefetchPlan {
    /// Builds the plan for `len` elements of type `T`.
    pub fn new<T>(len: usize) -> Self {
        let multiplier = (CACHE_LINE / std::mem::size_of::<T>().max(1)).max(1);
        let offset = multiplier + multiplier / 2 - 1;
        Self {
            multiplier,
            offset,
            mask: mask_for(len),
        }
    }

    /// Elements per cache line (at least 1).
    pub fn multiplier(&self) -> usize {
        self.multiplier
    }

    /// Constant added to `multiplier * i`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Smallest `2^k - 1` that is at least the array length.
    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Unmasked prefetch position for node `i`. May lie past the buffer.
    #[inline(always)]
    pub fn target(&self, i: usize) -> usize {
        self.multiplier.wrapping_mul(i).wrapping_add(self.offset)
    }

    /// Prefetch position for node `i` folded into `0..=mask`.
    #[inline(always)]
    pub fn masked_target(&self, i: usize) -> usize {
        self.target(i) & self.mask
    }
}

/// Smallest power of two strictly greater than `len`, minus one.
fn mask_for(len: usize) -> usize {
    len.checked_add(1)
        .and_then(usize::checked_next_power_of_two)
        .map_or(usize::MAX, |p| p - 1)
}

/// Issues a read prefetch for `base + idx` elements.
///
/// The address is formed with wrapping arithmetic and never dereferenced, so
/// any `idx` is sound.
#[inline(always)]
pub(crate) fn prefetch_at<T>(base: *const T, idx: usize) {
    prefetch_read(base.wrapping_add(idx));
}

#[inline(always)]
fn prefetch_read<T>(ptr: *const T) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: prefetch is a hint and does not fault on invalid addresses.
    unsafe {
        std::arch::x86_64::_mm_prefetch::<{ std::arch::x86_64::_MM_HINT_T0 }>(ptr.cast::<i8>());
    }

    #[cfg(target_arch = "x86")]
    // SAFETY: prefetch is a hint and does not fault on invalid addresses.
    unsafe {
        std::arch::x86::_mm_prefetch::<{ std::arch::x86::_MM_HINT_T0 }>(ptr.cast::<i8>());
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: prfm never faults; the register is only read.
    unsafe {
        core::arch::asm!(
            "prfm pldl1keep, [{ptr}]",
            ptr = in(reg) ptr,
            options(nostack, preserves_flags, readonly)
        );
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = ptr;
    }
}
