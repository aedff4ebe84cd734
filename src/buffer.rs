//! Owned element storage for an Eytzinger array.
//!
//! Two allocation disciplines are supported:
//!
//! - [`Alignment::Unaligned`]: an ordinary boxed slice.
//! - [`Alignment::CacheLine`]: a 64-byte aligned allocation with one element of
//!   headroom. The usable view starts one element past the allocation base, so
//!   node `i` sits at byte `(i + 1) * size_of::<T>()`. Each tree level then starts
//!   on a cache-line boundary once it is wider than a line, and prefetch targets
//!   computed for the root stay inside the allocation. The raw base is kept
//!   separately and is the pointer handed back to the allocator.

use std::alloc::{self, Layout};
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::prefetch::CACHE_LINE;

/// Allocation discipline for the element buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Plain heap allocation.
    #[default]
    Unaligned,
    /// Cache-line aligned allocation, usable region offset by one element.
    CacheLine,
}

pub(crate) struct Buffer<T> {
    storage: Storage<T>,
    len: usize,
}

enum Storage<T> {
    Heap(Box<[T]>),
    Aligned(AlignedAlloc<T>),
}

/// A raw aligned allocation plus the usable view into it.
struct AlignedAlloc<T> {
    /// Allocation base, released on drop.
    base: NonNull<u8>,
    layout: Layout,
    /// First usable element, one `T` past `base`.
    usable: NonNull<T>,
}

impl<T: Copy> Buffer<T> {
    /// Allocates `len` slots with the given discipline and lets `fill`
    /// initialise them. `fill` must write every slot when it returns `Ok`.
    pub(crate) fn try_fill<E>(
        len: usize,
        alignment: Alignment,
        fill: impl FnOnce(&mut [MaybeUninit<T>]) -> Result<(), E>,
    ) -> Result<Self, E> {
        let storage = match alignment {
            Alignment::Unaligned => Storage::Heap(fill_heap(len, fill)?),
            // Zero-sized elements have no addresses worth aligning.
            Alignment::CacheLine if std::mem::size_of::<T>() == 0 => {
                Storage::Heap(fill_heap(len, fill)?)
            }
            Alignment::CacheLine => Storage::Aligned(AlignedAlloc::try_fill(len, fill)?),
        };
        Ok(Self { storage, len })
    }
}

impl<T> Buffer<T> {
    #[inline(always)]
    pub(crate) fn as_slice(&self) -> &[T] {
        match &self.storage {
            Storage::Heap(values) => &values[..],
            // SAFETY: `usable` points at `len` initialised elements inside the
            // allocation, which lives as long as `self`.
            Storage::Aligned(raw) => unsafe {
                std::slice::from_raw_parts(raw.usable.as_ptr(), self.len)
            },
        }
    }
}

fn fill_heap<T, E>(
    len: usize,
    fill: impl FnOnce(&mut [MaybeUninit<T>]) -> Result<(), E>,
) -> Result<Box<[T]>, E> {
    let mut slots = Box::<[T]>::new_uninit_slice(len);
    fill(&mut slots[..])?;
    // SAFETY: `fill` returned Ok, so every slot has been written.
    Ok(unsafe { slots.assume_init() })
}

impl<T> AlignedAlloc<T> {
    fn try_fill<E>(
        len: usize,
        fill: impl FnOnce(&mut [MaybeUninit<T>]) -> Result<(), E>,
    ) -> Result<Self, E> {
        let layout = Layout::array::<T>(len + 1)
            .and_then(|layout| layout.align_to(CACHE_LINE.max(std::mem::align_of::<T>())))
            .unwrap_or_else(|_| capacity_overflow());
        debug_assert!(layout.size() > 0);

        // SAFETY: layout has non-zero size (at least one non-ZST element).
        let ptr = unsafe { alloc::alloc(layout) };
        let Some(base) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout);
        };
        // SAFETY: the allocation holds `len + 1` elements, so one past the base
        // is in bounds, and the base alignment satisfies `T`.
        let usable = unsafe { base.cast::<T>().add(1) };
        let raw = Self {
            base,
            layout,
            usable,
        };

        // SAFETY: `usable` starts `len` writable slots inside the allocation.
        // MaybeUninit<T> has the layout of T.
        let slots = unsafe {
            std::slice::from_raw_parts_mut(usable.as_ptr().cast::<MaybeUninit<T>>(), len)
        };
        // On error `raw` drops here and releases the allocation.
        fill(slots)?;
        Ok(raw)
    }
}

impl<T> Drop for AlignedAlloc<T> {
    fn drop(&mut self) {
        // SAFETY: `base` and `layout` are exactly what `alloc` returned and was
        // given. Elements are `Copy` in every constructed buffer, so there is
        // nothing to drop in place.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

// SAFETY: the buffer exclusively owns its allocation, like `Box<[T]>`.
unsafe impl<T: Send> Send for Buffer<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync> Sync for Buffer<T> {}

#[cold]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_sequential(slots: &mut [MaybeUninit<u32>]) -> Result<(), ()> {
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.write(i as u32 * 10);
        }
        Ok(())
    }

    #[test]
    fn heap_buffer_holds_values() {
        let buffer = Buffer::try_fill(5, Alignment::Unaligned, fill_sequential).unwrap();
        assert_eq!(buffer.as_slice(), &[0, 10, 20, 30, 40]);
    }

    #[test]
    fn aligned_buffer_is_offset_by_one_element() {
        let buffer = Buffer::try_fill(100, Alignment::CacheLine, fill_sequential).unwrap();
        let values = buffer.as_slice();
        assert_eq!(values.len(), 100);
        assert_eq!(values[99], 990);

        let addr = values.as_ptr() as usize;
        assert_eq!((addr - std::mem::size_of::<u32>()) % CACHE_LINE, 0);
        // Nodes 15..=30 (the fifth level) share one cache line.
        let level_start = &values[15] as *const u32 as usize;
        assert_eq!(level_start % CACHE_LINE, 0);
    }

    #[test]
    fn aligned_empty_buffer() {
        let buffer = Buffer::try_fill(0, Alignment::CacheLine, fill_sequential).unwrap();
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn zero_sized_elements_fall_back_to_heap() {
        let buffer = Buffer::try_fill(4, Alignment::CacheLine, |slots: &mut [MaybeUninit<()>]| {
            for slot in slots.iter_mut() {
                slot.write(());
            }
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(buffer.as_slice().len(), 4);
    }

    #[test]
    fn failed_fill_is_reported() {
        for alignment in [Alignment::Unaligned, Alignment::CacheLine] {
            let result = Buffer::<u64>::try_fill(8, alignment, |_| Err("short"));
            assert!(matches!(result, Err("short")));
        }
    }
}
