//! Static sorted array stored in Eytzinger (level) order.
//!
//! The implicit binary search tree over a sorted sequence is stored breadth
//! first: node `i` has children `2i + 1` and `2i + 2`. A search touches the top
//! levels of the tree in a handful of adjacent cache lines and the rest of the
//! path is predictable enough to prefetch.
//!
//! # Strategies
//!
//! | Method | Strategy | Best For |
//! |--------|----------|----------|
//! | [`search`](EytzingerArray::search) | Branchy, early exit on equality | Small arrays, predictable queries |
//! | [`search_branch_free`](EytzingerArray::search_branch_free) | Predicated child selection | Random queries (fewer mispredicts) |
//! | [`search_branch_free_prefetch`](EytzingerArray::search_branch_free_prefetch) | Branch-free + prefetch | Arrays larger than L2 |
//! | [`search_branch_free_masked_prefetch`](EytzingerArray::search_branch_free_masked_prefetch) | Branch-free + prefetch clamped to the buffer | Same, without far out-of-range hints |
//!
//! Every strategy returns the position of an element equal to the key, or the
//! position of the smallest element greater than the key, or `len` when the key
//! is greater than every element. With duplicate keys any position holding an
//! equal key may be returned, and the branchy search may pick a different one
//! than the branch-free searches.

use std::convert::Infallible;
use std::fmt;
use std::mem::MaybeUninit;

use crate::buffer::{Alignment, Buffer};
use crate::error::BuildError;
use crate::index::IndexType;
use crate::prefetch::{PrefetchPlan, prefetch_at};
use crate::strategy::{SearchStrategy, Searcher};

/// Sorted keys in Eytzinger order, searchable with four interchangeable
/// strategies.
///
/// `I` is the position type: both the loop counter of every search and the
/// result type. The array holds at most `I::MAX / 2` elements.
pub struct EytzingerArray<T, I = u32> {
    buffer: Buffer<T>,
    len: I,
    alignment: Alignment,
    plan: PrefetchPlan,
}

#[derive(Clone, Copy)]
enum Prefetch {
    Off,
    Plain,
    Masked,
}

impl<T: Copy + Ord, I: IndexType> EytzingerArray<T, I> {
    /// Builds from the first `len` elements of a sorted sequence, using a plain
    /// heap allocation.
    pub fn build<It>(input: It, len: usize) -> Result<Self, BuildError>
    where
        It: IntoIterator<Item = T>,
    {
        Self::build_with(input, len, Alignment::Unaligned)
    }

    /// Builds from the first `len` elements of a sorted sequence.
    ///
    /// Fails with [`BuildError::IndexTooSmall`] before allocating when `len`
    /// exceeds `I::MAX / 2`, and with [`BuildError::InputExhausted`] when the
    /// input ends early. Elements past `len` are not consumed.
    pub fn build_with<It>(input: It, len: usize, alignment: Alignment) -> Result<Self, BuildError>
    where
        It: IntoIterator<Item = T>,
    {
        let index_type = std::any::type_name::<I>();
        let Some(n) = I::from_usize(len).filter(|&n| n <= I::MAX_LEN) else {
            tracing::debug!(len, index_type, "index type too small for eytzinger array");
            return Err(BuildError::IndexTooSmall { len, index_type });
        };

        let mut input = input.into_iter();
        let buffer = Buffer::try_fill(len, alignment, |slots| {
            let mut written = 0usize;
            fill_in_order(0, slots, &mut input, &mut written)
        })?;

        let plan = PrefetchPlan::new::<T>(len);
        tracing::debug!(
            len,
            index_type,
            ?alignment,
            multiplier = plan.multiplier(),
            offset = plan.offset(),
            mask = plan.mask(),
            "built eytzinger array"
        );

        Ok(Self {
            buffer,
            len: n,
            alignment,
            plan,
        })
    }

    /// Builds from a sorted slice.
    pub fn from_sorted(sorted: &[T]) -> Result<Self, BuildError> {
        debug_assert!(sorted.is_sorted(), "input must be sorted");
        Self::build(sorted.iter().copied(), sorted.len())
    }

    /// Branchy search: returns as soon as an equal element is found.
    pub fn search(&self, key: T) -> I {
        let values = self.buffer.as_slice();
        let n = self.len;
        let mut i = I::ZERO;
        while i < n {
            // SAFETY: i < len == values.len()
            let value = unsafe { *values.get_unchecked(i.to_usize()) };
            if key < value {
                i = i.descend(false);
            } else if key > value {
                i = i.descend(true);
            } else {
                return i;
            }
        }
        i.recover(n)
    }

    /// Branch-free search without prefetching.
    pub fn search_branch_free(&self, key: T) -> I {
        self.search_branch_free_impl(key, Prefetch::Off)
    }

    /// Branch-free search that prefetches `multiplier * i + offset` from every
    /// node it visits.
    pub fn search_branch_free_prefetch(&self, key: T) -> I {
        self.search_branch_free_impl(key, Prefetch::Plain)
    }

    /// Branch-free search with prefetch targets masked into `0..=mask`.
    pub fn search_branch_free_masked_prefetch(&self, key: T) -> I {
        self.search_branch_free_impl(key, Prefetch::Masked)
    }

    /// Searches with a strategy chosen at run time.
    pub fn search_with(&self, strategy: SearchStrategy, key: T) -> I {
        match strategy {
            SearchStrategy::Branchy => self.search(key),
            SearchStrategy::BranchFree => self.search_branch_free(key),
            SearchStrategy::BranchFreePrefetch => self.search_branch_free_prefetch(key),
            SearchStrategy::BranchFreeMaskedPrefetch => {
                self.search_branch_free_masked_prefetch(key)
            }
        }
    }

    /// Binds this array to one strategy.
    pub fn searcher(&self, strategy: SearchStrategy) -> Searcher<'_, T, I> {
        Searcher::new(self, strategy)
    }

    /// Smallest element that is at least `key`.
    pub fn lower_bound(&self, key: T) -> Option<&T> {
        self.get(self.search_branch_free(key))
    }

    /// Returns true if an element equal to `key` is stored.
    pub fn contains(&self, key: T) -> bool {
        self.lower_bound(key).is_some_and(|&value| value == key)
    }

    #[inline(always)]
    fn search_branch_free_impl(&self, key: T, prefetch: Prefetch) -> I {
        let values = self.buffer.as_slice();
        let base = values.as_ptr();
        let n = self.len;
        let mut i = I::ZERO;
        while i < n {
            let node = i.to_usize();
            match prefetch {
                Prefetch::Off => {}
                Prefetch::Plain => prefetch_at(base, self.plan.target(node)),
                Prefetch::Masked => prefetch_at(base, self.plan.masked_target(node)),
            }
            // SAFETY: node < len == values.len()
            let value = unsafe { *values.get_unchecked(node) };
            // Equality goes left; recovery turns the final position into the
            // lower bound.
            i = i.descend(key > value);
        }
        i.recover(n)
    }
}

impl<T, I: IndexType> EytzingerArray<T, I> {
    /// Number of elements.
    pub fn len(&self) -> I {
        self.len
    }

    /// Returns true when the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len == I::ZERO
    }

    /// Element at an Eytzinger position. `len` and past yield `None`.
    pub fn get(&self, index: I) -> Option<&T> {
        if index < I::ZERO {
            return None;
        }
        self.buffer.as_slice().get(index.to_usize())
    }

    /// Elements in Eytzinger order.
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    /// Allocation discipline the buffer was built with.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Prefetch multiplier, offset and mask used by the prefetching searches.
    pub fn prefetch_plan(&self) -> PrefetchPlan {
        self.plan
    }

    /// Elements in sorted order (an in-order walk of the implicit tree).
    pub fn iter_sorted(&self) -> SortedIter<'_, T> {
        SortedIter::new(self.buffer.as_slice())
    }
}

/// Places elements by an in-order walk of the implicit tree rooted at `i`:
/// left subtree, then `i`, then right subtree. Consumes the input in order.
fn fill_in_order<T>(
    i: usize,
    slots: &mut [MaybeUninit<T>],
    input: &mut impl Iterator<Item = T>,
    written: &mut usize,
) -> Result<(), BuildError> {
    if i >= slots.len() {
        return Ok(());
    }
    fill_in_order(2 * i + 1, slots, input, written)?;
    let value = input.next().ok_or(BuildError::InputExhausted {
        expected: slots.len(),
        actual: *written,
    })?;
    slots[i].write(value);
    *written += 1;
    fill_in_order(2 * i + 2, slots, input, written)
}

impl<T: Copy, I: IndexType> Clone for EytzingerArray<T, I> {
    fn clone(&self) -> Self {
        let values = self.buffer.as_slice();
        let buffer = Buffer::try_fill(values.len(), self.alignment, |slots| {
            for (slot, &value) in slots.iter_mut().zip(values) {
                slot.write(value);
            }
            Ok::<(), Infallible>(())
        });
        let buffer = match buffer {
            Ok(buffer) => buffer,
            Err(never) => match never {},
        };
        Self {
            buffer,
            len: self.len,
            alignment: self.alignment,
            plan: self.plan,
        }
    }
}

impl<T: fmt::Debug, I: IndexType> fmt::Debug for EytzingerArray<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EytzingerArray")
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .field("elements", &self.buffer.as_slice())
            .finish()
    }
}

impl<'a, T, I: IndexType> IntoIterator for &'a EytzingerArray<T, I> {
    type Item = &'a T;
    type IntoIter = SortedIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_sorted()
    }
}

/// In-order iterator over an Eytzinger array; yields elements sorted.
///
/// Walks node positions directly: the successor of `i` is the leftmost node of
/// its right subtree, or else the nearest ancestor reached from a left child.
#[derive(Clone, Debug)]
pub struct SortedIter<'a, T> {
    values: &'a [T],
    next: Option<usize>,
    remaining: usize,
}

impl<'a, T> SortedIter<'a, T> {
    fn new(values: &'a [T]) -> Self {
        let next = (!values.is_empty()).then(|| leftmost(0, values.len()));
        Self {
            values,
            next,
            remaining: values.len(),
        }
    }
}

fn leftmost(mut i: usize, len: usize) -> usize {
    while 2 * i + 1 < len {
        i = 2 * i + 1;
    }
    i
}

fn successor(mut i: usize, len: usize) -> Option<usize> {
    let right = 2 * i + 2;
    if right < len {
        return Some(leftmost(right, len));
    }
    // Climb while `i` is a right child.
    while i != 0 && i % 2 == 0 {
        i = (i - 1) / 2;
    }
    if i == 0 { None } else { Some((i - 1) / 2) }
}

impl<'a, T> Iterator for SortedIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.next?;
        self.next = successor(i, self.values.len());
        self.remaining -= 1;
        self.values.get(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for SortedIter<'_, T> {}
