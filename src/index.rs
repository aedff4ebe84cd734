//! Integer types usable as the position type of an Eytzinger array.
//!
//! Traversal computes `2i + 2` in the index type itself, so an array may hold at
//! most `MAX / 2` elements of a given index type. Narrow index types keep the
//! query loop in narrow registers; `u32` is usually the sweet spot.

use std::fmt;

mod sealed {
    pub trait Sealed {}
}

/// Integer type used for node positions and search results.
///
/// Sealed: the search loops index the buffer unchecked on the strength of
/// these implementations.
pub trait IndexType:
    sealed::Sealed + Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The root position.
    const ZERO: Self;

    /// Largest element count this type can address (`MAX / 2`).
    const MAX_LEN: Self;

    /// Converts a length, returning `None` if it is not representable.
    fn from_usize(n: usize) -> Option<Self>;

    /// Widens a non-negative position to `usize`.
    fn to_usize(self) -> usize;

    /// Child position: `2i + 1` when `right` is false, `2i + 2` otherwise.
    fn descend(self, right: bool) -> Self;

    /// Recovers the lower-bound position from the virtual position at which a
    /// traversal left the tree.
    ///
    /// `(i + 1) >> (trailing_ones(i + 1) + 1)` climbs back to the last node at
    /// which the path went left. Zero means the path never went left, i.e. the
    /// key is greater than every element, and `len` is returned.
    fn recover(self, len: Self) -> Self;
}

macro_rules! impl_index_type {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl IndexType for $ty {
                const ZERO: Self = 0;
                const MAX_LEN: Self = <$ty>::MAX / 2;

                #[inline]
                fn from_usize(n: usize) -> Option<Self> {
                    Self::try_from(n).ok()
                }

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline(always)]
                fn descend(self, right: bool) -> Self {
                    2 * self + 1 + right as $ty
                }

                #[inline(always)]
                fn recover(self, len: Self) -> Self {
                    let k = self + 1;
                    // A path that only went right leaves k all ones; shifting
                    // by the full width must yield zero rather than panic.
                    let j = k.checked_shr(k.trailing_ones() + 1).unwrap_or(0);
                    if j == 0 { len } else { j - 1 }
                }
            }
        )*
    };
}

impl_index_type!(u8, u16, u32, u64, usize, i16, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn max_len_is_half_of_max() {
        assert_eq!(<u8 as IndexType>::MAX_LEN, 127);
        assert_eq!(<u16 as IndexType>::MAX_LEN, 32_767);
        assert_eq!(<i16 as IndexType>::MAX_LEN, 16_383);
        assert_eq!(<i32 as IndexType>::MAX_LEN, (1 << 30) - 1);
    }

    #[test]
    fn from_usize_rejects_unrepresentable() {
        assert_eq!(<u8 as IndexType>::from_usize(255), Some(255));
        assert_eq!(<u8 as IndexType>::from_usize(256), None);
        assert_eq!(<i16 as IndexType>::from_usize(40_000), None);
    }

    #[test]
    fn descend_children() {
        assert_eq!(0u32.descend(false), 1);
        assert_eq!(0u32.descend(true), 2);
        assert_eq!(5u32.descend(false), 11);
        assert_eq!(5u32.descend(true), 12);
    }

    #[test]
    fn recover_known_paths() {
        // Tree of 7: [7, 3, 11, 1, 5, 9, 13].
        // Query 6 goes left, right, right and leaves at 10; lower bound is the root.
        assert_eq!(10u32.recover(7), 0);
        // Query 14 goes right three times and leaves at 14: past the end.
        assert_eq!(14u32.recover(7), 7);
        // Query 0 goes left three times and leaves at 7; lower bound is node 3.
        assert_eq!(7u32.recover(7), 3);
        // Query 4 goes left, right, left and leaves at 9; lower bound is node 4 (5).
        assert_eq!(9u32.recover(7), 4);
    }

    #[test]
    fn recover_all_ones_does_not_overflow() {
        // n = 127 in u8: the all-right path ends at 254, so i + 1 = 0xFF.
        assert_eq!(254u8.recover(127), 127);
        assert_eq!((i32::MAX - 1).recover(5), 5);
    }

    proptest! {
        /// Descending then recovering a single left turn lands on the parent.
        #[test]
        fn recover_left_child_of_leaf_is_parent(parent in 0u32..(1 << 20)) {
            let len = u32::MAX / 4;
            let leaf = parent.descend(false);
            prop_assert_eq!(leaf.recover(len), parent);
        }

        /// Widths agree with each other on shared ranges.
        #[test]
        fn recover_is_width_independent(i in 0u16..u16::MAX / 2, len in 1u16..u16::MAX / 2) {
            prop_assert_eq!(u64::from(i.recover(len)), u64::from(i).recover(u64::from(len)));
        }
    }
}
