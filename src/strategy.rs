//! The closed set of search strategies and a common search capability.

use std::fmt;
use std::str::FromStr;

use crate::array::EytzingerArray;
use crate::index::IndexType;

/// One of the four traversal algorithms over an Eytzinger array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    /// Three-way compare with early exit on equality.
    Branchy,
    /// Predicated child selection, no prefetch.
    #[default]
    BranchFree,
    /// Branch-free with an unmasked prefetch hint per level.
    BranchFreePrefetch,
    /// Branch-free with the prefetch target masked to the buffer size.
    BranchFreeMaskedPrefetch,
}

impl SearchStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Branchy,
        Self::BranchFree,
        Self::BranchFreePrefetch,
        Self::BranchFreeMaskedPrefetch,
    ];

    /// Stable snake_case name, accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Branchy => "branchy",
            Self::BranchFree => "branch_free",
            Self::BranchFreePrefetch => "branch_free_prefetch",
            Self::BranchFreeMaskedPrefetch => "branch_free_masked_prefetch",
        }
    }

    /// Returns true for the two strategies that issue prefetch hints.
    pub fn prefetches(self) -> bool {
        matches!(
            self,
            Self::BranchFreePrefetch | Self::BranchFreeMaskedPrefetch
        )
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown search strategy: {}", self.0)
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for SearchStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Anything that maps a key to an index in `0..=len`.
pub trait Search<T, I> {
    /// Position of an equal key, else of the lower bound, else `len`.
    fn search(&self, key: T) -> I;
}

impl<T: Copy + Ord, I: IndexType> Search<T, I> for EytzingerArray<T, I> {
    fn search(&self, key: T) -> I {
        EytzingerArray::search(self, key)
    }
}

/// An array bound to a single strategy.
pub struct Searcher<'a, T, I> {
    array: &'a EytzingerArray<T, I>,
    strategy: SearchStrategy,
}

impl<T, I> Clone for Searcher<'_, T, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, I> Copy for Searcher<'_, T, I> {}

impl<'a, T, I> Searcher<'a, T, I> {
    pub(crate) fn new(array: &'a EytzingerArray<T, I>, strategy: SearchStrategy) -> Self {
        Self { array, strategy }
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    pub fn array(&self) -> &'a EytzingerArray<T, I> {
        self.array
    }
}

impl<T: Copy + Ord, I: IndexType> Search<T, I> for Searcher<'_, T, I> {
    #[inline]
    fn search(&self, key: T) -> I {
        self.array.search_with(self.strategy, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_hits<S: Search<u32, u32>>(searcher: &S, keys: &[u32], len: u32) -> usize {
        keys.iter().filter(|&&k| searcher.search(k) < len).count()
    }

    #[test]
    fn names_round_trip() {
        for strategy in SearchStrategy::ALL {
            assert_eq!(strategy.name().parse::<SearchStrategy>(), Ok(strategy));
            assert_eq!(strategy.to_string(), strategy.name());
        }
        assert_eq!(
            "binary".parse::<SearchStrategy>(),
            Err(UnknownStrategy("binary".to_string()))
        );
    }

    #[test]
    fn prefetching_strategies() {
        let prefetching: Vec<_> = SearchStrategy::ALL
            .into_iter()
            .filter(|s| s.prefetches())
            .collect();
        assert_eq!(
            prefetching,
            [
                SearchStrategy::BranchFreePrefetch,
                SearchStrategy::BranchFreeMaskedPrefetch
            ]
        );
    }

    #[test]
    fn searchers_are_interchangeable() {
        let array = EytzingerArray::<u32, u32>::build((0..64).map(|v| v * 4), 64).unwrap();
        let keys: Vec<u32> = (0..300).collect();
        let expected = count_hits(&array, &keys, 64);
        assert_eq!(expected, 253);
        for strategy in SearchStrategy::ALL {
            let searcher = array.searcher(strategy);
            assert_eq!(searcher.strategy(), strategy);
            assert_eq!(searcher.array().len(), 64);
            assert_eq!(count_hits(&searcher, &keys, 64), expected);
        }
    }
}
