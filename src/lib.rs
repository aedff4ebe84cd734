//! Static sorted arrays in Eytzinger layout with cache-friendly lower-bound search.
//!
//! A sorted sequence is rearranged into the breadth-first order of its implicit
//! binary search tree. Searching then walks `0, 2i + 1 | 2i + 2, ...` through
//! memory that is dense at the top of the tree and easy to prefetch below it,
//! instead of jumping around the sorted array the way a classic binary search
//! does.
//!
//! The structure is build-once, query-many: no insertion, no removal, and any
//! number of threads may search concurrently.
//!
//! # Example
//!
//! ```
//! use eytzinger_search::{EytzingerArray, SearchStrategy};
//!
//! let array = EytzingerArray::<i32, u32>::from_sorted(&[1, 3, 5, 7, 9, 11, 13]).unwrap();
//! assert_eq!(array.as_slice(), &[7, 3, 11, 1, 5, 9, 13]);
//!
//! assert_eq!(array.search(5), 4);
//! assert_eq!(array.search_branch_free(6), 0); // lower bound: 7 at the root
//! assert_eq!(array.search_with(SearchStrategy::BranchFreePrefetch, 14), 7); // past the end
//! ```
//!
//! # Modules
//!
//! - **Layout** ([`EytzingerArray::build_with`]) — in-order placement into level order,
//!   plain or cache-line aligned ([`Alignment`])
//! - **Search** ([`SearchStrategy`], [`Search`]) — branchy, branch-free, prefetching and
//!   masked-prefetching traversals sharing one index-recovery step
//! - **Prefetch** ([`PrefetchPlan`]) — per-node prefetch targets
//!
//! # References
//!
//! - [Eytzinger binary search](https://en.algorithmica.org/hpc/data-structures/binary-search/)
//! - Khuong & Morin, *Array Layouts for Comparison-Based Searching* (2017)

mod array;
mod buffer;
mod error;
mod index;
mod prefetch;
mod strategy;

pub use array::{EytzingerArray, SortedIter};
pub use buffer::Alignment;
pub use error::BuildError;
pub use index::IndexType;
pub use prefetch::{CACHE_LINE, PrefetchPlan};
pub use strategy::{Search, SearchStrategy, Searcher, UnknownStrategy};
