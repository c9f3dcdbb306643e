//! Sorting utilities.
//!
//! Both sorts are stable and only ever call the comparator on elements of the
//! slice being sorted. A comparator that is inconsistent produces some
//! permutation of the input, never a panic.

mod insertion;
mod merge;

pub use insertion::insertion_sort_by;
pub use merge::merge_sort_by;
