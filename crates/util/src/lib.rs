//! json-draft-util - helpers shared by the json-draft crates.
//!
//! Two small concerns live here:
//!
//! - [`sort`]: stable comparator sorts that stay in bounds (and never panic)
//!   even when the comparator is not a total order.
//! - [`strings`]: the string coercions the default array sort relies on.

pub mod sort;
pub mod strings;

pub use sort::{insertion_sort_by, merge_sort_by};
pub use strings::{compare_utf16, number_to_string};
