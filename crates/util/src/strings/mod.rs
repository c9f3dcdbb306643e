//! String coercion helpers.
//!
//! The default array sort orders elements by their string form and compares
//! those strings by UTF-16 code units. These functions produce exactly that.

mod number;
mod utf16;

pub use number::number_to_string;
pub use utf16::compare_utf16;
