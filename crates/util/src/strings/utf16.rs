use std::cmp::Ordering;

/// Compare two strings by UTF-16 code units.
///
/// This differs from `str::cmp` (which compares UTF-8 bytes, i.e. code
/// points) only when a supplementary-plane character meets a BMP character
/// at or above U+E000: surrogates sort below U+E000..=U+FFFF.
///
/// # Examples
///
/// ```
/// use json_draft_util::strings::compare_utf16;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_utf16("10", "9"), Ordering::Less);
/// assert_eq!(compare_utf16("\u{1F600}", "\u{FF5E}"), Ordering::Less);
/// ```
pub fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_order() {
        assert_eq!(compare_utf16("a", "b"), Ordering::Less);
        assert_eq!(compare_utf16("b", "a"), Ordering::Greater);
        assert_eq!(compare_utf16("abc", "abc"), Ordering::Equal);
        assert_eq!(compare_utf16("ab", "abc"), Ordering::Less);
    }

    #[test]
    fn test_surrogates_sort_below_high_bmp() {
        // U+1F600 encodes as D83D DE00, U+FF5E is a single unit above D83D.
        assert_eq!("\u{1F600}".cmp("\u{FF5E}"), Ordering::Greater);
        assert_eq!(compare_utf16("\u{1F600}", "\u{FF5E}"), Ordering::Less);
    }
}
