//! Display width calculation for text measurement.
//!
//! Widths are expressed in columns: one column is the advance of an average
//! narrow glyph, wide (East Asian, emoji presentation) glyphs take two.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Width calculation method for ambiguous-width characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WidthMethod {
    /// POSIX-like wcwidth: ambiguous width = 1.
    #[default]
    WcWidth,
    /// Unicode East Asian Width: ambiguous width = 2.
    Unicode,
}

/// Get the display width of a string in columns using a specific method.
#[must_use]
pub fn display_width_with_method(s: &str, method: WidthMethod) -> usize {
    match method {
        WidthMethod::WcWidth => UnicodeWidthStr::width(s),
        WidthMethod::Unicode => UnicodeWidthStr::width_cjk(s),
    }
}

/// Get the display width of a character in columns using a specific method.
///
/// This includes a fast path for ASCII printable characters (0x20-0x7E)
/// which are always width 1 and are the most common case.
#[inline]
#[must_use]
pub fn display_width_char_with_method(c: char, method: WidthMethod) -> usize {
    if c.is_ascii() && (' '..='~').contains(&c) {
        return 1;
    }
    if c < ' ' {
        return 0;
    }
    match method {
        WidthMethod::WcWidth => UnicodeWidthChar::width(c).unwrap_or(0),
        WidthMethod::Unicode => UnicodeWidthChar::width_cjk(c).unwrap_or(0),
    }
}

/// Get the display width of a string with the default method.
#[must_use]
pub fn display_width(s: &str) -> usize {
    display_width_with_method(s, WidthMethod::default())
}

/// Check if a grapheme is wide (takes 2 columns).
///
/// Wide graphemes are also line-break opportunities on both sides.
#[must_use]
pub fn is_wide(grapheme: &str, method: WidthMethod) -> bool {
    display_width_with_method(grapheme, method) >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width_char_with_method('a', WidthMethod::WcWidth), 1);
    }

    #[test]
    fn test_cjk_width() {
        assert_eq!(display_width("漢字"), 4);
        assert!(is_wide("漢", WidthMethod::WcWidth));
        assert!(!is_wide("a", WidthMethod::WcWidth));
    }

    #[test]
    fn test_control_chars_are_zero_width() {
        assert_eq!(display_width_char_with_method('\u{7}', WidthMethod::WcWidth), 0);
    }

    #[test]
    fn test_width_methods() {
        // Circled digit one (U+2460) is ambiguous width.
        let ch = '\u{2460}';
        assert_eq!(display_width_char_with_method(ch, WidthMethod::WcWidth), 1);
        assert_eq!(display_width_char_with_method(ch, WidthMethod::Unicode), 2);
    }
}
