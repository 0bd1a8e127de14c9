//! Grapheme cluster iteration and per-grapheme advances.

use crate::unicode::width::{WidthMethod, display_width_with_method};
use unicode_segmentation::UnicodeSegmentation;

/// Iterate over extended grapheme clusters in a string.
pub fn graphemes(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

/// Column advance of a whole string, summed grapheme by grapheme.
///
/// Unlike [`display_width_with_method`] on the full string, a grapheme that
/// renders as a visible glyph never counts as zero columns, so zero-width
/// emoji modifiers attached to a base still advance the pen once.
#[must_use]
pub fn advance_columns(s: &str, method: WidthMethod) -> usize {
    graphemes(s)
        .map(|g| {
            let w = display_width_with_method(g, method);
            if w == 0 && !g.chars().all(char::is_control) { 1 } else { w }
        })
        .sum()
}
