//! Unicode utilities for grapheme handling and display width.

mod grapheme;
mod width;

pub use grapheme::{advance_columns, graphemes};
pub use width::{
    WidthMethod, display_width, display_width_char_with_method, display_width_with_method,
    is_wide,
};
