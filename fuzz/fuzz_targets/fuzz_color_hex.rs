//! Fuzz target for palette hex parsing.
//!
//! `Rgba::from_hex` must reject malformed input without panicking, and any
//! color it accepts must survive formatting and re-parsing.

#![no_main]

use alert_banner::Rgba;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Some(color) = Rgba::from_hex(data) {
        assert_eq!(Rgba::from_hex(&color.to_string()), Some(color));
    }

    if !data.starts_with('#') {
        let _ = Rgba::from_hex(&format!("#{data}"));
    }

    // Char-boundary slices only; byte slicing could split a code point.
    for (i, _) in data.char_indices().take(10) {
        let _ = Rgba::from_hex(&data[i..]);
        let _ = Rgba::from_hex(&data[..i]);
    }
});
