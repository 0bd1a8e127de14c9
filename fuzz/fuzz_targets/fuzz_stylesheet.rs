//! Fuzz target for style sheet parsing and the cascade.
//!
//! The sheet is embedded in a banner so every declaration is computed
//! against real elements.

#![no_main]

use alert_banner::sandbox::css::StyleSheet;
use alert_banner::sandbox::{RenderHost, SurfaceOptions};
use alert_banner::{HeadlessHost, compose};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = StyleSheet::parse(data);

    // `</style>` would end the raw text early; that is still valid input.
    let markup = compose(None, data, "i", "text");
    let mut host = HeadlessHost::new();
    let surface = host.create_surface(SurfaceOptions::offscreen(300.0));
    if host.load_markup(surface, &markup).is_ok() {
        let _ = host.layout(surface);
    }
});
