//! Fuzz target for the sandbox markup parser and layout.
//!
//! Arbitrary markup is parsed into a document, serialized and laid
//! out. None of these steps may panic.

#![no_main]

use alert_banner::sandbox::Document;
use alert_banner::sandbox::layout::{FontMetrics, layout};
use alert_banner::sandbox::parser::parse_fragment;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let mut doc = Document::new();
    let body = doc.body();
    for node in parse_fragment(&mut doc, data) {
        doc.append_child(body, node);
    }
    let _ = doc.inner_html(body);

    let metrics = FontMetrics::default();
    for width in [1.0, 300.0, 1024.0] {
        let _ = layout(&doc, width, &metrics);
    }
});
