//! Structural contract of the composed banner markup.
//!
//! Parses composed markup with the sandbox parser and checks that the
//! structural elements appear exactly once, in the expected nesting, for
//! every variant.

use alert_banner::sandbox::Document;
use alert_banner::sandbox::parser::parse_fragment;
use alert_banner::template::{CODE_CLASS, Height, OFFSCREEN_HEIGHT};
use alert_banner::{SAMPLE_TEXT, Variant, compose, resolve};

fn parse(markup: &str) -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    for node in parse_fragment(&mut doc, markup) {
        doc.append_child(body, node);
    }
    doc
}

fn count(doc: &Document, selector: &str) -> usize {
    doc.query_selector_all(doc.body(), selector).len()
}

fn banner(variant: Variant, text: &str) -> String {
    compose(
        Some(Height::Px(64.0)),
        &resolve(variant),
        variant.profile().icon,
        text,
    )
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_each_structural_element_appears_once() {
    for variant in Variant::ALL {
        let doc = parse(&banner(variant, SAMPLE_TEXT));
        for selector in [
            "svg",
            "svg foreignObject",
            "foreignObject .root",
            ".root style",
            ".root .container",
            ".container .icon",
            ".container .text",
        ] {
            assert_eq!(count(&doc, selector), 1, "{variant}: {selector}");
        }
    }
}

#[test]
fn test_text_fragment_is_kept_verbatim() {
    let text = r#"Run <code class="code">cargo fmt</code> first"#;
    let markup = banner(Variant::Warning, text);
    let doc = parse(&markup);
    let p = doc.query_selector(doc.body(), ".text").unwrap();
    assert_eq!(doc.inner_html(p), text);
    assert_eq!(count(&doc, &format!(".text .{CODE_CLASS}")), 1);
}

#[test]
fn test_icon_and_sheet_follow_variant() {
    let doc = parse(&banner(Variant::Error, "x"));
    let icon = doc.query_selector(doc.body(), ".icon").unwrap();
    assert_eq!(doc.text_content(icon), "🗙");
    let style = doc.query_selector(doc.body(), "style").unwrap();
    assert!(doc.text_content(style).contains("#ff7b72"));
}

// ============================================================================
// Purity
// ============================================================================

#[test]
fn test_compose_is_pure() {
    for variant in Variant::ALL {
        let a = banner(variant, SAMPLE_TEXT);
        let b = banner(variant, SAMPLE_TEXT);
        assert_eq!(a, b);
        assert_eq!(resolve(variant), resolve(variant));
    }
}

#[test]
fn test_height_forms() {
    let sheet = resolve(Variant::Info);
    assert!(compose(None, &sheet, "", "").contains(r#"height="0px""#));
    assert!(compose(OFFSCREEN_HEIGHT, &sheet, "", "").contains(r#"height="100%""#));
    assert!(compose(Some(Height::Px(f64::NAN)), &sheet, "", "").contains(r#"height="0px""#));
    assert!(compose(Some(Height::Px(-3.0)), &sheet, "", "").contains(r#"height="0px""#));
}

#[test]
fn test_sheets_differ_only_by_palette() {
    let info = resolve(Variant::Info);
    let error = resolve(Variant::Error);
    assert_ne!(info, error);
    assert_eq!(info.lines().count(), error.lines().count());
    for (a, b) in info.lines().zip(error.lines()) {
        if a != b {
            assert!(a.contains('#') && b.contains('#'), "{a} / {b}");
        }
    }
}
