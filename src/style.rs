//! Style sheet generation for the banner artifact.
//!
//! [`resolve`] maps a [`Variant`] to the `<style>` text embedded in the
//! markup. The sheet targets the class names of the structural contract
//! (`container`, `icon`, `code`, `text`) and carries three width breakpoints.

use crate::variant::{StyleProfile, Variant};

/// Widths (in CSS px) at which the banner shrinks its type, widest first.
///
/// At or below the last one the icon is hidden.
pub const BREAKPOINTS: [u32; 3] = [768, 544, 350];

/// Resolve the style sheet for a variant.
#[must_use]
pub fn resolve(variant: Variant) -> String {
    stylesheet(variant.profile())
}

/// Format the style sheet for an explicit profile.
#[must_use]
pub fn stylesheet(profile: &StyleProfile) -> String {
    let text = profile.text;
    let background = profile.background;
    let [wide, medium, narrow] = BREAKPOINTS;

    format!(
        r#"
.container {{
  font-family: -apple-system, BlinkMacSystemFont, Segoe UI, Helvetica, Arial,
    sans-serif, Apple Color Emoji, Segoe UI Emoji;

  position: relative;
  display: flex;
  flex-direction: row;
  align-items: center;

  color: {text};
}}
.container::before {{
  content: "";

  position: absolute;
  width: 100%;
  height: 100%;
  border-radius: 0.325rem;
  background-color: {background};
}}

.icon {{
  font-size: 2em;
  margin: 0 0.4em 0 0.5em;
  transform: translateY(-0.06em);
}}

.code {{
  display: inline-block;

  font-family: SFMono-Regular, Consolas, Liberation Mono, Menlo, monospace;
  font-size: 0.85em;
  font-weight: 600;

  margin-bottom: -0.2em;
  padding-top: 0.1em;
  padding-bottom: 0.1em;
  padding-right: 0.4em;
  padding-left: 0.4em;

  border-radius: 0.2em;
  background: {background};

  mix-blend-mode: difference;
  opacity: 0.9;
  transform: translateY(-0.06em);
}}

.text {{
  font-size: 1em;
  margin-right: 0.75em;
  line-height: 1.3;
}}

.icon,
.text {{
  mix-blend-mode: exclusion;
}}

@media (max-width: {wide}px) {{
  .text {{
    font-size: 0.9em;
  }}

  .icon {{
    font-size: 1.85em;
    margin-left: 0.5em;
    margin-right: 0.4em;
  }}
}}

@media (max-width: {medium}px) {{
  .text {{
    font-size: 0.8em;
  }}

  .icon {{
    font-size: 1.5em;
    margin-left: 0.5em;
    margin-right: 0.35em;
  }}
}}

@media (max-width: {narrow}px) {{
  .text {{
    font-size: 0.8em;
    margin-left: 1em;
  }}

  .icon {{
    display: none;
  }}
}}
"#
    )
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_deterministic() {
        for variant in Variant::ALL {
            assert_eq!(resolve(variant), resolve(variant));
        }
        assert_ne!(resolve(Variant::Info), resolve(Variant::Error));
    }

    #[test]
    fn test_info_colors() {
        let sheet = resolve(Variant::Info);
        assert!(sheet.contains("color: #55687d;"));
        assert!(sheet.contains("background-color: #79b8ff40;"));
    }

    #[test]
    fn test_code_chip_shares_banner_background() {
        let sheet = resolve(Variant::Warning);
        let chip = sheet
            .split(".code {")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .expect("code rule");
        assert!(chip.contains("background: #ff963e40;"), "{chip}");
        assert!(!sheet.contains("#f67f182b"));
        assert!(sheet.contains("background-color: #ff963e40;"));
    }

    #[test]
    fn test_rules_and_breakpoints_present() {
        let sheet = resolve(Variant::Error);
        for selector in [".container {", ".container::before {", ".icon {", ".code {", ".text {"] {
            assert!(sheet.contains(selector), "missing {selector}");
        }
        for width in BREAKPOINTS {
            assert!(sheet.contains(&format!("@media (max-width: {width}px)")));
        }
        let narrow = sheet
            .split("@media (max-width: 350px)")
            .nth(1)
            .expect("narrow breakpoint");
        assert!(narrow.contains("display: none;"));
    }

    #[test]
    fn test_sheet_is_trimmed() {
        let sheet = resolve(Variant::Info);
        assert!(sheet.starts_with(".container {"));
        assert!(sheet.ends_with('}'));
    }
}
