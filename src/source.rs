//! Copy-ready banner source.

use crate::state::BannerState;
use crate::style;
use crate::template;

/// The artifact a user copies: the banner composed from the current height,
/// resolved style, icon and text, with surrounding whitespace trimmed.
#[must_use]
pub fn source_markup(state: &BannerState) -> String {
    template::compose(
        Some(state.height),
        &style::resolve(state.variant),
        state.variant.profile().icon,
        &state.text,
    )
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Height;
    use crate::variant::{Theme, Variant};

    #[test]
    fn test_source_reflects_state() {
        let mut state = BannerState::new("Ship <code class=\"code\">v2</code>", Variant::Error, Theme::Dark);
        state.height = Height::Px(72.0);
        let source = source_markup(&state);
        assert!(source.starts_with("<svg"));
        assert!(source.ends_with("</svg>"));
        assert!(source.contains(r#"height="72px""#));
        assert!(source.contains("🗙"));
        assert!(source.contains("#ff7b72"));
        assert!(source.contains(r#"<p class="text">Ship <code class="code">v2</code></p>"#));
    }

    #[test]
    fn test_theme_does_not_affect_source() {
        let light = BannerState::new("x", Variant::Info, Theme::Light);
        let dark = BannerState::new("x", Variant::Info, Theme::Dark);
        assert_eq!(source_markup(&light), source_markup(&dark));
    }
}
