//! Banner markup composition.
//!
//! The markup is an `<svg>` with a single `<foreignObject>` holding an XHTML
//! subtree. The class names below are an external contract: consumers re-style
//! the artifact by selector, and the live preview patches nodes located by
//! them, so every producer of banner markup must keep them intact.

use std::fmt;

/// Class of the XHTML wrapper inside the foreign object.
pub const ROOT_CLASS: &str = "root";
/// Class of the flex row holding icon and text.
pub const CONTAINER_CLASS: &str = "container";
/// Class of the icon span.
pub const ICON_CLASS: &str = "icon";
/// Class of the editable text paragraph.
pub const TEXT_CLASS: &str = "text";
/// Class of inline code chips inside the text.
pub const CODE_CLASS: &str = "code";

/// Height of the top-level graphic element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Height {
    /// Fixed height in CSS pixels.
    Px(f64),
    /// Fill the host (`100%`).
    Fill,
}

impl Height {
    /// Value for the `height` attribute.
    ///
    /// Negative and non-finite pixel values clamp to `0px`.
    #[must_use]
    pub fn to_attribute(self) -> String {
        match self {
            Self::Px(px) if px.is_finite() && px > 0.0 => format!("{px}px"),
            Self::Px(_) => UNSET_HEIGHT_ATTRIBUTE.to_string(),
            Self::Fill => FILL_HEIGHT_ATTRIBUTE.to_string(),
        }
    }

    /// Pixel value, if this is a fixed height.
    #[must_use]
    pub fn as_px(self) -> Option<f64> {
        match self {
            Self::Px(px) => Some(px),
            Self::Fill => None,
        }
    }
}

impl Default for Height {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_attribute())
    }
}

impl From<f64> for Height {
    fn from(px: f64) -> Self {
        Self::Px(px)
    }
}

/// Attribute emitted when no height is given.
pub const UNSET_HEIGHT_ATTRIBUTE: &str = "0px";
/// Attribute emitted for [`Height::Fill`].
pub const FILL_HEIGHT_ATTRIBUTE: &str = "100%";

/// Height the live preview's baseline markup is composed with.
///
/// "No height yet" is rendered as `0px` here but as `100%` for off-screen
/// measurement ([`OFFSCREEN_HEIGHT`]). The two are kept apart on purpose
/// until the product decides which one is right.
pub const LIVE_BASELINE_HEIGHT: Option<Height> = None;

/// Height the off-screen measurement markup is composed with.
pub const OFFSCREEN_HEIGHT: Option<Height> = Some(Height::Fill);

/// Format an optional height as an attribute value.
#[must_use]
pub fn height_attribute(height: Option<Height>) -> String {
    height.map_or_else(|| UNSET_HEIGHT_ATTRIBUTE.to_string(), Height::to_attribute)
}

/// Compose the banner markup.
///
/// Pure: equal arguments always produce byte-identical output. `icon` and
/// `text` are inserted verbatim; `text` is an HTML fragment (the inner HTML of
/// the editable node), so callers holding plain text must escape it first.
#[must_use]
pub fn compose(height: Option<Height>, style: &str, icon: &str, text: &str) -> String {
    let height = height_attribute(height);

    format!(
        r#"
<svg xmlns="http://www.w3.org/2000/svg" fill="none" width="100%" height="{height}">
  <foreignObject width="100%" height="100%">
    <div xmlns="http://www.w3.org/1999/xhtml" class="{ROOT_CLASS}">
      <style>
{style}
      </style>

      <div class="{CONTAINER_CLASS}">
        <span class="{ICON_CLASS}">{icon}</span>
        <p class="{TEXT_CLASS}">{text}</p>
      </div>
    </div>
  </foreignObject>
</svg>
  "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_formatting() {
        assert!(compose(Some(Height::Px(120.0)), "", "", "").contains(r#"height="120px""#));
        assert!(compose(Some(Height::Fill), "", "", "").contains(r#"height="100%""#));
        assert!(compose(None, "", "", "").contains(r#"height="0px""#));
        assert!(compose(Some(Height::Px(64.5)), "", "", "").contains(r#"height="64.5px""#));
    }

    #[test]
    fn test_degenerate_heights_clamp() {
        assert_eq!(Height::Px(-3.0).to_attribute(), "0px");
        assert_eq!(Height::Px(-0.0).to_attribute(), "0px");
        assert_eq!(Height::Px(f64::NAN).to_attribute(), "0px");
        assert_eq!(Height::Px(f64::INFINITY).to_attribute(), "0px");
    }

    #[test]
    fn test_named_defaults_differ() {
        assert_eq!(height_attribute(LIVE_BASELINE_HEIGHT), "0px");
        assert_eq!(height_attribute(OFFSCREEN_HEIGHT), "100%");
    }

    #[test]
    fn test_compose_is_pure() {
        let a = compose(Some(Height::Px(10.0)), ".text{}", "⚠", "Hi");
        let b = compose(Some(Height::Px(10.0)), ".text{}", "⚠", "Hi");
        assert_eq!(a, b);
    }

    #[test]
    fn test_compose_snapshot() {
        insta::assert_snapshot!(compose(Some(Height::Px(48.0)), ".a {}", "i", "t").trim(), @r#"
        <svg xmlns="http://www.w3.org/2000/svg" fill="none" width="100%" height="48px">
          <foreignObject width="100%" height="100%">
            <div xmlns="http://www.w3.org/1999/xhtml" class="root">
              <style>
        .a {}
              </style>

              <div class="container">
                <span class="icon">i</span>
                <p class="text">t</p>
              </div>
            </div>
          </foreignObject>
        </svg>
        "#);
    }
}
