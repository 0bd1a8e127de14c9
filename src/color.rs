//! Hex colors used by the variant style profiles.
//!
//! Channels are stored as 8-bit integers so that a color parsed from a hex
//! literal formats back to exactly the same literal.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// RGBA color with 8-bit channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create a color from all four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a hex color string (`#RGB`, `#RRGGBB` or `#RRGGBBAA`).
    ///
    /// The leading `#` is optional.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }

        match hex.len() {
            3 => {
                // #RGB -> #RRGGBB
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::rgb(r, g, b))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Whether the alpha channel is fully opaque.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Whether the alpha channel is zero.
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.a == 0
    }

    /// Return the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl FromStr for Rgba {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| Error::InvalidColor(s.to_string()))
    }
}

/// Lowercase CSS hex notation; the alpha pair is omitted when opaque.
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { r, g, b, a } = *self;
        if self.is_opaque() {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgba::from_hex("#FF0000"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(Rgba::from_hex("00FF00"), Some(Rgba::rgb(0, 255, 0)));
        assert_eq!(Rgba::from_hex("#00F"), Some(Rgba::rgb(0, 0, 255)));
        assert_eq!(Rgba::from_hex("#000000FF"), Some(Rgba::BLACK));
        assert_eq!(Rgba::from_hex("#79b8ff40"), Some(Rgba::new(0x79, 0xb8, 0xff, 0x40)));
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert_eq!(Rgba::from_hex(""), None);
        assert_eq!(Rgba::from_hex("#12345"), None);
        assert_eq!(Rgba::from_hex("#gggggg"), None);
        // Multi-byte input must not slice through a char boundary.
        assert_eq!(Rgba::from_hex("#ééé"), None);
    }

    #[test]
    fn test_display_is_lowercase_css() {
        assert_eq!(Rgba::rgb(0x55, 0x68, 0x7d).to_string(), "#55687d");
        assert_eq!(Rgba::new(0xff, 0x93, 0x8c, 0x47).to_string(), "#ff938c47");
        assert_eq!(Rgba::TRANSPARENT.to_string(), "#00000000");
    }

    #[test]
    fn test_from_str_error() {
        let err = "nope".parse::<Rgba>().unwrap_err();
        assert_eq!(err, Error::InvalidColor("nope".to_string()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn hex_display_roundtrip(r: u8, g: u8, b: u8, a: u8) {
            let color = Rgba::new(r, g, b, a);
            prop_assert_eq!(Rgba::from_hex(&color.to_string()), Some(color));
        }

        #[test]
        fn from_hex_never_panics(s in "\\PC{0,12}") {
            let _ = Rgba::from_hex(&s);
        }
    }
}
