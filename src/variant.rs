//! Alert variants, page themes and the static style profile table.

use std::fmt;
use std::str::FromStr;

use crate::color::Rgba;
use crate::error::Error;

/// Alert severity. Closed set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Info,
    #[default]
    Warning,
    Error,
}

impl Variant {
    /// All variants in control-panel order.
    pub const ALL: [Self; 3] = [Self::Info, Self::Warning, Self::Error];

    /// Lowercase identifier (`info`, `warning`, `error`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// The static style profile for this variant.
    #[must_use]
    pub const fn profile(self) -> &'static StyleProfile {
        match self {
            Self::Info => &INFO,
            Self::Warning => &WARNING,
            Self::Error => &ERROR,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(Error::InvalidVariant(s.to_string())),
        }
    }
}

/// Page theme. Only affects the chrome around the artifact, never the markup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(Error::InvalidTheme(s.to_string())),
        }
    }
}

/// Icon and colors for one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleProfile {
    pub icon: &'static str,
    pub text: Rgba,
    pub code: Rgba,
    pub background: Rgba,
}

static INFO: StyleProfile = StyleProfile {
    icon: "🛈",
    text: Rgba::rgb(0x55, 0x68, 0x7d),
    code: Rgba::new(0x79, 0xb8, 0xff, 0x40),
    background: Rgba::new(0x79, 0xb8, 0xff, 0x40),
};

static WARNING: StyleProfile = StyleProfile {
    icon: "⚠",
    text: Rgba::rgb(0xef, 0x69, 0x0c),
    code: Rgba::new(0xf6, 0x7f, 0x18, 0x2b),
    background: Rgba::new(0xff, 0x96, 0x3e, 0x40),
};

static ERROR: StyleProfile = StyleProfile {
    icon: "🗙",
    text: Rgba::rgb(0xff, 0x7b, 0x72),
    code: Rgba::new(0xff, 0x93, 0x8c, 0x47),
    background: Rgba::new(0xff, 0x93, 0x8c, 0x47),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_roundtrip() {
        for variant in Variant::ALL {
            assert_eq!(variant.as_str().parse::<Variant>(), Ok(variant));
        }
        assert_eq!(" Error ".parse::<Variant>(), Ok(Variant::Error));
        assert!(matches!(
            "fatal".parse::<Variant>(),
            Err(Error::InvalidVariant(_))
        ));
    }

    #[test]
    fn test_only_canonical_names_parse() {
        for alias in ["warn", "err", "information", ""] {
            assert_eq!(
                alias.parse::<Variant>(),
                Err(Error::InvalidVariant(alias.to_string()))
            );
        }
    }

    #[test]
    fn test_profiles() {
        assert_eq!(Variant::Info.profile().icon, "🛈");
        assert_eq!(Variant::Info.profile().text.to_string(), "#55687d");
        assert_eq!(Variant::Warning.profile().icon, "⚠");
        assert_eq!(Variant::Error.profile().icon, "🗙");
        assert_eq!(Variant::Error.profile().text.to_string(), "#ff7b72");
        assert_eq!(Variant::Warning.profile().code.to_string(), "#f67f182b");
    }

    #[test]
    fn test_theme() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!("DARK".parse::<Theme>(), Ok(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
    }
}
