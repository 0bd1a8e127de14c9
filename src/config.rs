//! Playground configuration.

pub use crate::sandbox::host::HostOptions;
pub use crate::sandbox::layout::FontMetrics;
use crate::variant::{Theme, Variant};

/// Copy shown in a freshly opened playground.
pub const SAMPLE_TEXT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris!";

/// Narrowest width the banner is designed for, in CSS px. Measurements are
/// taken at this width so the published height fits every container.
pub const CANONICAL_MIN_WIDTH: f64 = 300.0;

/// Initial width of the live preview, in CSS px.
pub const DEFAULT_LIVE_WIDTH: f64 = 600.0;

/// Upper bound on host tasks dispatched by one pump.
pub const DEFAULT_MAX_TASKS_PER_TURN: usize = 10_000;

/// Options for [`Playground`](crate::Playground).
#[derive(Clone, Debug, PartialEq)]
pub struct PlaygroundOptions {
    /// Width of the off-screen measurement surface.
    pub canonical_min_width: f64,
    /// Initial width of the live surface. Never below `canonical_min_width`.
    pub live_width: f64,
    pub initial_text: String,
    pub initial_variant: Variant,
    pub initial_theme: Theme,
    pub max_tasks_per_turn: usize,
    /// Options for the default [`HeadlessHost`](crate::sandbox::HeadlessHost).
    pub host: HostOptions,
}

impl Default for PlaygroundOptions {
    fn default() -> Self {
        Self {
            canonical_min_width: CANONICAL_MIN_WIDTH,
            live_width: DEFAULT_LIVE_WIDTH,
            initial_text: SAMPLE_TEXT.to_string(),
            initial_variant: Variant::default(),
            initial_theme: Theme::default(),
            max_tasks_per_turn: DEFAULT_MAX_TASKS_PER_TURN,
            host: HostOptions::default(),
        }
    }
}

impl PlaygroundOptions {
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.initial_text = text.into();
        self
    }

    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.initial_variant = variant;
        self
    }

    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.initial_theme = theme;
        self
    }

    #[must_use]
    pub fn live_width(mut self, width: f64) -> Self {
        self.live_width = width;
        self
    }

    #[must_use]
    pub fn canonical_min_width(mut self, width: f64) -> Self {
        self.canonical_min_width = width;
        self
    }

    #[must_use]
    pub fn max_tasks_per_turn(mut self, limit: usize) -> Self {
        self.max_tasks_per_turn = limit;
        self
    }

    #[must_use]
    pub fn host(mut self, host: HostOptions) -> Self {
        self.host = host;
        self
    }

    /// Live width clamped to the canonical minimum.
    #[must_use]
    pub fn effective_live_width(&self) -> f64 {
        clamp_width(self.live_width, self.canonical_min_width)
    }
}

/// Clamp a requested width to `min`; non-finite requests fall back to `min`.
#[must_use]
pub fn clamp_width(width: f64, min: f64) -> f64 {
    if width.is_finite() { width.max(min) } else { min }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = PlaygroundOptions::default();
        assert_eq!(opts.canonical_min_width, 300.0);
        assert_eq!(opts.live_width, 600.0);
        assert_eq!(opts.initial_variant, Variant::Warning);
        assert_eq!(opts.initial_theme, Theme::Light);
        assert!(opts.initial_text.starts_with("Lorem ipsum"));
        assert!(opts.initial_text.ends_with("laboris!"));
        assert_eq!(opts.max_tasks_per_turn, 10_000);
    }

    #[test]
    fn test_live_width_clamped() {
        assert_eq!(PlaygroundOptions::default().live_width(120.0).effective_live_width(), 300.0);
        assert_eq!(clamp_width(f64::NAN, 300.0), 300.0);
        assert_eq!(clamp_width(640.0, 300.0), 640.0);
    }
}
