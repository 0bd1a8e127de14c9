//! Error types for the banner engine.

use std::fmt;

use crate::sandbox::{NodeId, SurfaceId};

/// Result type alias for banner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for banner operations.
///
/// None of these ever cross into [`BannerState`](crate::state::BannerState):
/// the playground handles each one locally by skipping the affected update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A rendering surface never exposed a usable content document.
    MissingHostDocument { surface: SurfaceId },
    /// A structural node (`root`, `container`, `icon`, `text`, ...) was not
    /// found after injection. Indicates a markup contract mismatch.
    MissingRenderedNode { role: &'static str },
    /// A readiness signal arrived for a measurement surface that is no longer
    /// the in-flight one. `current` is the generation of the live request.
    StaleMeasurement { surface: SurfaceId, current: u64 },
    /// The surface id does not name a live surface.
    UnknownSurface { surface: SurfaceId },
    /// An edit targeted a node outside any `contenteditable` region.
    NotEditable { node: NodeId },
    /// Unknown variant name.
    InvalidVariant(String),
    /// Unknown theme name.
    InvalidTheme(String),
    /// Invalid color format (e.g., malformed hex string).
    InvalidColor(String),
}

impl Error {
    /// Whether this error points at a defect in the composed markup rather
    /// than a transient host condition.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingRenderedNode { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHostDocument { surface } => {
                write!(f, "surface {surface} has no content document")
            }
            Self::MissingRenderedNode { role } => {
                write!(f, "rendered markup has no `{role}` node")
            }
            Self::StaleMeasurement { surface, current } => write!(
                f,
                "stale measurement on surface {surface}, current generation is {current}"
            ),
            Self::UnknownSurface { surface } => write!(f, "unknown surface {surface}"),
            Self::NotEditable { node } => write!(f, "node {node} is not editable"),
            Self::InvalidVariant(s) => {
                write!(f, "invalid variant: {s} (expected info, warning or error)")
            }
            Self::InvalidTheme(s) => write!(f, "invalid theme: {s} (expected dark or light)"),
            Self::InvalidColor(s) => write!(f, "invalid color format: {s}"),
        }
    }
}

impl std::error::Error for Error {}
