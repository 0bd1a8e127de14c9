//! `alert_banner` - render, measure and live-edit SVG alert banners
//!
//! A banner is a self-contained `<svg>` whose `<foreignObject>` carries an
//! XHTML alert (icon plus rich text) styled by an embedded sheet. The crate
//! composes that markup, measures its natural height off-screen at the
//! narrowest supported width, and keeps an editable live preview in sync with
//! the banner state in both directions.
//!
//! Rendering happens inside a [`RenderHost`](sandbox::RenderHost). The
//! bundled [`HeadlessHost`](sandbox::HeadlessHost) is a deterministic
//! in-process sandbox with its own document model, style cascade and layout.

// Crate-level lint configuration
#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation)] // Pixel math on column counts
#![allow(clippy::cast_precision_loss)] // Column counts to f64 advances
#![allow(clippy::module_name_repetitions)] // Allow style::StyleSheet etc
#![allow(clippy::struct_excessive_bools)] // Host switches are plain flags
#![allow(clippy::missing_errors_doc)] // Docs WIP
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::float_cmp)] // Layout values are compared after rounding
#![allow(clippy::suboptimal_flops)] // Standard math notation is clearer than mul_add
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::cast_lossless)] // as casts are fine for primitive widening
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::redundant_clone)] // Clones in tests for clarity are fine
#![allow(clippy::semicolon_if_nothing_returned)] // Style preference
#![allow(clippy::needless_collect)] // Collect for assertions is clear

pub mod color;
pub mod config;
pub mod error;
pub mod live;
pub mod observer;
pub mod oracle;
pub mod playground;
pub mod sandbox;
pub mod source;
pub mod state;
pub mod style;
pub mod template;
pub mod unicode;
pub mod variant;

// Re-export core types at crate root
pub use color::Rgba;
pub use config::{FontMetrics, HostOptions, PlaygroundOptions, SAMPLE_TEXT};
pub use error::{Error, Result};
pub use playground::Playground;
pub use state::{BannerState, BannerStore, Changes};
pub use template::{Height, compose};
pub use variant::{StyleProfile, Theme, Variant};

// Re-export engine parts
pub use live::{LiveMetrics, LivePreviewSync};
pub use oracle::{HeightOracle, Measurement, measure_natural_height};
pub use sandbox::{HeadlessHost, RenderHost};
pub use source::source_markup;
pub use style::resolve;
