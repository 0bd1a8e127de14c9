//! Isolated rendering sandbox.
//!
//! A [`RenderHost`] owns rendering surfaces. Each surface accepts serialized
//! markup, lays it out at its own width and reports post-layout geometry, and
//! can be destroyed deterministically. Content injection is not synchronous
//! with readiness: after [`RenderHost::load_markup`] the surface's document is
//! `Loading` until the host delivers [`HostTask::ReadyStateChange`] events
//! through [`RenderHost::next_task`].
//!
//! [`HeadlessHost`] is the in-process implementation: an arena DOM filled by
//! the `html5ever` tree builder, a style cascade over `cssparser` tokens, and
//! `taffy` block and flex layout around an inline line breaker.

pub mod css;
pub mod dom;
pub mod host;
pub mod layout;
pub mod parser;

use std::fmt;

use crate::error::Result;
use crate::observer::{MutationRecord, ObserveOptions, ObserverId};

pub use dom::{Document, NodeId};
pub use host::{HeadlessHost, HostOptions};
pub use layout::Rect;

/// Identifier of a rendering surface. Never reused within a host, so a stale
/// id can never alias a newer surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a ready-state listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Where a surface sits relative to the visible viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Visible,
    /// Fully outside the viewport; never affects page layout or scrollbars.
    Offscreen,
}

/// Surface creation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceOptions {
    pub placement: Placement,
    /// Content width in CSS px.
    pub width: f64,
    /// Fixed height of the surface box, if any.
    pub height: Option<f64>,
}

impl SurfaceOptions {
    /// A visible surface of the given width.
    #[must_use]
    pub fn visible(width: f64) -> Self {
        Self {
            placement: Placement::Visible,
            width,
            height: None,
        }
    }

    /// An off-screen surface whose content width is pinned to `width`.
    #[must_use]
    pub fn offscreen(width: f64) -> Self {
        Self {
            placement: Placement::Offscreen,
            width,
            height: None,
        }
    }
}

/// Document loading state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// The state following this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Loading => Some(Self::Interactive),
            Self::Interactive => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

/// Lifecycle of a surface as seen by its owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceStatus {
    #[default]
    Uninitialized,
    /// Surface exists; its content document is not available yet.
    AwaitingHost,
    /// Markup injected; waiting for (or past) readiness.
    Ready,
    /// Nodes captured and observed. Visible surface only.
    Live,
}

/// Work items produced by the host's event loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostTask {
    /// A surface's content document became available.
    Load { surface: SurfaceId },
    /// A surface's document moved to a new ready state.
    ReadyStateChange {
        surface: SurfaceId,
        state: ReadyState,
    },
    /// A batch of change records for one observer.
    Mutations {
        surface: SurfaceId,
        observer: ObserverId,
        records: Vec<MutationRecord>,
    },
}

/// The isolated rendering sandbox capability.
pub trait RenderHost {
    /// Create a new surface.
    fn create_surface(&mut self, options: SurfaceOptions) -> SurfaceId;

    /// Detach and drop a surface with its document, listeners, observers and
    /// any queued tasks. Returns `false` if it did not exist.
    fn destroy_surface(&mut self, surface: SurfaceId) -> bool;

    /// Whether the surface exists.
    fn contains(&self, surface: SurfaceId) -> bool;

    /// Surface placement and size.
    fn surface_options(&self, surface: SurfaceId) -> Option<SurfaceOptions>;

    /// The surface's content document, once available.
    fn document(&self, surface: SurfaceId) -> Option<&Document>;

    /// Mutable access to the surface's content document.
    fn document_mut(&mut self, surface: SurfaceId) -> Option<&mut Document>;

    /// Replace the surface body with `markup`. The document becomes
    /// `Loading`; readiness is reported asynchronously.
    fn load_markup(&mut self, surface: SurfaceId, markup: &str) -> Result<()>;

    /// Subscribe to ready-state changes of the surface's document.
    fn add_ready_listener(&mut self, surface: SurfaceId) -> Result<ListenerId>;

    /// Unsubscribe a ready-state listener.
    fn remove_ready_listener(&mut self, surface: SurfaceId, listener: ListenerId) -> bool;

    /// Change the surface size.
    fn resize_surface(&mut self, surface: SurfaceId, width: f64, height: Option<f64>)
    -> Result<()>;

    /// Post-layout border box of `node`.
    fn layout_box(&self, surface: SurfaceId, node: NodeId) -> Option<Rect>;

    /// Attach a change observer to `node`.
    fn observe(
        &mut self,
        surface: SurfaceId,
        node: NodeId,
        options: ObserveOptions,
    ) -> Result<ObserverId>;

    /// Detach an observer, discarding undelivered records.
    fn disconnect(&mut self, surface: SurfaceId, observer: ObserverId) -> bool;

    /// Next task in event-loop order: pending change batches first
    /// (microtask checkpoint), then queued events.
    fn next_task(&mut self) -> Option<HostTask>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_order() {
        assert_eq!(ReadyState::Loading.next(), Some(ReadyState::Interactive));
        assert_eq!(ReadyState::Interactive.next(), Some(ReadyState::Complete));
        assert_eq!(ReadyState::Complete.next(), None);
        assert!(ReadyState::Loading < ReadyState::Complete);
    }

    #[test]
    fn test_surface_options() {
        let opts = SurfaceOptions::offscreen(300.0);
        assert_eq!(opts.placement, Placement::Offscreen);
        assert_eq!(opts.width, 300.0);
        assert_eq!(SurfaceOptions::visible(600.0).placement, Placement::Visible);
    }
}
