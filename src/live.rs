//! Live, editable preview.
//!
//! [`LivePreviewSync`] owns one visible surface. The surface is filled once
//! with baseline markup; after that every state change reaches it as a
//! narrow patch on an already-rendered node (style text, icon text, the svg
//! `height` attribute, the text node's children) so the user's caret and
//! selection survive. User edits flow back through a change observer on the
//! text node, which is the only writer of the banner text.

use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::observer::{ObserveOptions, ObserverId};
use crate::sandbox::{
    Document, ListenerId, NodeId, ReadyState, RenderHost, SurfaceId, SurfaceOptions, SurfaceStatus,
};
use crate::state::BannerState;
use crate::style;
use crate::template::{
    self, CONTAINER_CLASS, Height, ICON_CLASS, LIVE_BASELINE_HEIGHT, ROOT_CLASS, TEXT_CLASS,
};
use crate::variant::Variant;

/// Nodes of the live markup captured once the document is complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveNodes {
    pub svg: NodeId,
    pub style: NodeId,
    pub root: NodeId,
    pub container: NodeId,
    pub icon: NodeId,
    pub text: NodeId,
}

impl LiveNodes {
    fn locate(document: &Document) -> Result<Self> {
        let body = document.body();
        let find = |selector: &str, role: &'static str| {
            document
                .query_selector(body, selector)
                .ok_or(Error::MissingRenderedNode { role })
        };
        Ok(Self {
            svg: find("svg", "svg")?,
            style: find("svg style", "style")?,
            root: find(&format!(".{ROOT_CLASS}"), ROOT_CLASS)?,
            container: find(&format!(".{CONTAINER_CLASS}"), CONTAINER_CLASS)?,
            icon: find(&format!("svg .{ICON_CLASS}"), ICON_CLASS)?,
            text: find(&format!("svg .{TEXT_CLASS}"), TEXT_CLASS)?,
        })
    }
}

/// Width and content height of the live surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveMetrics {
    pub width: f64,
    /// Post-layout height of `.root` at the current width.
    pub content_height: f64,
}

/// Bidirectional sync between banner state and the visible surface.
#[derive(Debug)]
pub struct LivePreviewSync {
    width: f64,
    height: Option<f64>,
    surface: Option<SurfaceId>,
    listener: Option<ListenerId>,
    observer: Option<ObserverId>,
    nodes: Option<LiveNodes>,
    status: SurfaceStatus,
}

impl LivePreviewSync {
    #[must_use]
    pub fn new(width: f64) -> Self {
        Self {
            width,
            height: None,
            surface: None,
            listener: None,
            observer: None,
            nodes: None,
            status: SurfaceStatus::Uninitialized,
        }
    }

    #[must_use]
    pub fn status(&self) -> SurfaceStatus {
        self.status
    }

    #[must_use]
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    #[must_use]
    pub fn nodes(&self) -> Option<LiveNodes> {
        self.nodes
    }

    #[must_use]
    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn owns(&self, surface: SurfaceId) -> bool {
        self.surface == Some(surface)
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == SurfaceStatus::Live
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the visible surface, tearing down any previous one, and inject
    /// the baseline markup if the host already provides a document.
    pub fn mount<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> Result<SurfaceId> {
        self.unmount(host);
        let surface = host.create_surface(SurfaceOptions {
            height: self.height,
            ..SurfaceOptions::visible(self.width)
        });
        self.surface = Some(surface);
        self.status = SurfaceStatus::AwaitingHost;
        debug!(%surface, width = self.width, "live surface mounted");
        self.inject_baseline(host, surface)?;
        Ok(surface)
    }

    fn inject_baseline<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        surface: SurfaceId,
    ) -> Result<()> {
        if host.document(surface).is_none() {
            return Err(Error::MissingHostDocument { surface });
        }
        if self.listener.is_none() {
            self.listener = Some(host.add_ready_listener(surface)?);
        }
        let baseline = template::compose(LIVE_BASELINE_HEIGHT, "", "", "");
        host.load_markup(surface, &baseline)?;
        self.status = SurfaceStatus::Ready;
        trace!(%surface, "live baseline injected");
        Ok(())
    }

    /// Handle a surface `Load` event.
    pub fn on_load<H: RenderHost + ?Sized>(&mut self, host: &mut H, surface: SurfaceId) -> Result<()> {
        if self.owns(surface) && self.status == SurfaceStatus::AwaitingHost {
            self.inject_baseline(host, surface)?;
        }
        Ok(())
    }

    /// Handle a ready-state change. On `Complete`, capture the nodes, apply
    /// `banner` and start observing edits. Returns whether the preview went
    /// live.
    pub fn on_ready_state_change<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        surface: SurfaceId,
        state: ReadyState,
        banner: &BannerState,
    ) -> Result<bool> {
        if !self.owns(surface) || state != ReadyState::Complete || self.status != SurfaceStatus::Ready {
            return Ok(false);
        }
        self.go_live(host, surface, banner)?;
        Ok(true)
    }

    fn go_live<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        surface: SurfaceId,
        banner: &BannerState,
    ) -> Result<()> {
        let document = host
            .document_mut(surface)
            .ok_or(Error::MissingHostDocument { surface })?;
        let nodes = LiveNodes::locate(document).inspect_err(|err| {
            error!(%surface, %err, "live markup is missing a structural node");
        })?;
        document.set_attribute(nodes.text, "contenteditable", "true");
        self.nodes = Some(nodes);

        self.apply_variant(host, banner.variant)?;
        self.sync_text(host, &banner.text)?;
        self.apply_height(host, banner.height)?;

        self.observer = Some(host.observe(surface, nodes.text, ObserveOptions::EDITING)?);
        self.status = SurfaceStatus::Live;
        debug!(%surface, variant = %banner.variant, "live preview ready");
        Ok(())
    }

    /// Disconnect the observer, drop the listener and destroy the surface.
    pub fn unmount<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        if let Some(observer) = self.observer.take() {
            host.disconnect(surface, observer);
        }
        if let Some(listener) = self.listener.take() {
            host.remove_ready_listener(surface, listener);
        }
        host.destroy_surface(surface);
        self.nodes = None;
        self.status = SurfaceStatus::Uninitialized;
        debug!(%surface, "live surface unmounted");
    }

    // ------------------------------------------------------------------
    // Patches
    // ------------------------------------------------------------------

    /// The live document and captured nodes, or `None` before going live.
    fn target<'h, H: RenderHost + ?Sized>(
        &self,
        host: &'h mut H,
    ) -> Result<Option<(&'h mut Document, LiveNodes)>> {
        let (Some(surface), Some(nodes)) = (self.surface, self.nodes) else {
            return Ok(None);
        };
        let document = host
            .document_mut(surface)
            .ok_or(Error::MissingHostDocument { surface })?;
        Ok(Some((document, nodes)))
    }

    /// Patch style text and icon for `variant`. Returns whether anything
    /// was written.
    pub fn apply_variant<H: RenderHost + ?Sized>(&mut self, host: &mut H, variant: Variant) -> Result<bool> {
        let Some((document, nodes)) = self.target(host)? else {
            return Ok(false);
        };
        let mut wrote = false;

        let sheet = style::resolve(variant);
        if document.text_content(nodes.style) != sheet {
            document.set_text_content(nodes.style, &sheet);
            wrote = true;
        }
        let icon = variant.profile().icon;
        if document.text_content(nodes.icon) != icon {
            document.set_text_content(nodes.icon, icon);
            wrote = true;
        }
        if wrote {
            trace!(%variant, "live variant patched");
        }
        Ok(wrote)
    }

    /// Replace the text node's content with `text` unless it already holds
    /// exactly that.
    pub fn sync_text<H: RenderHost + ?Sized>(&mut self, host: &mut H, text: &str) -> Result<bool> {
        let Some((document, nodes)) = self.target(host)? else {
            return Ok(false);
        };
        if document.inner_html(nodes.text) == text {
            return Ok(false);
        }
        document.set_inner_html(nodes.text, text);
        trace!(bytes = text.len(), "live text patched");
        Ok(true)
    }

    /// Patch the svg `height` attribute and the surface height.
    pub fn apply_height<H: RenderHost + ?Sized>(&mut self, host: &mut H, height: Height) -> Result<bool> {
        let surface_height = height.as_px().filter(|px| px.is_finite() && *px > 0.0);
        let Some((document, nodes)) = self.target(host)? else {
            self.height = surface_height;
            return Ok(false);
        };
        let value = height.to_attribute();
        let wrote = document.attribute(nodes.svg, "height") != Some(value.as_str());
        if wrote {
            document.set_attribute(nodes.svg, "height", &value);
        }
        self.height = surface_height;
        if let Some(surface) = self.surface {
            host.resize_surface(surface, self.width, self.height)?;
        }
        Ok(wrote)
    }

    /// Read back the text after an observer batch. Returns `None` for
    /// batches that do not belong to the current observer.
    pub fn on_mutations<H: RenderHost + ?Sized>(
        &self,
        host: &H,
        surface: SurfaceId,
        observer: ObserverId,
    ) -> Result<Option<String>> {
        if !self.owns(surface) || self.observer != Some(observer) {
            return Ok(None);
        }
        let Some(nodes) = self.nodes else {
            return Ok(None);
        };
        let document = host
            .document(surface)
            .ok_or(Error::MissingHostDocument { surface })?;
        Ok(Some(document.inner_html(nodes.text)))
    }

    /// Resize the surface to `width`.
    pub fn resize<H: RenderHost + ?Sized>(&mut self, host: &mut H, width: f64) -> Result<()> {
        self.width = width;
        if let Some(surface) = self.surface {
            host.resize_surface(surface, width, self.height)?;
        }
        Ok(())
    }

    /// Current width and `.root` height, once live.
    #[must_use]
    pub fn metrics<H: RenderHost + ?Sized>(&self, host: &H) -> Option<LiveMetrics> {
        let surface = self.surface?;
        let nodes = self.nodes?;
        let rect = host.layout_box(surface, nodes.root)?;
        Some(LiveMetrics {
            width: self.width,
            content_height: rect.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{HeadlessHost, HostTask};
    use crate::variant::Theme;

    fn banner() -> BannerState {
        BannerState::new("Hello", Variant::Info, Theme::Light)
    }

    fn go_live(host: &mut HeadlessHost, live: &mut LivePreviewSync, banner: &BannerState) {
        live.mount(host).unwrap();
        while let Some(task) = host.next_task() {
            if let HostTask::ReadyStateChange { surface, state } = task {
                live.on_ready_state_change(host, surface, state, banner).unwrap();
            }
        }
    }

    #[test]
    fn test_goes_live_with_state_applied() {
        let mut host = HeadlessHost::new();
        let mut live = LivePreviewSync::new(600.0);
        let banner = banner();
        go_live(&mut host, &mut live, &banner);

        assert!(live.is_live());
        let surface = live.surface().unwrap();
        let nodes = live.nodes().unwrap();
        let doc = host.document(surface).unwrap();
        assert_eq!(doc.inner_html(nodes.text), "Hello");
        assert_eq!(doc.text_content(nodes.icon), "🛈");
        assert!(doc.text_content(nodes.style).contains("#55687d"));
        assert_eq!(doc.attribute(nodes.text, "contenteditable"), Some("true"));
        assert_eq!(doc.attribute(nodes.svg, "height"), Some("0px"));
        // Applying state before observing produces no echo batch.
        assert!(host.next_task().is_none());
    }

    #[test]
    fn test_patches_are_idempotent() {
        let mut host = HeadlessHost::new();
        let mut live = LivePreviewSync::new(600.0);
        let banner = banner();
        go_live(&mut host, &mut live, &banner);

        assert!(live.apply_variant(&mut host, Variant::Error).unwrap());
        assert!(!live.apply_variant(&mut host, Variant::Error).unwrap());
        assert!(!live.sync_text(&mut host, "Hello").unwrap());
        assert!(live.apply_height(&mut host, Height::Px(64.0)).unwrap());
        assert!(!live.apply_height(&mut host, Height::Px(64.0)).unwrap());

        let surface = live.surface().unwrap();
        assert_eq!(host.surface_options(surface).unwrap().height, Some(64.0));
    }

    #[test]
    fn test_patches_skip_before_live() {
        let mut host = HeadlessHost::new();
        let mut live = LivePreviewSync::new(600.0);
        assert!(!live.apply_variant(&mut host, Variant::Error).unwrap());
        assert!(!live.sync_text(&mut host, "x").unwrap());
        assert!(live.metrics(&host).is_none());
    }

    #[test]
    fn test_missing_nodes_reported() {
        let mut host = HeadlessHost::new();
        let mut live = LivePreviewSync::new(600.0);
        let surface = live.mount(&mut host).unwrap();
        host.load_markup(surface, "<svg><div class=\"root\"></div></svg>").unwrap();
        let mut result = Ok(false);
        while let Some(task) = host.next_task() {
            if let HostTask::ReadyStateChange { surface, state } = task {
                result = live.on_ready_state_change(&mut host, surface, state, &banner());
            }
        }
        assert!(matches!(result, Err(ref e) if e.is_contract_violation()));
        assert!(!live.is_live());
    }

    #[test]
    fn test_unmount_releases_everything() {
        let mut host = HeadlessHost::new();
        let mut live = LivePreviewSync::new(600.0);
        let banner = banner();
        go_live(&mut host, &mut live, &banner);
        let surface = live.surface().unwrap();

        live.unmount(&mut host);
        assert!(!host.contains(surface));
        assert_eq!(live.status(), SurfaceStatus::Uninitialized);
        assert!(live.observer().is_none());
    }
}
