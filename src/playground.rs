//! The banner playground: state, live preview and height oracle wired
//! together over one render host.
//!
//! All work happens on the caller's thread. Setters update the store and
//! immediately [`propagate`](Playground::propagate) the resulting changes;
//! host events (document loads, readiness, edit batches) are dispatched by
//! [`run_until_idle`](Playground::run_until_idle).

use tracing::{debug, error, trace, warn};

use crate::config::{PlaygroundOptions, clamp_width};
use crate::error::{Error, Result};
use crate::live::{LiveMetrics, LivePreviewSync};
use crate::oracle::HeightOracle;
use crate::sandbox::{HeadlessHost, HostTask, NodeId, RenderHost, SurfaceId};
use crate::source::source_markup;
use crate::state::{BannerState, BannerStore, Changes};
use crate::template::Height;
use crate::variant::{Theme, Variant};

/// Banner playground over a [`RenderHost`].
pub struct Playground<H: RenderHost = HeadlessHost> {
    host: H,
    options: PlaygroundOptions,
    store: BannerStore,
    oracle: HeightOracle,
    live: LivePreviewSync,
}

impl Playground<HeadlessHost> {
    /// A playground on a fresh [`HeadlessHost`] built from `options.host`.
    #[must_use]
    pub fn new(options: PlaygroundOptions) -> Self {
        let host = HeadlessHost::with_options(options.host);
        Self::with_host(host, options)
    }
}

impl Default for Playground<HeadlessHost> {
    fn default() -> Self {
        Self::new(PlaygroundOptions::default())
    }
}

impl<H: RenderHost> Playground<H> {
    /// Mount the live preview and request the first measurement on `host`.
    ///
    /// Nothing is rendered until the host's events are pumped with
    /// [`run_until_idle`](Self::run_until_idle).
    pub fn with_host(host: H, options: PlaygroundOptions) -> Self {
        let state = BannerState::new(
            options.initial_text.clone(),
            options.initial_variant,
            options.initial_theme,
        );
        let mut playground = Self {
            host,
            store: BannerStore::new(state),
            oracle: HeightOracle::new(options.canonical_min_width),
            live: LivePreviewSync::new(options.effective_live_width()),
            options,
        };
        let mounted = playground.live.mount(&mut playground.host).map(|_| ());
        settle(mounted, "mount live preview");
        playground.request_height();
        playground
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &BannerState {
        self.store.state()
    }

    #[must_use]
    pub fn store(&self) -> &BannerStore {
        &self.store
    }

    /// Register a state subscriber.
    pub fn store_mut(&mut self) -> &mut BannerStore {
        &mut self.store
    }

    #[must_use]
    pub fn options(&self) -> &PlaygroundOptions {
        &self.options
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn live(&self) -> &LivePreviewSync {
        &self.live
    }

    #[must_use]
    pub fn oracle(&self) -> &HeightOracle {
        &self.oracle
    }

    /// Last published height.
    #[must_use]
    pub fn height(&self) -> Height {
        self.store.height()
    }

    /// Copy-ready markup for the current state.
    #[must_use]
    pub fn source(&self) -> String {
        source_markup(self.store.state())
    }

    /// Width and `.root` height of the live preview.
    #[must_use]
    pub fn live_metrics(&self) -> Option<LiveMetrics> {
        self.live.metrics(&self.host)
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Select the alert variant.
    pub fn select_variant(&mut self, variant: Variant) -> bool {
        let changed = self.store.set_variant(variant);
        self.propagate();
        changed
    }

    /// Select the page theme. The artifact is unaffected.
    pub fn set_theme(&mut self, theme: Theme) -> bool {
        let changed = self.store.set_theme(theme);
        self.propagate();
        changed
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.store.theme().toggled();
        self.set_theme(theme);
        theme
    }

    /// Replace the live text as a user edit would. The change reaches the
    /// state once the host delivers the edit batch.
    pub fn edit_live_text(&mut self, html: &str) -> Result<()> {
        let (surface, text) = self.live_text_node()?;
        self.host
            .document_mut(surface)
            .ok_or(Error::MissingHostDocument { surface })?
            .user_edit(text, html)
    }

    /// Type plain text at the end of the live text.
    pub fn type_live_text(&mut self, text: &str) -> Result<()> {
        let (surface, node) = self.live_text_node()?;
        self.host
            .document_mut(surface)
            .ok_or(Error::MissingHostDocument { surface })?
            .insert_text(node, text)
    }

    fn live_text_node(&self) -> Result<(SurfaceId, NodeId)> {
        let nodes = self
            .live
            .nodes()
            .ok_or(Error::MissingRenderedNode { role: "text" })?;
        let surface = self
            .live
            .surface()
            .ok_or(Error::MissingRenderedNode { role: "text" })?;
        Ok((surface, nodes.text))
    }

    /// Resize the live preview, never below the canonical minimum width.
    pub fn resize_live(&mut self, width: f64) -> Result<f64> {
        let width = clamp_width(width, self.options.canonical_min_width);
        self.live.resize(&mut self.host, width)?;
        debug!(width, "live preview resized");
        Ok(width)
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Dispatch host events until none are left or the per-turn budget is
    /// spent. Returns the number of events dispatched.
    pub fn run_until_idle(&mut self) -> usize {
        let mut dispatched = 0;
        while dispatched < self.options.max_tasks_per_turn {
            let Some(task) = self.host.next_task() else {
                return dispatched;
            };
            self.dispatch(task);
            self.propagate();
            dispatched += 1;
        }
        warn!(
            limit = self.options.max_tasks_per_turn,
            "task budget exhausted; remaining events stay queued"
        );
        dispatched
    }

    fn dispatch(&mut self, task: HostTask) {
        trace!(?task, "dispatch");
        match task {
            HostTask::Load { surface } => {
                if self.live.owns(surface) {
                    settle(self.live.on_load(&mut self.host, surface), "live load");
                } else {
                    settle(self.oracle.on_load(&mut self.host, surface), "measurement load");
                }
            }
            HostTask::ReadyStateChange { surface, state } => {
                if self.live.owns(surface) {
                    let result = self.live.on_ready_state_change(
                        &mut self.host,
                        surface,
                        state,
                        self.store.state(),
                    );
                    settle(result.map(|_| ()), "live readiness");
                    return;
                }
                match self.oracle.on_ready_state_change(&mut self.host, surface, state) {
                    Ok(Some(measurement)) => {
                        self.store.publish_height(measurement.height);
                    }
                    Ok(None) => {}
                    Err(err) => settle(Err(err), "measurement readiness"),
                }
            }
            HostTask::Mutations {
                surface, observer, ..
            } => match self.live.on_mutations(&self.host, surface, observer) {
                Ok(Some(text)) => {
                    self.store.commit_text(&text);
                }
                Ok(None) => {}
                Err(err) => settle(Err(err), "live edit"),
            },
        }
    }

    /// Apply pending state changes in dependency order: a text or variant
    /// change requests a new measurement before the live preview is patched,
    /// and a height change patches the preview's height.
    pub fn propagate(&mut self) {
        loop {
            let changes = self.store.take_changes();
            if changes.is_empty() {
                return;
            }
            trace!(?changes, "propagate");
            if changes.intersects(Changes::REMEASURE) {
                self.request_height();
            }
            if changes.contains(Changes::VARIANT) {
                let result = self.live.apply_variant(&mut self.host, self.store.variant());
                settle(result.map(|_| ()), "patch variant");
            }
            if changes.contains(Changes::TEXT) {
                let result = self.live.sync_text(&mut self.host, self.store.text());
                settle(result.map(|_| ()), "patch text");
            }
            if changes.contains(Changes::HEIGHT) {
                let result = self.live.apply_height(&mut self.host, self.store.height());
                settle(result.map(|_| ()), "patch height");
            }
            if changes.contains(Changes::THEME) {
                debug!(theme = %self.store.theme(), "theme changed");
            }
        }
    }

    fn request_height(&mut self) {
        let result = self
            .oracle
            .request(&mut self.host, self.store.text(), self.store.variant());
        settle(result.map(|_| ()), "request measurement");
    }

    /// Tear down the live preview and any measurement in flight.
    pub fn shutdown(&mut self) {
        self.oracle.teardown(&mut self.host);
        self.live.unmount(&mut self.host);
    }
}

impl<H: RenderHost> Drop for Playground<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Log an engine error at the level its kind deserves and carry on.
fn settle(result: Result<()>, context: &'static str) {
    let Err(err) = result else {
        return;
    };
    match err {
        Error::StaleMeasurement { .. } => debug!(context, %err, "discarded"),
        Error::MissingRenderedNode { .. } => error!(context, %err, "skipped"),
        _ => warn!(context, %err, "skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_render_publishes_height() {
        let mut playground = Playground::default();
        assert_eq!(playground.height(), Height::Px(0.0));
        assert!(playground.run_until_idle() > 0);
        assert!(playground.live().is_live());
        assert!(playground.height().as_px().unwrap() > 0.0);
        assert_eq!(playground.host().surface_count(), 1);
    }

    #[test]
    fn test_theme_is_chrome_only() {
        let mut playground = Playground::default();
        playground.run_until_idle();
        let before = playground.source();
        assert_eq!(playground.toggle_theme(), Theme::Dark);
        playground.run_until_idle();
        assert_eq!(playground.source(), before);
        assert_eq!(playground.store().writes().height, 1);
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut playground = Playground::default();
        playground.run_until_idle();
        assert_eq!(playground.resize_live(120.0).unwrap(), 300.0);
        let metrics = playground.live_metrics().unwrap();
        assert_eq!(metrics.width, 300.0);
        assert!(metrics.content_height > 0.0);
    }

    #[test]
    fn test_drop_releases_surfaces() {
        let mut playground = Playground::default();
        playground.run_until_idle();
        playground.shutdown();
        assert_eq!(playground.host().surface_count(), 0);
    }
}
