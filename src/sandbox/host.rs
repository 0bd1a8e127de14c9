//! In-process rendering host.
//!
//! [`HeadlessHost`] keeps one [`Document`] per surface and a FIFO of
//! macrotasks (document loads and ready-state transitions). Change records
//! collected by observers are delivered at a microtask checkpoint that runs
//! before each macrotask, so every burst of synchronous edits reaches its
//! observer as one batch.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::observer::{ObserveOptions, ObserverId};
use crate::sandbox::layout::{self, FontMetrics, Rect};
use crate::sandbox::{
    Document, HostTask, ListenerId, NodeId, ReadyState, RenderHost, SurfaceId, SurfaceOptions,
};

/// Style placed in every surface's head the first time markup is loaded.
pub const SANDBOX_HEAD_STYLE: &str = "body { margin: 0; overflow-y: hidden; } \
::selection { background: rgba(0, 0, 0, 0.1); color: inherit; } \
[contenteditable=\"true\"]:focus { outline: none; }";

/// Host behaviour switches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostOptions {
    /// Give new surfaces a blank document right away. When off, documents
    /// appear only through [`HeadlessHost::attach_document`].
    pub provide_documents: bool,
    /// Queue the `Interactive` and `Complete` transitions as soon as markup is
    /// loaded. When off, call [`HeadlessHost::complete_loading`].
    pub auto_complete: bool,
    pub metrics: FontMetrics,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            provide_documents: true,
            auto_complete: true,
            metrics: FontMetrics::default(),
        }
    }
}

impl HostOptions {
    #[must_use]
    pub fn provide_documents(mut self, enabled: bool) -> Self {
        self.provide_documents = enabled;
        self
    }

    #[must_use]
    pub fn auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = enabled;
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: FontMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

#[derive(Debug)]
struct Surface {
    options: SurfaceOptions,
    document: Option<Document>,
    listeners: Vec<ListenerId>,
    head_styled: bool,
}

/// Single-threaded sandbox with a deterministic event loop.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    options: HostOptions,
    surfaces: BTreeMap<SurfaceId, Surface>,
    tasks: VecDeque<HostTask>,
    next_surface: u64,
    next_listener: u64,
    next_observer: u64,
}

impl HeadlessHost {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(HostOptions::default())
    }

    #[must_use]
    pub fn with_options(options: HostOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    /// Live surface ids in creation order.
    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.keys().copied()
    }

    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Queued macrotasks, excluding undelivered change records.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Whether a task or change batch is waiting.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.tasks.is_empty()
            || self
                .surfaces
                .values()
                .filter_map(|s| s.document.as_ref())
                .any(Document::has_pending_records)
    }

    /// Give a surface its document and queue its `Load` event.
    pub fn attach_document(&mut self, surface: SurfaceId) -> Result<()> {
        let entry = self
            .surfaces
            .get_mut(&surface)
            .ok_or(Error::UnknownSurface { surface })?;
        if entry.document.is_none() {
            entry.document = Some(Document::new());
            self.tasks.push_back(HostTask::Load { surface });
            trace!(%surface, "document attached");
        }
        Ok(())
    }

    /// Queue the remaining ready-state transitions of a surface's document.
    pub fn complete_loading(&mut self, surface: SurfaceId) -> Result<()> {
        let entry = self
            .surfaces
            .get(&surface)
            .ok_or(Error::UnknownSurface { surface })?;
        let document = entry
            .document
            .as_ref()
            .ok_or(Error::MissingHostDocument { surface })?;
        let mut state = document.ready_state();
        while let Some(next) = state.next() {
            self.tasks
                .push_back(HostTask::ReadyStateChange { surface, state: next });
            state = next;
        }
        Ok(())
    }

    /// Lay out a surface's document at its current width.
    #[must_use]
    pub fn layout(&self, surface: SurfaceId) -> Option<layout::Layout> {
        let entry = self.surfaces.get(&surface)?;
        let document = entry.document.as_ref()?;
        Some(layout::layout(
            document,
            entry.options.width,
            &self.options.metrics,
        ))
    }

    fn entry_mut(&mut self, surface: SurfaceId) -> Result<&mut Surface> {
        self.surfaces
            .get_mut(&surface)
            .ok_or(Error::UnknownSurface { surface })
    }

    fn drop_tasks_for(&mut self, surface: SurfaceId, ready_only: bool) {
        self.tasks.retain(|task| match task {
            HostTask::ReadyStateChange { surface: s, .. } => *s != surface,
            HostTask::Load { surface: s } | HostTask::Mutations { surface: s, .. } => {
                ready_only || *s != surface
            }
        });
    }

    /// Microtask checkpoint: the first observer batch waiting anywhere.
    fn take_mutation_batch(&mut self) -> Option<HostTask> {
        self.surfaces.iter_mut().find_map(|(&surface, entry)| {
            let (observer, records) = entry.document.as_mut()?.take_pending_batch()?;
            Some(HostTask::Mutations {
                surface,
                observer,
                records,
            })
        })
    }
}

impl RenderHost for HeadlessHost {
    fn create_surface(&mut self, options: SurfaceOptions) -> SurfaceId {
        self.next_surface += 1;
        let surface = SurfaceId::new(self.next_surface);
        let document = self.options.provide_documents.then(Document::new);
        self.surfaces.insert(
            surface,
            Surface {
                options,
                document,
                listeners: Vec::new(),
                head_styled: false,
            },
        );
        debug!(%surface, placement = ?options.placement, width = options.width, "surface created");
        surface
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> bool {
        let existed = self.surfaces.remove(&surface).is_some();
        if existed {
            self.drop_tasks_for(surface, false);
            debug!(%surface, "surface destroyed");
        }
        existed
    }

    fn contains(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    fn surface_options(&self, surface: SurfaceId) -> Option<SurfaceOptions> {
        self.surfaces.get(&surface).map(|s| s.options)
    }

    fn document(&self, surface: SurfaceId) -> Option<&Document> {
        self.surfaces.get(&surface)?.document.as_ref()
    }

    fn document_mut(&mut self, surface: SurfaceId) -> Option<&mut Document> {
        self.surfaces.get_mut(&surface)?.document.as_mut()
    }

    fn load_markup(&mut self, surface: SurfaceId, markup: &str) -> Result<()> {
        let auto_complete = self.options.auto_complete;
        let entry = self.entry_mut(surface)?;
        let inject_head = !entry.head_styled;
        let document = entry
            .document
            .as_mut()
            .ok_or(Error::MissingHostDocument { surface })?;

        if inject_head {
            let head = document.head();
            let style = document.create_element("style");
            document.set_text_content(style, SANDBOX_HEAD_STYLE);
            document.append_child(head, style);
        }
        let body = document.body();
        document.set_inner_html(body, markup);
        document.set_ready_state(ReadyState::Loading);
        entry.head_styled = true;

        self.drop_tasks_for(surface, true);
        if auto_complete {
            self.complete_loading(surface)?;
        }
        trace!(%surface, bytes = markup.len(), "markup loaded");
        Ok(())
    }

    fn add_ready_listener(&mut self, surface: SurfaceId) -> Result<ListenerId> {
        self.next_listener += 1;
        let listener = ListenerId::new(self.next_listener);
        self.entry_mut(surface)?.listeners.push(listener);
        Ok(listener)
    }

    fn remove_ready_listener(&mut self, surface: SurfaceId, listener: ListenerId) -> bool {
        let Some(entry) = self.surfaces.get_mut(&surface) else {
            return false;
        };
        let before = entry.listeners.len();
        entry.listeners.retain(|&l| l != listener);
        entry.listeners.len() != before
    }

    fn resize_surface(
        &mut self,
        surface: SurfaceId,
        width: f64,
        height: Option<f64>,
    ) -> Result<()> {
        let entry = self.entry_mut(surface)?;
        entry.options.width = width;
        entry.options.height = height;
        Ok(())
    }

    fn layout_box(&self, surface: SurfaceId, node: NodeId) -> Option<Rect> {
        self.layout(surface)?.get(node)
    }

    fn observe(
        &mut self,
        surface: SurfaceId,
        node: NodeId,
        options: ObserveOptions,
    ) -> Result<ObserverId> {
        self.next_observer += 1;
        let observer = ObserverId::new(self.next_observer);
        let document = self
            .entry_mut(surface)?
            .document
            .as_mut()
            .ok_or(Error::MissingHostDocument { surface })?;
        if !document.is_connected(node) {
            return Err(Error::MissingRenderedNode {
                role: "observed node",
            });
        }
        document.observe(observer, node, options);
        trace!(%surface, %observer, %node, "observer attached");
        Ok(observer)
    }

    fn disconnect(&mut self, surface: SurfaceId, observer: ObserverId) -> bool {
        self.document_mut(surface)
            .is_some_and(|document| document.disconnect(observer))
    }

    fn next_task(&mut self) -> Option<HostTask> {
        if let Some(batch) = self.take_mutation_batch() {
            return Some(batch);
        }
        while let Some(task) = self.tasks.pop_front() {
            match task {
                HostTask::ReadyStateChange { surface, state } => {
                    let Some(entry) = self.surfaces.get_mut(&surface) else {
                        continue;
                    };
                    let Some(document) = entry.document.as_mut() else {
                        continue;
                    };
                    document.set_ready_state(state);
                    if !entry.listeners.is_empty() {
                        return Some(task);
                    }
                }
                HostTask::Load { surface } | HostTask::Mutations { surface, .. } => {
                    if self.surfaces.contains_key(&surface) {
                        return Some(task);
                    }
                }
            }
        }
        None
    }
}
