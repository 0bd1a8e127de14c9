//! Off-screen height measurement.
//!
//! The banner's published height is its natural content height at the
//! canonical minimum width. [`HeightOracle`] renders the full markup into a
//! throwaway off-screen surface pinned to that width, waits for the document
//! to complete, reads the post-layout height of `.root` and destroys the
//! surface again.
//!
//! At most one measurement is in flight. Each request tears the previous one
//! down first and bumps a generation counter; readiness signals for any
//! surface other than the current one are rejected as stale, so the last
//! request always wins regardless of completion order.

use tracing::{debug, trace};

use crate::config::PlaygroundOptions;
use crate::error::{Error, Result};
use crate::sandbox::{
    HeadlessHost, HostTask, ListenerId, ReadyState, RenderHost, SurfaceId, SurfaceOptions,
    SurfaceStatus,
};
use crate::style;
use crate::template::{self, Height, OFFSCREEN_HEIGHT, ROOT_CLASS};
use crate::variant::Variant;

/// A completed measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub generation: u64,
    pub height: Height,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    surface: SurfaceId,
    listener: Option<ListenerId>,
    markup: String,
    status: SurfaceStatus,
}

/// Height oracle over a [`RenderHost`].
#[derive(Debug)]
pub struct HeightOracle {
    width: f64,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl HeightOracle {
    /// An oracle measuring at `width` CSS px.
    #[must_use]
    pub fn new(width: f64) -> Self {
        Self {
            width,
            generation: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Generation of the latest request.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Status of the in-flight surface, `Uninitialized` when idle.
    #[must_use]
    pub fn status(&self) -> SurfaceStatus {
        self.in_flight
            .as_ref()
            .map_or(SurfaceStatus::Uninitialized, |f| f.status)
    }

    /// Surface of the in-flight measurement.
    #[must_use]
    pub fn in_flight_surface(&self) -> Option<SurfaceId> {
        self.in_flight.as_ref().map(|f| f.surface)
    }

    /// Whether `surface` is the current measurement surface.
    #[must_use]
    pub fn owns(&self, surface: SurfaceId) -> bool {
        self.in_flight_surface() == Some(surface)
    }

    /// Start measuring `text` rendered as `variant`, superseding any
    /// measurement in flight. Returns the new generation.
    ///
    /// If the host has not given the surface a document yet, the request
    /// stays `AwaitingHost` and this returns
    /// [`Error::MissingHostDocument`]; the markup is injected when the
    /// host's `Load` event arrives.
    pub fn request<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        text: &str,
        variant: Variant,
    ) -> Result<u64> {
        self.teardown(host);
        self.generation += 1;

        let markup = template::compose(
            OFFSCREEN_HEIGHT,
            &style::resolve(variant),
            variant.profile().icon,
            text,
        );
        let surface = host.create_surface(SurfaceOptions::offscreen(self.width));
        debug!(generation = self.generation, %surface, %variant, "measurement requested");
        self.in_flight = Some(InFlight {
            generation: self.generation,
            surface,
            listener: None,
            markup,
            status: SurfaceStatus::AwaitingHost,
        });
        self.inject(host)?;
        Ok(self.generation)
    }

    /// Handle a surface `Load` event.
    pub fn on_load<H: RenderHost + ?Sized>(&mut self, host: &mut H, surface: SurfaceId) -> Result<()> {
        if !self.owns(surface) {
            return Err(Error::StaleMeasurement {
                surface,
                current: self.generation,
            });
        }
        if self.status() == SurfaceStatus::AwaitingHost {
            self.inject(host)?;
        }
        Ok(())
    }

    fn inject<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        let Some(flight) = self.in_flight.as_mut() else {
            return Ok(());
        };
        let surface = flight.surface;
        if host.document(surface).is_none() {
            return Err(Error::MissingHostDocument { surface });
        }
        if flight.listener.is_none() {
            flight.listener = Some(host.add_ready_listener(surface)?);
        }
        host.load_markup(surface, &flight.markup)?;
        flight.status = SurfaceStatus::Ready;
        trace!(generation = flight.generation, %surface, "measurement markup injected");
        Ok(())
    }

    /// Handle a ready-state change. Returns the measurement once the
    /// current surface's document is complete.
    pub fn on_ready_state_change<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        surface: SurfaceId,
        state: ReadyState,
    ) -> Result<Option<Measurement>> {
        let Some(flight) = self.in_flight.as_ref().filter(|f| f.surface == surface) else {
            return Err(Error::StaleMeasurement {
                surface,
                current: self.generation,
            });
        };
        if state != ReadyState::Complete {
            return Ok(None);
        }
        let generation = flight.generation;
        let measured = Self::read_height(host, surface);
        self.teardown(host);
        let height = measured?;
        debug!(generation, %height, "measurement complete");
        Ok(Some(Measurement { generation, height }))
    }

    fn read_height<H: RenderHost + ?Sized>(host: &H, surface: SurfaceId) -> Result<Height> {
        let document = host
            .document(surface)
            .ok_or(Error::MissingHostDocument { surface })?;
        let root = document
            .query_selector(document.body(), &format!(".{ROOT_CLASS}"))
            .ok_or(Error::MissingRenderedNode { role: ROOT_CLASS })?;
        let rect = host
            .layout_box(surface, root)
            .ok_or(Error::MissingRenderedNode { role: ROOT_CLASS })?;
        // Element heights are reported in whole pixels.
        Ok(Height::Px(rect.height.round()))
    }

    /// Drop the in-flight surface, its listener and any queued events.
    pub fn teardown<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(flight) = self.in_flight.take() {
            if let Some(listener) = flight.listener {
                host.remove_ready_listener(flight.surface, listener);
            }
            host.destroy_surface(flight.surface);
            trace!(generation = flight.generation, surface = %flight.surface, "measurement surface removed");
        }
    }
}

/// Measure `text` as `variant` on a private [`HeadlessHost`].
pub fn measure_natural_height(
    text: &str,
    variant: Variant,
    options: &PlaygroundOptions,
) -> Result<Height> {
    let mut host = HeadlessHost::with_options(options.host);
    let mut oracle = HeightOracle::new(options.canonical_min_width);
    oracle.request(&mut host, text, variant)?;
    for _ in 0..options.max_tasks_per_turn {
        let Some(task) = host.next_task() else {
            break;
        };
        match task {
            HostTask::Load { surface } => oracle.on_load(&mut host, surface)?,
            HostTask::ReadyStateChange { surface, state } => {
                if let Some(m) = oracle.on_ready_state_change(&mut host, surface, state)? {
                    return Ok(m.height);
                }
            }
            HostTask::Mutations { .. } => {}
        }
    }
    let pending = oracle.in_flight_surface();
    oracle.teardown(&mut host);
    Err(match pending {
        Some(surface) => Error::MissingHostDocument { surface },
        None => Error::MissingRenderedNode { role: ROOT_CLASS },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::HostOptions;

    fn pump(host: &mut HeadlessHost, oracle: &mut HeightOracle) -> Vec<Result<Option<Measurement>>> {
        let mut out = Vec::new();
        while let Some(task) = host.next_task() {
            if let HostTask::ReadyStateChange { surface, state } = task {
                out.push(oracle.on_ready_state_change(host, surface, state));
            }
        }
        out
    }

    #[test]
    fn test_measures_and_tears_down() {
        let mut host = HeadlessHost::new();
        let mut oracle = HeightOracle::new(300.0);
        let generation = oracle.request(&mut host, "Hello", Variant::Info).unwrap();
        assert_eq!(generation, 1);
        assert_eq!(oracle.status(), SurfaceStatus::Ready);
        assert_eq!(host.surface_count(), 1);

        let results = pump(&mut host, &mut oracle);
        let measurement = results.into_iter().find_map(|r| r.unwrap()).unwrap();
        assert_eq!(measurement.generation, 1);
        assert!(measurement.height.as_px().unwrap() > 0.0);
        assert_eq!(host.surface_count(), 0);
        assert_eq!(oracle.status(), SurfaceStatus::Uninitialized);
    }

    #[test]
    fn test_new_request_supersedes() {
        let mut host = HeadlessHost::with_options(HostOptions::default().auto_complete(false));
        let mut oracle = HeightOracle::new(300.0);
        oracle.request(&mut host, "A", Variant::Info).unwrap();
        let first = oracle.in_flight_surface().unwrap();
        oracle.request(&mut host, "AB", Variant::Info).unwrap();
        assert!(!host.contains(first));
        assert_eq!(host.surface_count(), 1);

        let err = oracle
            .on_ready_state_change(&mut host, first, ReadyState::Complete)
            .unwrap_err();
        assert_eq!(
            err,
            Error::StaleMeasurement {
                surface: first,
                current: 2
            }
        );
    }

    #[test]
    fn test_awaiting_host_then_load() {
        let mut host = HeadlessHost::with_options(HostOptions::default().provide_documents(false));
        let mut oracle = HeightOracle::new(300.0);
        let err = oracle.request(&mut host, "Hi", Variant::Error).unwrap_err();
        assert!(matches!(err, Error::MissingHostDocument { .. }));
        assert_eq!(oracle.status(), SurfaceStatus::AwaitingHost);

        let surface = oracle.in_flight_surface().unwrap();
        host.attach_document(surface).unwrap();
        assert_eq!(host.next_task(), Some(HostTask::Load { surface }));
        oracle.on_load(&mut host, surface).unwrap();
        assert_eq!(oracle.status(), SurfaceStatus::Ready);
        assert!(pump(&mut host, &mut oracle).into_iter().any(|r| matches!(r, Ok(Some(_)))));
    }

    #[test]
    fn test_measure_natural_height_is_deterministic() {
        let options = PlaygroundOptions::default();
        let a = measure_natural_height("Hello", Variant::Warning, &options).unwrap();
        let b = measure_natural_height("Hello", Variant::Warning, &options).unwrap();
        assert_eq!(a, b);
        // Rounded to whole pixels.
        let px = a.as_px().unwrap();
        assert_eq!(px, px.round());
    }
}
