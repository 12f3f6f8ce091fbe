//! Recording implementations of the surface seams.
//!
//! They keep all state behind shared handles so a test (or the demo) can
//! drive the host and inspect what the controller asked the surface to do.

use super::{
    GeolocationProvider, HostEnvironment, InteractionBinding, MapSurface, MarkerHandle,
    ObserverId, SurfaceLoader, SurfaceOptions, WindowEventKind, WindowListenerId,
};
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::viewport::Viewport;
use crate::input::capability::DeviceHints;
use crate::layers::marker::MarkerSpec;
use crate::prelude::{Arc, Duration};
use crate::tiles::chain::TileTicket;
use crate::tiles::provider::TileProviderSpec;
use crate::ui::popup::PopupContent;
use crate::{MapError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    observers: BTreeSet<u64>,
    listeners: BTreeMap<u64, WindowEventKind>,
    hints: DeviceHints,
}

/// In-memory page: a resizable container plus window listener bookkeeping
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    size: Arc<watch::Sender<Point>>,
    inner: Arc<Mutex<HostState>>,
}

impl HeadlessHost {
    pub fn new(size: Point, hints: DeviceHints) -> Self {
        let (tx, _rx) = watch::channel(size);
        Self {
            size: Arc::new(tx),
            inner: Arc::new(Mutex::new(HostState {
                hints,
                ..HostState::default()
            })),
        }
    }

    /// Changes the container size and notifies observers
    pub fn resize(&self, size: Point) {
        self.size.send_replace(size);
    }

    pub fn size_receiver(&self) -> watch::Receiver<Point> {
        self.size.subscribe()
    }

    pub fn active_observers(&self) -> usize {
        lock(&self.inner).observers.len()
    }

    pub fn active_listeners(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl HostEnvironment for HeadlessHost {
    fn container_size(&self) -> Point {
        *self.size.borrow()
    }

    fn observe_container(&mut self) -> (ObserverId, watch::Receiver<Point>) {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.observers.insert(id);
        (ObserverId(id), self.size.subscribe())
    }

    fn disconnect_observer(&mut self, id: ObserverId) {
        lock(&self.inner).observers.remove(&id.0);
    }

    fn add_window_listener(&mut self, kind: WindowEventKind) -> WindowListenerId {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.insert(id, kind);
        WindowListenerId(id)
    }

    fn remove_window_listener(&mut self, id: WindowListenerId) {
        lock(&self.inner).listeners.remove(&id.0);
    }

    fn device_hints(&self) -> DeviceHints {
        lock(&self.inner).hints
    }
}

/// Everything a headless surface has been asked to do
#[derive(Debug, Default)]
pub struct SurfaceState {
    /// Surfaces handed out by the loader
    pub instances: u32,
    pub destroyed: bool,
    pub ready: bool,
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub markers: BTreeMap<MarkerHandle, MarkerSpec>,
    pub bindings: BTreeMap<MarkerHandle, InteractionBinding>,
    pub created_total: u32,
    pub updated_total: u32,
    pub removed_total: u32,
    pub tiles: Option<(String, TileTicket)>,
    pub attach_count: u32,
    pub popup: Option<(MarkerHandle, PopupContent)>,
    pub tooltips: BTreeMap<MarkerHandle, String>,
    pub fit_calls: u32,
    pub invalidations: u32,
    pub pans: Vec<Point>,
    /// `size()` reports zero this many more times
    pub zero_size_reports: u32,
    /// Binding markers with these labels fails
    pub failing_bind_labels: BTreeSet<String>,
    next_handle: u64,
}

/// Recording [`MapSurface`]
pub struct HeadlessSurface {
    size: watch::Receiver<Point>,
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        lock(&self.state)
    }

    fn live(&self) -> Option<MutexGuard<'_, SurfaceState>> {
        let state = self.state();
        (!state.destroyed).then_some(state)
    }
}

impl MapSurface for HeadlessSurface {
    fn size(&self) -> Point {
        let mut state = self.state();
        if state.zero_size_reports > 0 {
            state.zero_size_reports -= 1;
            return Point::new(0.0, 0.0);
        }
        *self.size.borrow()
    }

    fn is_ready(&self) -> bool {
        let state = self.state();
        state.ready && !state.destroyed
    }

    fn invalidate_size(&mut self) {
        if let Some(mut state) = self.live() {
            state.invalidations += 1;
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: f64, _animate: bool) {
        if let Some(mut state) = self.live() {
            state.center = center;
            state.zoom = zoom.clamp(state.min_zoom, state.max_zoom);
        }
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding_ratio: f64, max_zoom: f64) -> Result<()> {
        let size = *self.size.borrow();
        let mut state = self
            .live()
            .ok_or_else(|| MapError::Surface("surface destroyed".to_string()))?;

        let mut viewport = Viewport::new(state.center, state.zoom, size);
        viewport.set_zoom_limits(state.min_zoom, state.max_zoom);
        viewport.fit_bounds(bounds, padding_ratio, max_zoom);

        state.center = viewport.center;
        state.zoom = viewport.zoom;
        state.fit_calls += 1;
        Ok(())
    }

    fn pan_by(&mut self, offset: Point, _animate: bool) {
        let size = *self.size.borrow();
        if let Some(mut state) = self.live() {
            let mut viewport = Viewport::new(state.center, state.zoom, size);
            viewport.pan_by(offset);
            state.center = viewport.center;
            state.pans.push(offset);
        }
    }

    fn attach_tiles(
        &mut self,
        provider: &TileProviderSpec,
        ticket: TileTicket,
        _error_tile_url: &str,
    ) -> Result<()> {
        let mut state = self
            .live()
            .ok_or_else(|| MapError::Surface("surface destroyed".to_string()))?;
        state.tiles = Some((provider.name.clone(), ticket));
        state.attach_count += 1;
        Ok(())
    }

    fn detach_tiles(&mut self) {
        if let Some(mut state) = self.live() {
            state.tiles = None;
        }
    }

    fn create_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle> {
        let mut state = self
            .live()
            .ok_or_else(|| MapError::Surface("surface destroyed".to_string()))?;
        state.next_handle += 1;
        let handle = MarkerHandle(state.next_handle);
        state.markers.insert(handle, spec.clone());
        state.created_total += 1;
        Ok(handle)
    }

    fn update_marker(&mut self, handle: MarkerHandle, spec: &MarkerSpec) -> Result<()> {
        let mut state = self
            .live()
            .ok_or_else(|| MapError::Surface("surface destroyed".to_string()))?;
        match state.markers.get_mut(&handle) {
            Some(existing) => *existing = spec.clone(),
            None => return Err(MapError::Surface(format!("unknown marker {:?}", handle))),
        }
        state.updated_total += 1;
        Ok(())
    }

    fn bind_interaction(&mut self, handle: MarkerHandle, binding: InteractionBinding) -> Result<()> {
        let mut state = self
            .live()
            .ok_or_else(|| MapError::Surface("surface destroyed".to_string()))?;
        let label = state
            .markers
            .get(&handle)
            .map(|spec| spec.label.clone())
            .unwrap_or_default();
        if state.failing_bind_labels.contains(&label) {
            return Err(MapError::Surface(format!("cannot bind marker '{}'", label)));
        }
        state.bindings.insert(handle, binding);
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if let Some(mut state) = self.live() {
            if state.markers.remove(&handle).is_some() {
                state.removed_total += 1;
            }
            state.bindings.remove(&handle);
            state.tooltips.remove(&handle);
        }
    }

    fn open_popup(&mut self, handle: MarkerHandle, content: &PopupContent) {
        if let Some(mut state) = self.live() {
            state.popup = Some((handle, content.clone()));
        }
    }

    fn close_popup(&mut self) {
        if let Some(mut state) = self.live() {
            state.popup = None;
        }
    }

    fn show_tooltip(&mut self, handle: MarkerHandle, text: &str) {
        if let Some(mut state) = self.live() {
            state.tooltips.insert(handle, text.to_string());
        }
    }

    fn hide_tooltip(&mut self, handle: MarkerHandle) {
        if let Some(mut state) = self.live() {
            state.tooltips.remove(&handle);
        }
    }

    fn destroy(&mut self) {
        let mut state = self.state();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.ready = false;
        state.markers.clear();
        state.bindings.clear();
        state.tooltips.clear();
        state.tiles = None;
        state.popup = None;
    }
}

/// Hands out [`HeadlessSurface`]s bound to a [`HeadlessHost`] container
pub struct HeadlessLoader {
    size: watch::Receiver<Point>,
    state: Arc<Mutex<SurfaceState>>,
    failures_remaining: AtomicU32,
    load_delay: Duration,
}

impl HeadlessLoader {
    pub fn new(host: &HeadlessHost) -> Self {
        Self {
            size: host.size_receiver(),
            state: Arc::new(Mutex::new(SurfaceState::default())),
            failures_remaining: AtomicU32::new(0),
            load_delay: Duration::ZERO,
        }
    }

    /// The next `count` loads fail
    pub fn with_failures(self, count: u32) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&SurfaceState) -> R) -> R {
        f(&lock(&self.state))
    }

    pub fn configure(&self, f: impl FnOnce(&mut SurfaceState)) {
        f(&mut lock(&self.state))
    }
}

#[async_trait]
impl SurfaceLoader for HeadlessLoader {
    async fn load(&self, options: &SurfaceOptions) -> Result<Box<dyn MapSurface>> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MapError::Surface("map library failed to load".to_string()));
        }

        {
            let mut state = lock(&self.state);
            state.instances += 1;
            state.destroyed = false;
            state.ready = true;
            state.center = options.center;
            state.min_zoom = options.min_zoom;
            state.max_zoom = options.max_zoom;
            state.zoom = options.zoom.clamp(options.min_zoom, options.max_zoom);
        }

        Ok(Box::new(HeadlessSurface {
            size: self.size.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Geolocation that always answers the same way
#[derive(Debug, Clone)]
pub struct FixedLocation(pub Option<LatLng>);

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<LatLng> {
        self.0
            .ok_or_else(|| MapError::Geolocation("position unavailable".to_string()))
    }
}
