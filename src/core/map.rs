//! The mounted listing map.
//!
//! [`MapController`] owns one session: the validated records, the clusterer,
//! the tile failover chain, the marker handles and the interaction state. It
//! is the only thing that talks to the [`MapSurface`]; every other component
//! is a pure decision-maker whose output the controller applies.

use crate::core::config::{MapConfig, MapProfile};
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::readiness::{FitOutcome, Readiness, ViewportReadinessGate};
use crate::core::session::{AbortHandle, SessionContext};
use crate::core::viewport::Viewport;
use crate::data::record::{GeoRecord, RawProperty};
use crate::data::validate::GeoRecordValidator;
use crate::input::capability::InputCapability;
use crate::input::events::{EventManager, MapEvent};
use crate::input::interaction::{
    InteractionEffect, InteractionModeController, InteractionState, PreviewState, SelectionOrigin,
};
use crate::layers::marker::{MarkerKey, MarkerLifecycleManager, ReconcileReport};
use crate::spatial::clustering::{cluster_click_target, ClusterOutput, RenderItem, SpatialClusterer};
use crate::spatial::index::RecordIndex;
use crate::surface::{
    viewport_of, GeolocationProvider, HostEnvironment, InteractionBinding, MapSurface,
    MarkerHandle, SurfaceEvent, SurfaceLoader, SurfaceOptions, WindowEventKind, WindowListenerId,
};
use crate::tiles::chain::{FailoverDecision, TileProviderChain};
use crate::tiles::provider::{placeholder_tile_url, MapLayerKind, ProviderCatalog};
use crate::traits::RetryLogic;
use crate::ui::popup::PopupContent;
use crate::ui::status::MapStatus;
use crate::{MapError, Result};
use std::fmt;
use std::time::Instant;

/// Host callback for user-driven selection changes
pub type SelectCallback = Box<dyn Fn(Option<&GeoRecord>) + Send + Sync>;

/// A failure the host should show to the user as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage(pub String);

impl UserMessage {
    pub fn location_unavailable() -> Self {
        Self("Could not determine your location".to_string())
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct MapController {
    session: SessionContext,
    validator: GeoRecordValidator,
    clusterer: SpatialClusterer,
    chain: TileProviderChain,
    markers: MarkerLifecycleManager,
    interaction: InteractionModeController,
    gate: ViewportReadinessGate,
    events: EventManager,

    surface: Option<Box<dyn MapSurface>>,
    viewport: Viewport,
    listeners: Vec<WindowListenerId>,

    /// Last snapshot handed in by the host
    raw: Vec<RawProperty>,
    records: Vec<GeoRecord>,
    index: RecordIndex,
    output: ClusterOutput,

    status: MapStatus,
    mount_attempts: u32,
    on_select: Option<SelectCallback>,
    torn_down: bool,
}

impl MapController {
    pub fn new(profile: MapProfile) -> Result<Self> {
        Self::with_catalog(profile, ProviderCatalog::default())
    }

    pub fn with_catalog(profile: MapProfile, catalog: ProviderCatalog) -> Result<Self> {
        let config = profile.resolve();
        config.validate()?;

        let session = SessionContext::new(config.clone());
        let chain = TileProviderChain::new(catalog, config.tiles.error_window(), MapLayerKind::default())?;

        let mut viewport = Viewport::new(
            config.view.default_center,
            config.view.default_zoom,
            Point::new(0.0, 0.0),
        );
        viewport.set_zoom_limits(config.view.min_zoom, config.view.max_zoom);

        Ok(Self {
            validator: GeoRecordValidator::new(),
            clusterer: SpatialClusterer::new(config.clustering.clone()),
            chain,
            markers: MarkerLifecycleManager::new(),
            interaction: InteractionModeController::new(session.capability, &config.interaction),
            gate: ViewportReadinessGate::new(config.readiness.clone(), session.abort_handle()),
            events: EventManager::new(),
            surface: None,
            viewport,
            listeners: Vec::new(),
            raw: Vec::new(),
            records: Vec::new(),
            index: RecordIndex::default(),
            output: ClusterOutput::default(),
            status: MapStatus::Loading,
            mount_attempts: 0,
            on_select: None,
            torn_down: false,
            session,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.session.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Handle the host keeps to cancel an in-flight mount
    pub fn abort_handle(&self) -> AbortHandle {
        self.session.abort_handle()
    }

    pub fn capability(&self) -> InputCapability {
        self.session.capability
    }

    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn records(&self) -> &[GeoRecord] {
        &self.records
    }

    pub fn cluster_output(&self) -> &ClusterOutput {
        &self.output
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn active_layer(&self) -> MapLayerKind {
        self.chain.active_layer()
    }

    pub fn tile_chain(&self) -> &TileProviderChain {
        &self.chain
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    /// Touch preview panel state, `None` in pointer mode or when nothing is selected
    pub fn preview(&self) -> Option<&PreviewState> {
        self.interaction.preview()
    }

    /// Content for the touch preview panel
    pub fn preview_content(&self) -> Option<PopupContent> {
        let preview = self.interaction.preview()?;
        self.record(&preview.active_record_id)
            .map(PopupContent::for_record)
    }

    pub fn selected_record(&self) -> Option<&GeoRecord> {
        self.interaction
            .selected_record_id()
            .and_then(|id| self.record(id))
    }

    /// Records whose position falls inside the current view
    pub fn records_in_view(&self) -> usize {
        self.index.count_in(&self.viewport.bounds())
    }

    pub fn on_property_select<F>(&mut self, callback: F)
    where
        F: Fn(Option<&GeoRecord>) + Send + Sync + 'static,
    {
        self.on_select = Some(Box::new(callback));
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    /// Dispatches queued events to listeners and returns them
    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        self.events.process_events()
    }

    /// Loads the surface, waits for the container, attaches tiles, draws the
    /// records and fits the view to them.
    ///
    /// A failure leaves the controller in [`MapStatus::Failed`]; see [`retry`](Self::retry).
    pub async fn mount(
        &mut self,
        loader: &dyn SurfaceLoader,
        host: &mut dyn HostEnvironment,
        raw: Vec<RawProperty>,
    ) -> Result<MapStatus> {
        self.session.abort_handle().check()?;
        if self.surface.is_some() {
            return Err(MapError::Surface("map is already mounted".to_string()));
        }

        self.raw = raw;
        self.mount_attempts = 0;
        self.try_mount(loader, host).await
    }

    /// Manual retry after a failed mount, with backoff between attempts
    pub async fn retry(
        &mut self,
        loader: &dyn SurfaceLoader,
        host: &mut dyn HostEnvironment,
    ) -> Result<MapStatus> {
        self.session.abort_handle().check()?;
        if !matches!(self.status, MapStatus::Failed { .. }) {
            return Ok(self.status.clone());
        }

        let mount = &self.session.config.mount;
        let delay = self
            .next_retry_delay(mount.max_retries, mount.retry_delay_ms, mount.exponential_backoff)
            .ok_or(MapError::RetryLimit {
                attempts: self.mount_attempts,
            })?;

        log::info!("retrying map mount in {:?}", delay);
        tokio::time::sleep(delay).await;
        self.session.abort_handle().check()?;

        self.try_mount(loader, host).await
    }

    async fn try_mount(
        &mut self,
        loader: &dyn SurfaceLoader,
        host: &mut dyn HostEnvironment,
    ) -> Result<MapStatus> {
        self.mount_attempts += 1;
        self.set_status(MapStatus::Loading);

        let capability = InputCapability::detect(&host.device_hints());
        self.session.capability = capability;
        self.interaction = InteractionModeController::new(capability, &self.session.config.interaction);
        log::info!(
            "mounting map session {} ({:?} input, attempt {})",
            self.session.id,
            capability,
            self.mount_attempts
        );

        self.ingest();

        let view = self.session.config.view.clone();
        let positions: Vec<LatLng> = self.records.iter().map(GeoRecord::position).collect();
        let options = SurfaceOptions {
            center: LatLng::mean(&positions).unwrap_or(view.default_center),
            zoom: view.default_zoom,
            min_zoom: view.min_zoom,
            max_zoom: view.max_zoom,
        };

        let load_timeout = self.session.config.mount.load_timeout();
        let loaded = tokio::time::timeout(load_timeout, loader.load(&options)).await;
        if self.session.is_aborted() {
            if let Ok(Ok(mut surface)) = loaded {
                surface.destroy();
            }
            return Err(MapError::Aborted);
        }

        let mut surface = match loaded {
            Ok(Ok(surface)) => surface,
            Ok(Err(e)) => return Err(self.fail_mount(e)),
            Err(_) => {
                return Err(self.fail_mount(MapError::Timeout(format!(
                    "map surface did not load within {:?}",
                    load_timeout
                ))))
            }
        };

        let readiness = self.gate.wait_for_container(host).await;
        if readiness == Readiness::Aborted {
            surface.destroy();
            return Err(MapError::Aborted);
        }
        log::debug!("container readiness: {:?}", readiness);

        if let Err(e) = surface.attach_tiles(self.chain.active(), self.chain.ticket(), &placeholder_tile_url()) {
            surface.destroy();
            return Err(self.fail_mount(e));
        }

        self.viewport = viewport_of(options.center, options.zoom, surface.size(), &options);
        self.surface = Some(surface);
        self.listeners
            .push(host.add_window_listener(WindowEventKind::Resize));
        self.listeners
            .push(host.add_window_listener(WindowEventKind::OrientationChange));

        self.recluster();
        if let Err(e) = self.fit_to_records().await {
            self.release(host);
            return Err(e);
        }

        let status = self.mounted_status();
        self.set_status(status.clone());
        log::info!("map session {} mounted: {}", self.session.id, status);
        Ok(status)
    }

    fn fail_mount(&mut self, error: MapError) -> MapError {
        let mount = &self.session.config.mount;
        let retry_available = self
            .next_retry_delay(mount.max_retries, mount.retry_delay_ms, mount.exponential_backoff)
            .is_some();
        log::error!(
            "map failed to load (attempt {}): {}",
            self.mount_attempts,
            error
        );
        self.set_status(MapStatus::failed(retry_available));
        error
    }

    /// Releases everything the session holds. Safe to call more than once,
    /// and aborts any mount still in flight.
    pub fn teardown(&mut self, host: &mut dyn HostEnvironment) {
        self.session.abort_handle().abort();
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.release(host);
        let _ = self.interaction.dismiss(SelectionOrigin::Controlled);
        self.events.clear_events();
        log::info!("map session {} torn down", self.session.id);
    }

    /// Drops the surface, its markers and our window listeners
    fn release(&mut self, host: &mut dyn HostEnvironment) {
        match self.surface.take() {
            Some(mut surface) => {
                self.markers.clear(surface.as_mut());
                surface.close_popup();
                surface.detach_tiles();
                surface.destroy();
            }
            None => self.markers.forget(),
        }
        for id in self.listeners.drain(..) {
            host.remove_window_listener(id);
        }
    }

    /// Replaces the record snapshot, redraws and refits
    pub async fn set_records(&mut self, raw: Vec<RawProperty>) -> Result<ReconcileReport> {
        self.session.abort_handle().check()?;
        self.raw = raw;
        let report = self.refresh_records();
        if self.surface.is_some() {
            self.fit_to_records().await?;
        }
        Ok(report)
    }

    /// Re-validates the current snapshot and reconciles markers
    pub fn refresh_records(&mut self) -> ReconcileReport {
        self.ingest();

        let selection_gone = self
            .interaction
            .selected_record_id()
            .map_or(false, |id| self.record(id).is_none());
        if selection_gone {
            let effects = self.interaction.dismiss(SelectionOrigin::User);
            self.apply_effects(effects);
        }

        let report = self.recluster();
        if self.surface.is_some() {
            let status = self.mounted_status();
            self.set_status(status);
        }
        report
    }

    /// The user moved the map
    pub fn on_viewport_changed(&mut self, center: LatLng, zoom: f64) -> ReconcileReport {
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        self.events.emit(MapEvent::ViewChanged {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        });
        self.recluster()
    }

    /// Window resize or orientation change; returns whether the surface has a size
    pub fn on_window_resize(&mut self) -> bool {
        let Some(surface) = self.surface.as_deref_mut() else {
            return false;
        };
        let visible = self.gate.revalidate(surface);
        if visible {
            self.viewport.set_size(surface.size());
        }
        visible
    }

    pub fn handle_surface_event(&mut self, event: SurfaceEvent, now: Instant) {
        match event {
            SurfaceEvent::MarkerClicked(handle) => self.on_marker_click(handle),
            SurfaceEvent::MarkerHoverStart(handle) => {
                if let Some(MarkerKey::Record(id)) = self.markers.key_for_handle(handle).cloned() {
                    let effects = self.interaction.hover_start(&id);
                    self.apply_effects(effects);
                }
            }
            SurfaceEvent::MarkerHoverEnd(handle) => {
                if let Some(MarkerKey::Record(id)) = self.markers.key_for_handle(handle).cloned() {
                    let effects = self.interaction.hover_end(&id);
                    self.apply_effects(effects);
                }
            }
            SurfaceEvent::TileError(ticket) => {
                let decision = self.chain.record_failure(ticket, now);
                self.apply_failover(decision);
            }
            SurfaceEvent::MapClicked => self.dismiss(),
            SurfaceEvent::ViewChanged { center, zoom } => {
                self.on_viewport_changed(center, zoom);
            }
            SurfaceEvent::WindowResized | SurfaceEvent::OrientationChanged => {
                self.on_window_resize();
            }
        }
    }

    /// Switches the base layer, starting over from its first provider
    pub fn set_layer(&mut self, layer: MapLayerKind) {
        if layer == self.chain.active_layer() {
            return;
        }
        let ticket = self.chain.switch_layer(layer);
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.detach_tiles();
            if let Err(e) = surface.attach_tiles(self.chain.active(), ticket, &placeholder_tile_url()) {
                log::warn!("failed to attach {} tiles: {}", layer, e);
            }
        }
        self.events.emit(MapEvent::LayerChanged { layer });
    }

    /// Host-controlled selection: recenter on the record and select it
    /// without echoing a selection notification.
    pub fn set_selected(&mut self, record_id: Option<&str>) {
        let Some(id) = record_id else {
            let effects = self.interaction.dismiss(SelectionOrigin::Controlled);
            self.apply_effects(effects);
            return;
        };
        if self.interaction.selected_record_id() == Some(id) {
            return;
        }
        let Some(position) = self.record(id).map(GeoRecord::position) else {
            log::debug!("selected record {} is not on the map", id);
            return;
        };

        let zoom = self.session.config.view.selected_zoom;
        self.set_view(position, zoom);
        self.select_record(id, SelectionOrigin::Controlled);
    }

    /// "View details" on the touch preview
    pub fn view_details(&mut self) {
        let effects = self.interaction.view_details();
        self.apply_effects(effects);
    }

    /// Close button or backdrop tap
    pub fn dismiss(&mut self) {
        let effects = self.interaction.dismiss(SelectionOrigin::User);
        self.apply_effects(effects);
    }

    pub async fn center_on_my_location(
        &mut self,
        provider: &dyn GeolocationProvider,
    ) -> std::result::Result<LatLng, UserMessage> {
        let position = provider.current_position().await;
        if self.session.is_aborted() {
            return Err(UserMessage::location_unavailable());
        }

        match position {
            Ok(position) if position.is_valid() => {
                let zoom = self.session.config.view.locate_zoom;
                self.set_view(position, zoom);
                self.events.emit(MapEvent::LocationFound(position));
                Ok(position)
            }
            Ok(position) => {
                log::warn!("geolocation returned an invalid position {:?}", position);
                Err(UserMessage::location_unavailable())
            }
            Err(e) => {
                log::warn!("geolocation failed: {}", e);
                Err(UserMessage::location_unavailable())
            }
        }
    }

    fn ingest(&mut self) {
        let outcome = self.validator.validate(&self.raw);
        if !outcome.dropped.is_empty() {
            self.events.emit(MapEvent::RecordsDropped {
                count: outcome.dropped.len(),
            });
        }
        self.index = RecordIndex::from_records(&outcome.records);
        self.records = outcome.records;
    }

    fn record(&self, id: &str) -> Option<&GeoRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    fn mounted_status(&self) -> MapStatus {
        if self.records.is_empty() {
            MapStatus::empty()
        } else {
            MapStatus::Ready {
                visible: self.records.len(),
            }
        }
    }

    fn set_status(&mut self, status: MapStatus) {
        if self.status != status {
            self.status = status.clone();
            self.events.emit(MapEvent::StatusChanged(status));
        }
    }

    fn cluster_zoom(&self) -> u8 {
        self.viewport.zoom.round().clamp(0.0, 30.0) as u8
    }

    fn recluster(&mut self) -> ReconcileReport {
        self.output = self.clusterer.cluster(&self.records, self.cluster_zoom());
        let binding = InteractionBinding {
            hover: self.interaction.wants_hover(),
        };
        match self.surface.as_deref_mut() {
            Some(surface) => self.markers.reconcile(surface, &self.output, binding),
            None => ReconcileReport::default(),
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        let animate = self.session.config.view.animate;
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.set_view(self.viewport.center, self.viewport.zoom, animate);
        }
        self.recluster();
    }

    async fn fit_to_records(&mut self) -> Result<()> {
        let positions: Vec<LatLng> = self.records.iter().map(GeoRecord::position).collect();
        let Some(bounds) = LatLngBounds::from_points(&positions) else {
            return Ok(());
        };
        let padding = self.session.config.view.fit_padding_ratio;
        let max_zoom = self.session.config.view.fit_max_zoom;

        let outcome = match self.surface.as_deref_mut() {
            Some(surface) => {
                self.gate
                    .fit_bounds_with_retry(surface, &bounds, padding, max_zoom)
                    .await
            }
            None => return Ok(()),
        };

        match outcome {
            FitOutcome::Fitted { attempts } => {
                let size = self.surface.as_ref().map(|s| s.size()).unwrap_or_default();
                self.viewport.set_size(size);
                self.viewport.fit_bounds(&bounds, padding, max_zoom);
                log::debug!(
                    "fitted {} records after {} attempt(s), zoom {}",
                    positions.len(),
                    attempts,
                    self.viewport.zoom
                );
                self.recluster();
                Ok(())
            }
            FitOutcome::GaveUp => Ok(()),
            FitOutcome::Aborted => Err(MapError::Aborted),
        }
    }

    fn on_marker_click(&mut self, handle: MarkerHandle) {
        let Some(marker) = self.markers.get_by_handle(handle) else {
            log::trace!("click on unknown marker {:?}", handle);
            return;
        };

        match &marker.bound {
            RenderItem::Point(record) => {
                let id = record.id.clone();
                self.select_record(&id, SelectionOrigin::User);
            }
            RenderItem::Cluster(cell) => {
                let (center, zoom) =
                    cluster_click_target(cell, self.viewport.zoom, &self.session.config.view);
                log::debug!("zooming into cluster {} ({} listings)", cell.key, cell.member_count);
                self.set_view(center, zoom);
            }
        }
    }

    fn select_record(&mut self, id: &str, origin: SelectionOrigin) {
        let Some(position) = self.record(id).map(GeoRecord::position) else {
            return;
        };
        let marker_px = self.viewport.lat_lng_to_pixel(&position);
        let effects = self
            .interaction
            .select(id, marker_px, self.viewport.size, origin);
        self.apply_effects(effects);
    }

    fn apply_failover(&mut self, decision: FailoverDecision) {
        let layer = self.chain.active_layer();
        match decision {
            FailoverDecision::Stale
            | FailoverDecision::Tolerated { .. }
            | FailoverDecision::StillExhausted => {}
            FailoverDecision::Switched { from, ticket, .. } => {
                let from = self.chain.catalog().providers(layer)[from].name.clone();
                let to = self.chain.active().name.clone();
                if let Some(surface) = self.surface.as_deref_mut() {
                    surface.detach_tiles();
                    if let Err(e) = surface.attach_tiles(self.chain.active(), ticket, &placeholder_tile_url()) {
                        log::warn!("failed to attach fallback provider {}: {}", to, e);
                    }
                }
                self.events.emit(MapEvent::ProviderSwitched { layer, from, to });
            }
            FailoverDecision::Exhausted => {
                self.events.emit(MapEvent::ProvidersExhausted { layer });
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<InteractionEffect>) {
        let animate = self.session.config.view.animate;

        for effect in effects {
            match effect {
                InteractionEffect::OpenPopup { record_id } => {
                    let content = self.record(&record_id).map(PopupContent::for_record);
                    let handle = self.markers.handle_for_record(&record_id);
                    if let (Some(surface), Some(handle), Some(content)) =
                        (self.surface.as_deref_mut(), handle, content)
                    {
                        surface.open_popup(handle, &content);
                    }
                }
                InteractionEffect::ClosePopup => {
                    if let Some(surface) = self.surface.as_deref_mut() {
                        surface.close_popup();
                    }
                }
                InteractionEffect::ShowTooltip { record_id } => {
                    let text = self
                        .record(&record_id)
                        .map(|record| PopupContent::for_record(record).tooltip_text());
                    let handle = self.markers.handle_for_record(&record_id);
                    if let (Some(surface), Some(handle), Some(text)) =
                        (self.surface.as_deref_mut(), handle, text)
                    {
                        surface.show_tooltip(handle, &text);
                    }
                }
                InteractionEffect::HideTooltip { record_id } => {
                    let handle = self.markers.handle_for_record(&record_id);
                    if let (Some(surface), Some(handle)) = (self.surface.as_deref_mut(), handle) {
                        surface.hide_tooltip(handle);
                    }
                }
                // The host renders the panel from `preview()`
                InteractionEffect::ShowPreview(_)
                | InteractionEffect::ExpandPreview(_)
                | InteractionEffect::HidePreview => {}
                InteractionEffect::PanBy(offset) => {
                    self.viewport.pan_by(offset);
                    if let Some(surface) = self.surface.as_deref_mut() {
                        surface.pan_by(offset, animate);
                    }
                }
                InteractionEffect::NotifySelection(record_id) => {
                    if let Some(callback) = &self.on_select {
                        callback(record_id.as_deref().and_then(|id| self.record(id)));
                    }
                    self.events.emit(MapEvent::SelectionChanged { record_id });
                }
            }
        }
    }
}

impl RetryLogic for MapController {
    fn get_retry_count(&self) -> u32 {
        self.mount_attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::capability::DeviceHints;
    use crate::surface::{HeadlessHost, HeadlessLoader};

    fn listings() -> Vec<RawProperty> {
        vec![
            RawProperty::listing("a", "Blloku flat", 120_000.0, "apartment", 41.3200, 19.8150),
            RawProperty::listing("b", "Villa near the lake", 450_000.0, "villa", 41.3050, 19.8300),
            RawProperty::listing("c", "Studio", 65_000.0, "apartment", 41.3350, 19.8000),
        ]
    }

    fn host(hints: DeviceHints) -> HeadlessHost {
        HeadlessHost::new(Point::new(800.0, 600.0), hints)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_draws_and_fits() {
        let mut host = host(DeviceHints::pointer());
        let loader = HeadlessLoader::new(&host);
        let mut map = MapController::new(MapProfile::Balanced).unwrap();

        let status = map.mount(&loader, &mut host, listings()).await.unwrap();

        assert_eq!(status, MapStatus::Ready { visible: 3 });
        assert_eq!(map.marker_count(), 3);
        assert_eq!(loader.inspect(|s| s.fit_calls), 1);
        assert_eq!(
            loader.inspect(|s| s.tiles.as_ref().map(|(name, _)| name.clone())),
            Some("OpenStreetMap".to_string())
        );
        assert!(map.viewport().zoom <= 15.0);
        assert_eq!(map.records_in_view(), 3);
        assert_eq!(host.active_listeners(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_click_notifies_host() {
        let mut host = host(DeviceHints::pointer());
        let loader = HeadlessLoader::new(&host);
        let mut map = MapController::new(MapProfile::Balanced).unwrap();
        map.mount(&loader, &mut host, listings()).await.unwrap();

        let selected = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&selected);
        map.on_property_select(move |record| {
            sink.lock().unwrap().push(record.map(|r| r.id.clone()));
        });

        let handle = loader.inspect(|s| *s.markers.keys().next().unwrap());
        map.handle_surface_event(SurfaceEvent::MarkerClicked(handle), Instant::now());

        assert!(loader.inspect(|s| s.popup.is_some()));
        assert!(map.preview().is_none());
        assert_eq!(selected.lock().unwrap().len(), 1);

        map.handle_surface_event(SurfaceEvent::MapClicked, Instant::now());
        assert!(loader.inspect(|s| s.popup.is_none()));
        assert_eq!(selected.lock().unwrap().last(), Some(&None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mount_then_retry() {
        let mut host = host(DeviceHints::pointer());
        let loader = HeadlessLoader::new(&host).with_failures(1);
        let mut map = MapController::new(MapProfile::Balanced).unwrap();

        assert!(map.mount(&loader, &mut host, listings()).await.is_err());
        assert_eq!(map.status(), &MapStatus::failed(true));

        let status = map.retry(&loader, &mut host).await.unwrap();
        assert_eq!(status, MapStatus::Ready { visible: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_is_idempotent() {
        let mut host = host(DeviceHints::touch());
        let loader = HeadlessLoader::new(&host);
        let mut map = MapController::new(MapProfile::Compact).unwrap();
        map.mount(&loader, &mut host, listings()).await.unwrap();

        map.teardown(&mut host);
        map.teardown(&mut host);

        assert!(loader.inspect(|s| s.destroyed && s.markers.is_empty()));
        assert_eq!(host.active_listeners(), 0);
        assert_eq!(host.active_observers(), 0);
        assert!(map.abort_handle().is_aborted());
        assert!(matches!(
            map.retry(&loader, &mut host).await,
            Err(MapError::Aborted)
        ));
    }
}
