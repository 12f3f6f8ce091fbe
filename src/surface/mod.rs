//! Seams between the orchestration logic and whatever actually draws the map.
//!
//! A browser build implements these over a JS map library; tests and the demo
//! use the recording implementations in [`headless`].

pub mod headless;

use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::viewport::Viewport;
use crate::input::capability::DeviceHints;
use crate::layers::marker::MarkerSpec;
use crate::tiles::chain::TileTicket;
use crate::tiles::provider::TileProviderSpec;
use crate::ui::popup::PopupContent;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use headless::{FixedLocation, HeadlessHost, HeadlessLoader, HeadlessSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowEventKind {
    Resize,
    OrientationChange,
}

/// How a marker's input is wired. Built-in click and hover behavior of the
/// rendering primitive is always suppressed; everything routes back to the
/// controller as [`SurfaceEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionBinding {
    /// Report hover start/end for tooltips
    pub hover: bool,
}

/// View parameters handed to the loader
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

/// Input coming back from the surface and the host window
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    MarkerClicked(MarkerHandle),
    MarkerHoverStart(MarkerHandle),
    MarkerHoverEnd(MarkerHandle),
    /// A tile failed to load from the source attached with this ticket
    TileError(TileTicket),
    /// Click on the map background, outside any marker
    MapClicked,
    /// The user moved the map
    ViewChanged { center: LatLng, zoom: f64 },
    WindowResized,
    OrientationChanged,
}

/// The rendering primitive for one mounted map
pub trait MapSurface: Send {
    /// Current rendered size; zero while the primitive has not laid out
    fn size(&self) -> Point;

    /// The map pane exists and the primitive finished loading
    fn is_ready(&self) -> bool;

    /// Re-reads the container geometry
    fn invalidate_size(&mut self);

    fn set_view(&mut self, center: LatLng, zoom: f64, animate: bool);

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding_ratio: f64, max_zoom: f64)
        -> Result<()>;

    fn pan_by(&mut self, offset: Point, animate: bool);

    fn attach_tiles(
        &mut self,
        provider: &TileProviderSpec,
        ticket: TileTicket,
        error_tile_url: &str,
    ) -> Result<()>;

    fn detach_tiles(&mut self);

    fn create_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle>;

    fn update_marker(&mut self, handle: MarkerHandle, spec: &MarkerSpec) -> Result<()>;

    fn bind_interaction(&mut self, handle: MarkerHandle, binding: InteractionBinding)
        -> Result<()>;

    fn remove_marker(&mut self, handle: MarkerHandle);

    fn open_popup(&mut self, handle: MarkerHandle, content: &PopupContent);

    fn close_popup(&mut self);

    fn show_tooltip(&mut self, handle: MarkerHandle, text: &str);

    fn hide_tooltip(&mut self, handle: MarkerHandle);

    /// Releases the primitive; further calls are no-ops
    fn destroy(&mut self);
}

/// Asynchronously provides the rendering primitive
#[async_trait]
pub trait SurfaceLoader: Send + Sync {
    async fn load(&self, options: &SurfaceOptions) -> Result<Box<dyn MapSurface>>;
}

/// Window and container facilities owned by the host page
pub trait HostEnvironment: Send {
    fn container_size(&self) -> Point;

    /// Starts observing the container; the receiver yields every new size
    fn observe_container(&mut self) -> (ObserverId, watch::Receiver<Point>);

    fn disconnect_observer(&mut self, id: ObserverId);

    fn add_window_listener(&mut self, kind: WindowEventKind) -> WindowListenerId;

    fn remove_window_listener(&mut self, id: WindowListenerId);

    fn device_hints(&self) -> DeviceHints;
}

/// Optional "where am I" query
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<LatLng>;
}

/// Mirrors a surface into a [`Viewport`] value for screen-space math
pub fn viewport_of(center: LatLng, zoom: f64, size: Point, options: &SurfaceOptions) -> Viewport {
    let mut viewport = Viewport::new(center, zoom, size);
    viewport.set_zoom_limits(options.min_zoom, options.max_zoom);
    viewport.set_zoom(zoom);
    viewport
}
