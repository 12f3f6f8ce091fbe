//! # listmap
//!
//! Headless map orchestration for geo-tagged property listings.
//!
//! The crate decides *what* a listing map shows and *when*: it validates
//! incoming records, grid-clusters large sets, reconciles marker handles,
//! fails over between tile providers, waits for the container to have a real
//! size before fitting bounds, and routes marker interaction differently for
//! pointer and touch devices. Drawing itself is delegated to a [`MapSurface`]
//! implementation supplied by the host.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod spatial;
pub mod surface;
pub mod tiles;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{MapConfig, MapProfile},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::MapController,
    readiness::ViewportReadinessGate,
    session::{AbortHandle, SessionContext},
    viewport::Viewport,
};

pub use data::{
    record::{GeoRecord, RawProperty},
    validate::{GeoRecordValidator, ValidationOutcome},
};

pub use input::{
    capability::{DeviceHints, InputCapability},
    events::{EventManager, MapEvent},
    interaction::{InteractionModeController, InteractionState},
};

pub use layers::marker::MarkerLifecycleManager;

pub use spatial::{clustering::SpatialClusterer, index::RecordIndex};

pub use surface::{GeolocationProvider, HostEnvironment, MapSurface, SurfaceLoader};

pub use tiles::{
    chain::TileProviderChain,
    provider::{MapLayerKind, ProviderCatalog, TileProviderSpec},
};

pub use ui::status::MapStatus;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Tile error: {0}")]
    Tile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Session was torn down")]
    Aborted,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Retry limit reached after {attempts} attempts")]
    RetryLimit { attempts: u32 },

    #[error("Geolocation error: {0}")]
    Geolocation(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs an `env_logger` logger honoring `RUST_LOG`; repeated calls are ignored.
#[cfg(feature = "debug")]
pub fn init_debug_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
