//! Prelude module for common listmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use listmap::prelude::*;`

pub use crate::core::{
    config::{
        ClusteringConfig, InteractionConfig, MapConfig, MapProfile, MountConfig, ReadinessConfig,
        TileFailoverConfig, ViewConfig,
    },
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{MapController, UserMessage},
    readiness::{FitOutcome, Readiness, ViewportReadinessGate},
    session::{AbortHandle, SessionContext},
    viewport::Viewport,
};

pub use crate::data::{
    record::{GeoRecord, RawProperty},
    validate::{Diagnostic, DropReason, GeoRecordValidator, ValidationOutcome},
};

pub use crate::spatial::{
    clustering::{CellKey, ClusterCell, ClusterOutput, RenderItem, SpatialClusterer},
    index::RecordIndex,
};

pub use crate::tiles::{
    chain::{FailoverDecision, TileProviderChain, TileTicket},
    fetch::{HttpTileFetcher, TileFetcher, TileService},
    provider::{MapLayerKind, ProviderCatalog, TileProviderSpec},
};

pub use crate::layers::marker::{MarkerKey, MarkerKind, MarkerLifecycleManager, ReconcileReport};

pub use crate::input::{
    capability::{DeviceHints, InputCapability},
    events::{EventManager, MapEvent},
    interaction::{
        InteractionEffect, InteractionModeController, InteractionState, Placement, PreviewState,
        SelectionOrigin,
    },
};

pub use crate::surface::{
    FixedLocation, GeolocationProvider, HeadlessHost, HeadlessLoader, HostEnvironment, MapSurface,
    MarkerHandle, SurfaceEvent, SurfaceLoader, SurfaceOptions, WindowListenerId,
};

pub use crate::ui::{popup::PopupContent, status::MapStatus};

pub use crate::traits::RetryLogic;

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
