//! Configuration for map behavior tuning
//!
//! Settings are grouped by the component that consumes them. Presets cover the
//! common cases and `Custom` accepts anything that passes [`MapConfig::validate`].

use crate::core::constants::*;
use crate::core::geo::LatLng;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum MapProfile {
    Balanced,
    /// Small touch screens: no animation, shorter waits, coarser clusters.
    Compact,
    Custom(MapConfig),
}

impl MapProfile {
    pub fn resolve(&self) -> MapConfig {
        match self {
            Self::Balanced => MapConfig::default(),
            Self::Compact => MapConfig {
                clustering: ClusteringConfig {
                    threshold: CLUSTER_THRESHOLD,
                    cluster_factor: 2.0,
                },
                tiles: TileFailoverConfig {
                    cache_capacity: 128,
                    retina: false,
                    ..TileFailoverConfig::default()
                },
                readiness: ReadinessConfig {
                    max_wait_ms: 800,
                    ..ReadinessConfig::default()
                },
                view: ViewConfig {
                    animate: false,
                    ..ViewConfig::default()
                },
                ..MapConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for MapProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub clustering: ClusteringConfig,
    pub tiles: TileFailoverConfig,
    pub readiness: ReadinessConfig,
    pub interaction: InteractionConfig,
    pub view: ViewConfig,
    pub mount: MountConfig,
}

impl MapConfig {
    /// Parses a JSON document; missing sections and fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| -> Result<()> { Err(MapError::Config(msg.to_string())) };

        if !(self.clustering.cluster_factor > 1.0) {
            return fail("cluster_factor must be greater than 1");
        }
        if self.clustering.threshold == 0 {
            return fail("cluster threshold must be positive");
        }
        if self.tiles.error_window_ms == 0 {
            return fail("tile error window must be positive");
        }
        if self.tiles.cache_capacity == 0 {
            return fail("tile cache capacity must be positive");
        }
        if self.readiness.fit_retry_interval_ms == 0 {
            return fail("fit retry interval must be positive");
        }
        let view = &self.view;
        if !(view.min_zoom >= 0.0 && view.min_zoom <= view.max_zoom) {
            return fail("zoom range is inverted or negative");
        }
        if !view.default_center.is_valid() {
            return fail("default center is not a valid coordinate");
        }
        if !(view.fit_padding_ratio >= 0.0 && view.fit_padding_ratio.is_finite()) {
            return fail("fit padding must be a non-negative number");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Records above this count are grid-clustered
    pub threshold: usize,
    pub cluster_factor: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            threshold: CLUSTER_THRESHOLD,
            cluster_factor: CLUSTER_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileFailoverConfig {
    pub error_window_ms: u64,
    pub cache_capacity: usize,
    /// Requests `@2x` tiles from providers that support `{r}`
    pub retina: bool,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl TileFailoverConfig {
    pub fn error_window(&self) -> Duration {
        Duration::from_millis(self.error_window_ms)
    }
}

impl Default for TileFailoverConfig {
    fn default() -> Self {
        Self {
            error_window_ms: TILE_ERROR_WINDOW_MS,
            cache_capacity: 512,
            retina: true,
            request_timeout_ms: 10_000,
            user_agent: concat!("listmap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub max_wait_ms: u64,
    pub fit_retry_limit: u32,
    pub fit_retry_interval_ms: u64,
}

impl ReadinessConfig {
    /// The container wait, clamped to the supported range
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(
            self.max_wait_ms
                .clamp(READINESS_MIN_WAIT_MS, READINESS_MAX_WAIT_MS),
        )
    }

    pub fn fit_retry_interval(&self) -> Duration {
        Duration::from_millis(self.fit_retry_interval_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: READINESS_DEFAULT_WAIT_MS,
            fit_retry_limit: FIT_RETRY_LIMIT,
            fit_retry_interval_ms: FIT_RETRY_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub preview_pan_offset_px: f64,
    /// Hover tooltips; only ever honored for pointer devices
    pub hover_tooltips: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            preview_pan_offset_px: PREVIEW_PAN_OFFSET_PX,
            hover_tooltips: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub default_center: LatLng,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub fit_padding_ratio: f64,
    pub fit_max_zoom: f64,
    pub selected_zoom: f64,
    pub locate_zoom: f64,
    pub cluster_click_zoom_step: f64,
    pub animate: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_center: LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            default_zoom: DEFAULT_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            fit_padding_ratio: FIT_PADDING_RATIO,
            fit_max_zoom: FIT_MAX_ZOOM,
            selected_zoom: SELECTED_RECORD_ZOOM,
            locate_zoom: LOCATE_ZOOM,
            cluster_click_zoom_step: CLUSTER_CLICK_ZOOM_STEP,
            animate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub load_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl MountConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: SURFACE_LOAD_TIMEOUT_MS,
            max_retries: MAX_MOUNT_RETRIES,
            retry_delay_ms: 250,
            exponential_backoff: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_presets() {
        let balanced = MapProfile::Balanced.resolve();
        let compact = MapProfile::Compact.resolve();

        assert_eq!(balanced.clustering.threshold, 800);
        assert!(balanced.view.animate);
        assert!(!compact.view.animate);
        assert!(compact.readiness.max_wait() < balanced.readiness.max_wait());
        assert!(compact.tiles.cache_capacity < balanced.tiles.cache_capacity);
        assert!(balanced.validate().is_ok());
        assert!(compact.validate().is_ok());
    }

    #[test]
    fn test_readiness_wait_is_clamped() {
        let mut readiness = ReadinessConfig::default();
        assert_eq!(readiness.max_wait(), Duration::from_millis(1200));

        readiness.max_wait_ms = 10;
        assert_eq!(readiness.max_wait(), Duration::from_millis(250));

        readiness.max_wait_ms = 60_000;
        assert_eq!(readiness.max_wait(), Duration::from_millis(1500));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = MapConfig::from_json(r#"{ "clustering": { "threshold": 50 } }"#).unwrap();
        assert_eq!(config.clustering.threshold, 50);
        assert_eq!(config.clustering.cluster_factor, CLUSTER_FACTOR);
        assert_eq!(config.view.selected_zoom, 16.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MapConfig::default();
        config.clustering.cluster_factor = 1.0;
        assert!(matches!(config.validate(), Err(MapError::Config(_))));

        let mut config = MapConfig::default();
        config.view.min_zoom = 19.0;
        assert!(config.validate().is_err());

        assert!(MapConfig::from_json("{ not json").is_err());
    }
}
