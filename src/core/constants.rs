//! Engine-wide constants for listing maps.
//! Keeping them in a single place makes it easier to tweak the magic numbers
//! that the config presets start from.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Clustering kicks in only above this many validated records.
pub const CLUSTER_THRESHOLD: usize = 800;

/// Multiplier applied to `360 / 2^zoom` to get the grid cell size in degrees.
pub const CLUSTER_FACTOR: f64 = 1.5;

/// Trailing window in which tile failures are counted.
pub const TILE_ERROR_WINDOW_MS: u64 = 1200;

/// Failures inside the window that trigger a provider switch.
pub const TILE_ERROR_BUDGET: u32 = 4;

/// Upper bound on fit-bounds retries after the first attempt.
pub const FIT_RETRY_LIMIT: u32 = 10;

/// Spacing between fit-bounds retries.
pub const FIT_RETRY_INTERVAL_MS: u64 = 120;

/// Container wait bounds. Configured waits are clamped into this range.
pub const READINESS_MIN_WAIT_MS: u64 = 250;
pub const READINESS_MAX_WAIT_MS: u64 = 1500;
pub const READINESS_DEFAULT_WAIT_MS: u64 = 1200;

/// How long the rendering primitive may take to load.
pub const SURFACE_LOAD_TIMEOUT_MS: u64 = 10_000;

/// Manual retries allowed after a failed mount.
pub const MAX_MOUNT_RETRIES: u32 = 3;

/// Tirana, used when there is nothing to center on.
pub const DEFAULT_CENTER: (f64, f64) = (41.3275, 19.8187);
pub const DEFAULT_ZOOM: f64 = 13.0;
pub const MIN_ZOOM: f64 = 8.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Zoom used when a record is selected from outside the map.
pub const SELECTED_RECORD_ZOOM: f64 = 16.0;

/// Zoom used when centering on the user's location.
pub const LOCATE_ZOOM: f64 = 14.0;

/// Fit-to-bounds never zooms past this.
pub const FIT_MAX_ZOOM: f64 = 15.0;

/// Fraction of the bounds span added on each side when fitting.
pub const FIT_PADDING_RATIO: f64 = 0.1;

/// Undrained events kept before the oldest are dropped.
pub const MAX_PENDING_EVENTS: usize = 256;

/// Zoom levels added when a cluster is clicked.
pub const CLUSTER_CLICK_ZOOM_STEP: f64 = 2.0;

/// Vertical pan (pixels) that keeps a touched marker clear of the preview panel.
pub const PREVIEW_PAN_OFFSET_PX: f64 = 120.0;
