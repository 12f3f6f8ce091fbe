//! Waiting for a laid-out container before fitting the view.
//!
//! A map mounted into a hidden or not-yet-sized container reports zero size
//! and computes a garbage fit. The gate holds the fit back until the container
//! has real geometry, but never blocks forever.

use crate::core::config::ReadinessConfig;
use crate::core::geo::LatLngBounds;
use crate::core::session::AbortHandle;
use crate::surface::{HostEnvironment, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Container already had a size
    Immediate,
    /// Container got a size while we waited
    BecameVisible,
    /// Gave up waiting; proceeding anyway
    TimedOut,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    Fitted { attempts: u32 },
    /// Surface stayed zero-sized through every retry
    GaveUp,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct ViewportReadinessGate {
    config: ReadinessConfig,
    abort: AbortHandle,
}

impl ViewportReadinessGate {
    pub fn new(config: ReadinessConfig, abort: AbortHandle) -> Self {
        Self { config, abort }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Waits until the container has a non-zero size, at most
    /// [`ReadinessConfig::max_wait`]. The observer is always disconnected.
    pub async fn wait_for_container(&self, host: &mut dyn HostEnvironment) -> Readiness {
        if host.container_size().is_non_zero_area() {
            return Readiness::Immediate;
        }

        let wait = self.config.max_wait();
        let (observer, mut sizes) = host.observe_container();
        let changed = tokio::time::timeout(
            wait,
            sizes.wait_for(|size| size.is_non_zero_area()),
        )
        .await
        .map(|seen| seen.is_ok());
        host.disconnect_observer(observer);

        if self.abort.is_aborted() {
            return Readiness::Aborted;
        }

        match changed {
            Ok(true) => Readiness::BecameVisible,
            Ok(false) => {
                log::debug!("container observer closed before the container got a size");
                Readiness::TimedOut
            }
            Err(_) => {
                log::info!("container still has no size after {:?}, continuing", wait);
                Readiness::TimedOut
            }
        }
    }

    /// Fits `bounds`, retrying while the surface reports zero size
    pub async fn fit_bounds_with_retry(
        &self,
        surface: &mut dyn MapSurface,
        bounds: &LatLngBounds,
        padding_ratio: f64,
        max_zoom: f64,
    ) -> FitOutcome {
        let interval = self.config.fit_retry_interval();
        let mut attempts = 0;

        loop {
            attempts += 1;
            surface.invalidate_size();
            if surface.size().is_non_zero_area() {
                match surface.fit_bounds(bounds, padding_ratio, max_zoom) {
                    Ok(()) => return FitOutcome::Fitted { attempts },
                    Err(e) => log::debug!("fit attempt {} failed: {}", attempts, e),
                }
            }

            if attempts > self.config.fit_retry_limit {
                log::warn!(
                    "map surface still zero-sized after {} fit attempts, keeping the initial view",
                    attempts
                );
                return FitOutcome::GaveUp;
            }

            tokio::time::sleep(interval).await;
            if self.abort.is_aborted() {
                return FitOutcome::Aborted;
            }
        }
    }

    /// Re-reads geometry after a window resize or orientation change.
    /// Returns whether the surface now has a usable size.
    pub fn revalidate(&self, surface: &mut dyn MapSurface) -> bool {
        surface.invalidate_size();
        surface.size().is_non_zero_area()
    }
}
