use crate::prelude::{Duration, Instant};
use crate::tiles::provider::{MapLayerKind, ProviderCatalog, TileProviderSpec};
use crate::Result;
use std::collections::VecDeque;

/// Identifies the tile source a failure was reported against.
///
/// Every attach hands out a fresh ticket; failures carrying an older one come
/// from a detached source and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileTicket {
    pub layer: MapLayerKind,
    pub provider_index: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailoverDecision {
    /// Reported against a source that is no longer attached
    Stale,
    /// Below budget, keep the current provider
    Tolerated { failures_in_window: u32 },
    /// Moved to the next provider; reattach with `ticket`
    Switched {
        from: usize,
        to: usize,
        ticket: TileTicket,
    },
    /// Budget reached on the last provider; placeholders from here on
    Exhausted,
    /// The last provider was already reported exhausted
    StillExhausted,
}

/// Ordered fallback across tile providers for the active layer.
///
/// Owns the active provider index; nothing else writes it.
#[derive(Debug, Clone)]
pub struct TileProviderChain {
    catalog: ProviderCatalog,
    window: Duration,
    active_layer: MapLayerKind,
    active_index: usize,
    generation: u64,
    /// Failures against the current ticket inside the trailing window
    recent_failures: VecDeque<Instant>,
    /// Set once `Exhausted` was returned for the current ticket
    exhausted: bool,
}

impl TileProviderChain {
    pub fn new(catalog: ProviderCatalog, window: Duration, layer: MapLayerKind) -> Result<Self> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            window,
            active_layer: layer,
            active_index: 0,
            generation: 0,
            recent_failures: VecDeque::with_capacity(8),
            exhausted: false,
        })
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn active_layer(&self) -> MapLayerKind {
        self.active_layer
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> &TileProviderSpec {
        &self.catalog.providers(self.active_layer)[self.active_index]
    }

    pub fn ticket(&self) -> TileTicket {
        TileTicket {
            layer: self.active_layer,
            provider_index: self.active_index,
            generation: self.generation,
        }
    }

    /// True once the active provider is the last one for its layer
    pub fn is_exhausted(&self) -> bool {
        self.active_index + 1 >= self.catalog.providers(self.active_layer).len()
    }

    /// Starts over from the first provider of `layer`
    pub fn switch_layer(&mut self, layer: MapLayerKind) -> TileTicket {
        self.active_layer = layer;
        self.active_index = 0;
        self.bump_generation();
        log::debug!("tile layer switched to {} ({})", layer, self.active().name);
        self.ticket()
    }

    /// Counts a tile load failure reported at `now`
    pub fn record_failure(&mut self, ticket: TileTicket, now: Instant) -> FailoverDecision {
        if ticket != self.ticket() {
            log::trace!("ignoring tile error from detached source {:?}", ticket);
            return FailoverDecision::Stale;
        }
        if self.exhausted {
            log::trace!("tile error on exhausted {} layer", self.active_layer);
            return FailoverDecision::StillExhausted;
        }

        // Front-drain failures that fell out of the window
        while let Some(&time) = self.recent_failures.front() {
            if now.saturating_duration_since(time) > self.window {
                self.recent_failures.pop_front();
            } else {
                break;
            }
        }
        self.recent_failures.push_back(now);

        let failures = self.recent_failures.len() as u32;
        let budget = self.active().error_budget;
        if failures < budget {
            log::debug!(
                "tile error {}/{} on {}",
                failures,
                budget,
                self.active().name
            );
            return FailoverDecision::Tolerated {
                failures_in_window: failures,
            };
        }

        if self.is_exhausted() {
            log::warn!(
                "tile provider {} keeps failing and no fallback remains for the {} layer",
                self.active().name,
                self.active_layer
            );
            self.recent_failures.clear();
            self.exhausted = true;
            return FailoverDecision::Exhausted;
        }

        let from = self.active_index;
        let from_name = self.active().name.clone();
        self.active_index += 1;
        self.bump_generation();
        log::warn!(
            "tile provider {} failed {} times within {:?}, switching to {}",
            from_name,
            failures,
            self.window,
            self.active().name
        );

        FailoverDecision::Switched {
            from,
            to: self.active_index,
            ticket: self.ticket(),
        }
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.recent_failures.clear();
        self.exhausted = false;
    }
}
