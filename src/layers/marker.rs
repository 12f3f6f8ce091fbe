use crate::core::geo::LatLng;
use crate::prelude::HashMap;
use crate::spatial::clustering::{CellKey, ClusterOutput, RenderItem};
use crate::surface::{InteractionBinding, MapSurface, MarkerHandle};
use crate::ui::popup::format_price;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of a rendered marker, stable across clustering passes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerKey {
    Record(String),
    Cell(CellKey),
}

impl MarkerKey {
    pub fn of(item: &RenderItem) -> Self {
        match item {
            RenderItem::Point(record) => Self::Record(record.id.clone()),
            RenderItem::Cluster(cell) => Self::Cell(cell.key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Point,
    Cluster,
}

/// What the surface needs to draw one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub kind: MarkerKind,
    /// Price for points, member count for clusters
    pub label: String,
}

impl MarkerSpec {
    pub fn for_item(item: &RenderItem) -> Self {
        match item {
            RenderItem::Point(record) => Self {
                position: record.position(),
                kind: MarkerKind::Point,
                label: format_price(record.price),
            },
            RenderItem::Cluster(cell) => Self {
                position: cell.centroid,
                kind: MarkerKind::Cluster,
                label: cell.member_count.to_string(),
            },
        }
    }
}

/// A live marker and the render item it was last drawn from
#[derive(Debug, Clone)]
pub struct MarkerRecord {
    pub key: MarkerKey,
    pub kind: MarkerKind,
    pub handle: MarkerHandle,
    pub bound: RenderItem,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
    pub unchanged: usize,
    /// Markers skipped because the surface rejected them
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.destroyed == 0 && self.failed == 0
    }
}

/// Keyed diff between clustering output and the markers on the surface.
///
/// Sole owner of the key to handle mapping.
#[derive(Debug, Default)]
pub struct MarkerLifecycleManager {
    markers: BTreeMap<MarkerKey, MarkerRecord>,
    by_handle: HashMap<MarkerHandle, MarkerKey>,
}

impl MarkerLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(
        &mut self,
        surface: &mut dyn MapSurface,
        output: &ClusterOutput,
        binding: InteractionBinding,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let wanted: BTreeSet<MarkerKey> = output.items.iter().map(MarkerKey::of).collect();

        let stale: Vec<MarkerKey> = self
            .markers
            .keys()
            .filter(|key| !wanted.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            self.destroy(surface, &key);
            report.destroyed += 1;
        }

        for item in &output.items {
            let key = MarkerKey::of(item);
            match self.markers.get_mut(&key) {
                Some(existing) if existing.bound == *item => report.unchanged += 1,
                Some(existing) => {
                    match surface.update_marker(existing.handle, &MarkerSpec::for_item(item)) {
                        Ok(()) => {
                            existing.bound = item.clone();
                            report.updated += 1;
                        }
                        Err(e) => {
                            log::warn!("dropping marker {:?} after failed update: {}", key, e);
                            self.destroy(surface, &key);
                            report.failed += 1;
                        }
                    }
                }
                None => {
                    if self.create(surface, key, item, binding) {
                        report.created += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }

        if !report.is_noop() {
            log::debug!("marker reconcile: {:?}", report);
        }
        report
    }

    /// Removes every marker from the surface
    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        for record in std::mem::take(&mut self.markers).into_values() {
            surface.remove_marker(record.handle);
        }
        self.by_handle.clear();
    }

    /// Forgets every marker without touching the surface
    pub fn forget(&mut self) {
        self.markers.clear();
        self.by_handle.clear();
    }

    pub fn key_for_handle(&self, handle: MarkerHandle) -> Option<&MarkerKey> {
        self.by_handle.get(&handle)
    }

    pub fn get(&self, key: &MarkerKey) -> Option<&MarkerRecord> {
        self.markers.get(key)
    }

    pub fn get_by_handle(&self, handle: MarkerHandle) -> Option<&MarkerRecord> {
        self.key_for_handle(handle).and_then(|key| self.markers.get(key))
    }

    pub fn handle_for_record(&self, record_id: &str) -> Option<MarkerHandle> {
        self.markers
            .get(&MarkerKey::Record(record_id.to_string()))
            .map(|record| record.handle)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn create(
        &mut self,
        surface: &mut dyn MapSurface,
        key: MarkerKey,
        item: &RenderItem,
        binding: InteractionBinding,
    ) -> bool {
        let spec = MarkerSpec::for_item(item);
        let handle = match surface.create_marker(&spec) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("skipping marker {:?}: {}", key, e);
                return false;
            }
        };

        if let Err(e) = surface.bind_interaction(handle, binding) {
            log::warn!("skipping marker {:?}, interaction binding failed: {}", key, e);
            surface.remove_marker(handle);
            return false;
        }

        self.by_handle.insert(handle, key.clone());
        self.markers.insert(
            key.clone(),
            MarkerRecord {
                key,
                kind: spec.kind,
                handle,
                bound: item.clone(),
            },
        );
        true
    }

    fn destroy(&mut self, surface: &mut dyn MapSurface, key: &MarkerKey) {
        if let Some(record) = self.markers.remove(key) {
            surface.remove_marker(record.handle);
            self.by_handle.remove(&record.handle);
        }
    }
}
