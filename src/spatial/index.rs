use crate::core::geo::{LatLng, LatLngBounds};
use crate::data::record::GeoRecord;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A record position that can be indexed via an R-tree, stored as `[lng, lat]`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub position: [f64; 2],
}

impl IndexedRecord {
    pub fn from_record(record: &GeoRecord) -> Self {
        Self {
            id: record.id.clone(),
            position: [record.lng, record.lat],
        }
    }
}

// --- rstar integration -------------------------------------------------------------------------

impl RTreeObject for IndexedRecord {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedRecord {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over the current record snapshot, rebuilt wholesale on refresh
#[derive(Default)]
pub struct RecordIndex {
    rtree: RTree<IndexedRecord>,
}

impl RecordIndex {
    pub fn from_records(records: &[GeoRecord]) -> Self {
        Self {
            rtree: RTree::bulk_load(records.iter().map(IndexedRecord::from_record).collect()),
        }
    }

    /// Number of records inside `bounds`
    pub fn count_in(&self, bounds: &LatLngBounds) -> usize {
        self.ids_in(bounds).len()
    }

    /// Sorted ids of the records inside `bounds`
    pub fn ids_in(&self, bounds: &LatLngBounds) -> Vec<&str> {
        let envelope = AABB::from_corners(
            [bounds.south_west.lng, bounds.south_west.lat],
            [bounds.north_east.lng, bounds.north_east.lat],
        );
        let mut ids: Vec<&str> = self
            .rtree
            .locate_in_envelope(&envelope)
            .map(|item| item.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Record nearest to `point` in degree space
    pub fn nearest(&self, point: &LatLng) -> Option<&str> {
        self.rtree
            .nearest_neighbor(&[point.lng, point.lat])
            .map(|item| item.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}
