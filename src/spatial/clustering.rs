use crate::core::config::{ClusteringConfig, ViewConfig};
use crate::core::geo::LatLng;
use crate::data::record::GeoRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Grid cell address, `row = floor(lat / cell)` and `col = floor(lng / cell)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub row: i64,
    pub col: i64,
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Summary of a grid cell holding two or more records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCell {
    pub key: CellKey,
    pub member_count: usize,
    pub centroid: LatLng,
    /// Member closest to the centroid, ties broken by id
    pub representative_record_id: Option<String>,
    /// Sorted member ids
    pub member_ids: Vec<String>,
}

/// One thing to draw
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    Point(GeoRecord),
    Cluster(ClusterCell),
}

/// Result of one clustering pass, ordered deterministically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutput {
    pub zoom: u8,
    pub items: Vec<RenderItem>,
}

impl ClusterOutput {
    pub fn point_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, RenderItem::Point(_)))
            .count()
    }

    pub fn cluster_member_total(&self) -> usize {
        self.clusters().map(|c| c.member_count).sum()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterCell> {
        self.items.iter().filter_map(|item| match item {
            RenderItem::Cluster(cell) => Some(cell),
            RenderItem::Point(_) => None,
        })
    }

    /// Records represented by this output, points and cluster members alike
    pub fn represented_count(&self) -> usize {
        self.point_count() + self.cluster_member_total()
    }
}

/// Zoom-dependent grid clustering.
///
/// A pure function of (records, zoom): members are sorted by id before any
/// arithmetic, so neither cell assignment nor centroids depend on input order.
#[derive(Debug, Clone, Default)]
pub struct SpatialClusterer {
    config: ClusteringConfig,
}

impl SpatialClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn cell_size_degrees(&self, zoom: u8) -> f64 {
        360.0 / 2_f64.powi(zoom as i32) * self.config.cluster_factor
    }

    pub fn cell_key(&self, lat: f64, lng: f64, zoom: u8) -> CellKey {
        let cell = self.cell_size_degrees(zoom);
        CellKey {
            row: (lat / cell).floor() as i64,
            col: (lng / cell).floor() as i64,
        }
    }

    pub fn cluster(&self, records: &[GeoRecord], zoom: u8) -> ClusterOutput {
        let mut sorted: Vec<&GeoRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        if records.len() <= self.config.threshold {
            return ClusterOutput {
                zoom,
                items: sorted.into_iter().cloned().map(RenderItem::Point).collect(),
            };
        }

        let mut cells: BTreeMap<CellKey, Vec<&GeoRecord>> = BTreeMap::new();
        for record in sorted {
            cells
                .entry(self.cell_key(record.lat, record.lng, zoom))
                .or_default()
                .push(record);
        }

        let items = cells
            .into_iter()
            .map(|(key, members)| match members.as_slice() {
                [single] => RenderItem::Point((*single).clone()),
                _ => RenderItem::Cluster(Self::summarize(key, &members)),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "clustered {} records into {} items at zoom {}",
            records.len(),
            items.len(),
            zoom
        );

        ClusterOutput { zoom, items }
    }

    fn summarize(key: CellKey, members: &[&GeoRecord]) -> ClusterCell {
        let positions: Vec<LatLng> = members.iter().map(|r| r.position()).collect();
        let centroid = LatLng::mean(&positions).unwrap_or_default();

        // Members arrive sorted by id, so the first strictly-closer one wins ties.
        let mut representative: Option<(&GeoRecord, f64)> = None;
        for &record in members {
            let d = (record.lat - centroid.lat).powi(2) + (record.lng - centroid.lng).powi(2);
            match representative {
                Some((_, best)) if best <= d => {}
                _ => representative = Some((record, d)),
            }
        }

        ClusterCell {
            key,
            member_count: members.len(),
            centroid,
            representative_record_id: representative.map(|(r, _)| r.id.clone()),
            member_ids: members.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

/// Where the view goes when a cluster is clicked: its centroid, a few zoom
/// levels closer, never past the configured maximum.
pub fn cluster_click_target(cell: &ClusterCell, current_zoom: f64, view: &ViewConfig) -> (LatLng, f64) {
    let zoom = (current_zoom + view.cluster_click_zoom_step).min(view.max_zoom);
    (cell.centroid, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, lat: f64, lng: f64) -> GeoRecord {
        GeoRecord {
            id: id.to_string(),
            title: format!("Listing {}", id),
            price: 100_000.0,
            property_type: "apartment".to_string(),
            bedrooms: 2,
            bathrooms: 1.0,
            area: 70.0,
            lat,
            lng,
            image_ref: None,
            address_line: String::new(),
            status: None,
        }
    }

    fn low_threshold() -> SpatialClusterer {
        SpatialClusterer::new(ClusteringConfig {
            threshold: 2,
            cluster_factor: 1.5,
        })
    }

    #[test]
    fn test_below_threshold_everything_is_a_point() {
        let clusterer = SpatialClusterer::default();
        let records = vec![record("b", 41.33, 19.82), record("a", 41.33, 19.82)];
        let output = clusterer.cluster(&records, 10);

        assert_eq!(output.point_count(), 2);
        assert_eq!(output.clusters().count(), 0);
        assert!(matches!(&output.items[0], RenderItem::Point(r) if r.id == "a"));
    }

    #[test]
    fn test_cell_size_and_key() {
        let clusterer = low_threshold();
        assert!((clusterer.cell_size_degrees(0) - 540.0).abs() < 1e-9);
        assert!((clusterer.cell_size_degrees(10) - 360.0 / 1024.0 * 1.5).abs() < 1e-12);

        let key = clusterer.cell_key(-0.1, 0.1, 4);
        assert_eq!(key, CellKey { row: -1, col: 0 });
        assert_eq!(key.to_string(), "-1:0");
    }

    #[test]
    fn test_singletons_degrade_to_points_and_centroid_is_mean() {
        let clusterer = low_threshold();
        // cell size at zoom 8 is ~2.1 degrees
        let records = vec![
            record("a", 41.30, 19.80),
            record("b", 41.34, 19.84),
            record("c", 41.32, 19.82),
            record("lonely", 10.0, 10.0),
        ];
        let output = clusterer.cluster(&records, 8);

        assert_eq!(output.point_count(), 1);
        let cluster = output.clusters().next().unwrap();
        assert_eq!(cluster.member_count, 3);
        assert!((cluster.centroid.lat - 41.32).abs() < 1e-9);
        assert!((cluster.centroid.lng - 19.82).abs() < 1e-9);
        assert_eq!(cluster.representative_record_id.as_deref(), Some("c"));
        assert_eq!(cluster.member_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_independent() {
        let clusterer = low_threshold();
        let records = vec![
            record("a", 41.30, 19.80),
            record("b", 41.34, 19.84),
            record("c", 40.0, 20.0),
            record("d", 40.01, 20.01),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        assert_eq!(clusterer.cluster(&records, 9), clusterer.cluster(&reversed, 9));
    }

    #[test]
    fn test_cluster_click_target_clamps_zoom() {
        let cell = ClusterCell {
            key: CellKey { row: 1, col: 2 },
            member_count: 2,
            centroid: LatLng::new(41.3, 19.8),
            representative_record_id: None,
            member_ids: vec![],
        };
        let view = ViewConfig::default();

        assert_eq!(cluster_click_target(&cell, 12.0, &view), (LatLng::new(41.3, 19.8), 14.0));
        assert_eq!(cluster_click_target(&cell, 17.0, &view).1, 18.0);
    }
}
