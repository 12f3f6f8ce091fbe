use listmap::prelude::*;

/// Deterministic pseudo-random listings around Tirana
fn listings(count: usize, seed: u64) -> Vec<GeoRecord> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    (0..count)
        .map(|i| GeoRecord {
            id: format!("p-{:05}", i),
            title: format!("Listing {}", i),
            price: 50_000.0 + next() * 500_000.0,
            property_type: "apartment".to_string(),
            bedrooms: 2,
            bathrooms: 1.0,
            area: 70.0,
            lat: 41.0 + next() * 0.8,
            lng: 19.4 + next() * 0.8,
            image_ref: None,
            address_line: String::new(),
            status: None,
        })
        .collect()
}

#[test]
fn test_conservation_at_every_zoom() {
    let records = listings(2_000, 7);
    let clusterer = SpatialClusterer::default();

    for zoom in 0..=18u8 {
        let output = clusterer.cluster(&records, zoom);
        assert_eq!(output.represented_count(), records.len(), "zoom {}", zoom);
        assert_eq!(
            output.point_count() + output.cluster_member_total(),
            output.represented_count()
        );
        assert!(output.clusters().all(|c| c.member_count >= 2));
    }
}

#[test]
fn test_determinism_under_shuffles() {
    let records = listings(1_200, 11);
    let clusterer = SpatialClusterer::default();
    let baseline = clusterer.cluster(&records, 11);

    let mut reversed = records.clone();
    reversed.reverse();
    let mut rotated = records.clone();
    rotated.rotate_left(317);

    assert_eq!(clusterer.cluster(&reversed, 11), baseline);
    assert_eq!(clusterer.cluster(&rotated, 11), baseline);
}

#[test]
fn test_threshold_boundary() {
    let clusterer = SpatialClusterer::default();

    let at_threshold = listings(800, 3);
    let output = clusterer.cluster(&at_threshold, 8);
    assert_eq!(output.point_count(), 800);
    assert_eq!(output.clusters().count(), 0);

    let above = listings(801, 3);
    assert!(clusterer.cluster(&above, 8).clusters().count() > 0);
}

#[test]
fn test_centroids_are_member_means() {
    let records = listings(1_500, 5);
    let output = SpatialClusterer::default().cluster(&records, 10);

    for cell in output.clusters() {
        let members: Vec<&GeoRecord> = records
            .iter()
            .filter(|r| cell.member_ids.contains(&r.id))
            .collect();
        assert_eq!(members.len(), cell.member_count);

        let lat = members.iter().map(|r| r.lat).sum::<f64>() / members.len() as f64;
        let lng = members.iter().map(|r| r.lng).sum::<f64>() / members.len() as f64;
        assert!((cell.centroid.lat - lat).abs() < 1e-9);
        assert!((cell.centroid.lng - lng).abs() < 1e-9);
        assert!(cell
            .representative_record_id
            .as_ref()
            .map_or(false, |id| cell.member_ids.contains(id)));
    }
}

#[test]
fn test_index_agrees_with_bounds_filter() {
    let records = listings(500, 9);
    let index = RecordIndex::from_records(&records);
    let bounds = LatLngBounds::from_coords(41.2, 19.6, 41.4, 19.9);

    let expected = records
        .iter()
        .filter(|r| bounds.contains(&r.position()))
        .count();
    assert_eq!(index.count_in(&bounds), expected);
}
