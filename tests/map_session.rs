use listmap::prelude::*;
use listmap::surface::WindowEventKind;

fn listings() -> Vec<RawProperty> {
    vec![
        RawProperty::listing("tr-1", "Blloku flat", 145_000.0, "apartment", 41.3189, 19.8156),
        RawProperty::listing("tr-2", "Villa by the park", 520_000.0, "villa", 41.3118, 19.8302),
        RawProperty::listing("tr-3", "Studio", 65_000.0, "apartment", 41.3301, 19.8012),
        RawProperty::listing("bad", "Null island", 70_000.0, "apartment", 0.0, 0.0),
        RawProperty::listing("nan", "Broken", 70_000.0, "apartment", f64::NAN, 19.8),
    ]
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn mounted(hints: DeviceHints) -> (MapController, HeadlessHost, HeadlessLoader) {
    init_logging();
    let mut host = HeadlessHost::new(Point::new(800.0, 600.0), hints);
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();
    map.mount(&loader, &mut host, listings()).await.unwrap();
    (map, host, loader)
}

fn handle_of(loader: &HeadlessLoader, label: &str) -> MarkerHandle {
    loader.inspect(|s| {
        s.markers
            .iter()
            .find(|(_, spec)| spec.label == label)
            .map(|(handle, _)| *handle)
            .unwrap()
    })
}

#[tokio::test(start_paused = true)]
async fn test_invalid_records_never_reach_the_surface() {
    let (mut map, _host, loader) = mounted(DeviceHints::pointer()).await;

    assert_eq!(map.records().len(), 3);
    assert_eq!(loader.inspect(|s| s.markers.len()), 3);
    assert!(map
        .drain_events()
        .contains(&MapEvent::RecordsDropped { count: 2 }));
}

#[tokio::test(start_paused = true)]
async fn test_zero_container_resized_in_time_fits_bounds() {
    let mut host = HeadlessHost::new(Point::new(0.0, 0.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    let resizer = host.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        resizer.resize(Point::new(800.0, 600.0));
    });

    let started = tokio::time::Instant::now();
    let status = map.mount(&loader, &mut host, listings()).await.unwrap();

    assert_eq!(status, MapStatus::Ready { visible: 3 });
    assert_eq!(loader.inspect(|s| s.fit_calls), 1);
    assert!(started.elapsed() < Duration::from_millis(1200));
    assert_eq!(map.viewport().size, Point::new(800.0, 600.0));
    assert_eq!(host.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_never_visible_container_still_completes() {
    let mut host = HeadlessHost::new(Point::new(0.0, 0.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    let started = tokio::time::Instant::now();
    let status = map.mount(&loader, &mut host, listings()).await.unwrap();

    assert_eq!(status, MapStatus::Ready { visible: 3 });
    assert!(started.elapsed() >= Duration::from_millis(1200));
    assert_eq!(loader.inspect(|s| s.fit_calls), 0);
    assert_eq!(map.marker_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_touch_selection_shows_preview_not_popup() {
    let (mut map, _host, loader) = mounted(DeviceHints::touch()).await;
    assert_eq!(map.capability(), InputCapability::Touch);

    let handle = handle_of(&loader, "€145,000");
    map.handle_surface_event(SurfaceEvent::MarkerClicked(handle), Instant::now());

    let preview = map.preview().cloned().unwrap();
    assert_eq!(preview.active_record_id, "tr-1");
    assert!(loader.inspect(|s| s.popup.is_none()));
    assert_eq!(loader.inspect(|s| s.pans.len()), 1);
    assert_eq!(map.preview_content().unwrap().title, "Blloku flat");

    map.view_details();
    assert!(matches!(map.interaction_state(), InteractionState::TouchExpanded(_)));

    map.dismiss();
    assert!(map.preview().is_none());
    assert!(map.drain_events().contains(&MapEvent::SelectionChanged { record_id: None }));
}

#[tokio::test(start_paused = true)]
async fn test_pointer_hover_tooltips() {
    let (mut map, _host, loader) = mounted(DeviceHints::pointer()).await;
    let handle = handle_of(&loader, "€65,000");

    map.handle_surface_event(SurfaceEvent::MarkerHoverStart(handle), Instant::now());
    assert!(loader.inspect(|s| s.tooltips.get(&handle).map_or(false, |t| t.starts_with("Studio"))));

    map.handle_surface_event(SurfaceEvent::MarkerHoverEnd(handle), Instant::now());
    assert!(loader.inspect(|s| s.tooltips.is_empty()));
    assert_eq!(*map.interaction_state(), InteractionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_tile_error_burst_switches_provider_once() {
    let (mut map, _host, loader) = mounted(DeviceHints::pointer()).await;
    let ticket = map.tile_chain().ticket();
    let now = Instant::now();

    for i in 0..10 {
        map.handle_surface_event(
            SurfaceEvent::TileError(ticket),
            now + Duration::from_millis(i * 20),
        );
    }

    assert_eq!(map.tile_chain().active().name, "CARTO Voyager");
    assert_eq!(
        loader.inspect(|s| s.tiles.as_ref().map(|(name, _)| name.clone())),
        Some("CARTO Voyager".to_string())
    );
    let switches = map
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, MapEvent::ProviderSwitched { .. }))
        .count();
    assert_eq!(switches, 1);

    map.set_layer(MapLayerKind::Terrain);
    map.set_layer(MapLayerKind::Street);
    assert_eq!(map.tile_chain().active_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_controlled_selection_recenters_without_echo() {
    let (mut map, _host, loader) = mounted(DeviceHints::pointer()).await;
    map.drain_events();

    map.set_selected(Some("tr-2"));
    assert_eq!(map.viewport().zoom, 16.0);
    assert_eq!(map.selected_record().map(|r| r.id.as_str()), Some("tr-2"));
    assert!(loader.inspect(|s| s.popup.as_ref().map_or(false, |(_, p)| p.record_id == "tr-2")));
    assert!(!map
        .drain_events()
        .iter()
        .any(|e| matches!(e, MapEvent::SelectionChanged { .. })));

    map.set_selected(None);
    assert!(map.selected_record().is_none());
    assert!(loader.inspect(|s| s.popup.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_with_empty_feed_shows_empty_state() {
    let (mut map, _host, loader) = mounted(DeviceHints::pointer()).await;

    map.set_records(Vec::new()).await.unwrap();

    assert!(matches!(map.status(), MapStatus::Empty { .. }));
    assert_eq!(loader.inspect(|s| s.markers.len()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_limit() {
    let mut host = HeadlessHost::new(Point::new(800.0, 600.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host).with_failures(10);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    assert!(map.mount(&loader, &mut host, listings()).await.is_err());
    for _ in 0..3 {
        assert!(map.retry(&loader, &mut host).await.is_err());
    }
    assert_eq!(
        map.status(),
        &MapStatus::Failed {
            message: "Map failed to load".to_string(),
            retry_available: false
        }
    );
    assert!(matches!(
        map.retry(&loader, &mut host).await,
        Err(MapError::RetryLimit { attempts: 4 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_surface_load_times_out() {
    let mut host = HeadlessHost::new(Point::new(800.0, 600.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host).with_load_delay(Duration::from_secs(30));
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    let result = map.mount(&loader, &mut host, listings()).await;
    assert!(matches!(result, Err(MapError::Timeout(_))));
    assert!(matches!(map.status(), MapStatus::Failed { retry_available: true, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_location_failure_is_a_user_message() {
    let (mut map, _host, _loader) = mounted(DeviceHints::pointer()).await;

    let message = map
        .center_on_my_location(&FixedLocation(None))
        .await
        .unwrap_err();
    assert_eq!(message.to_string(), "Could not determine your location");

    let here = LatLng::new(41.3275, 19.8187);
    assert_eq!(map.center_on_my_location(&FixedLocation(Some(here))).await, Ok(here));
    assert_eq!(map.viewport().zoom, 14.0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_releases_host_resources() {
    let (mut map, mut host, loader) = mounted(DeviceHints::pointer()).await;
    assert_eq!(host.active_listeners(), 2);

    map.teardown(&mut host);
    assert_eq!(host.active_listeners(), 0);
    assert!(loader.inspect(|s| s.destroyed));

    // Listeners the host registered itself are not ours to remove
    let _ = host.add_window_listener(WindowEventKind::Resize);
    map.teardown(&mut host);
    assert_eq!(host.active_listeners(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_layer_reports_once() {
    let (mut map, _host, _loader) = mounted(DeviceHints::pointer()).await;
    map.set_layer(MapLayerKind::Satellite);
    let ticket = map.tile_chain().ticket();
    let now = Instant::now();

    for i in 0..12 {
        map.handle_surface_event(
            SurfaceEvent::TileError(ticket),
            now + Duration::from_millis(i * 20),
        );
    }

    let exhausted = map
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, MapEvent::ProvidersExhausted { .. }))
        .count();
    assert_eq!(exhausted, 1);
    assert_eq!(map.tile_chain().active().name, "Esri World Imagery");
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_fit_retries_releases_the_surface() {
    init_logging();
    let mut host = HeadlessHost::new(Point::new(800.0, 600.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host);
    loader.configure(|s| s.zero_size_reports = 50);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    let abort = map.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        abort.abort();
    });

    let result = map.mount(&loader, &mut host, listings()).await;

    assert!(matches!(result, Err(MapError::Aborted)));
    assert!(!map.is_mounted());
    assert!(loader.inspect(|s| s.destroyed));
    assert_eq!(loader.inspect(|s| s.markers.len()), 0);
    assert_eq!(loader.inspect(|s| s.fit_calls), 0);
    assert_eq!(map.marker_count(), 0);
    assert_eq!(host.active_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_readiness_wait() {
    init_logging();
    let mut host = HeadlessHost::new(Point::new(0.0, 0.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();

    let abort = map.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        abort.abort();
    });

    let result = map.mount(&loader, &mut host, listings()).await;

    assert!(matches!(result, Err(MapError::Aborted)));
    assert!(loader.inspect(|s| s.destroyed));
    assert_eq!(loader.inspect(|s| s.markers.len()), 0);
    assert_eq!(host.active_observers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_window_resize_revalidates_geometry() {
    let (mut map, host, loader) = mounted(DeviceHints::pointer()).await;
    let invalidations = loader.inspect(|s| s.invalidations);

    host.resize(Point::new(1024.0, 768.0));
    map.handle_surface_event(SurfaceEvent::WindowResized, Instant::now());
    assert_eq!(map.viewport().size, Point::new(1024.0, 768.0));
    assert_eq!(loader.inspect(|s| s.invalidations), invalidations + 1);

    // A collapsed container keeps the last usable size
    host.resize(Point::new(0.0, 0.0));
    map.handle_surface_event(SurfaceEvent::OrientationChanged, Instant::now());
    assert_eq!(map.viewport().size, Point::new(1024.0, 768.0));
    assert!(!map.on_window_resize());

    host.resize(Point::new(600.0, 900.0));
    assert!(map.on_window_resize());
    assert_eq!(map.viewport().size, Point::new(600.0, 900.0));
}

#[tokio::test(start_paused = true)]
async fn test_cluster_click_zooms_into_cluster() {
    init_logging();
    let feed: Vec<RawProperty> = (0..900)
        .map(|i| {
            RawProperty::listing(
                format!("g-{:03}", i),
                format!("Listing {}", i),
                80_000.0 + i as f64 * 100.0,
                "apartment",
                41.300 + (i / 30) as f64 * 0.001,
                19.800 + (i % 30) as f64 * 0.001,
            )
        })
        .collect();
    let mut host = HeadlessHost::new(Point::new(800.0, 600.0), DeviceHints::pointer());
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced).unwrap();
    map.mount(&loader, &mut host, feed).await.unwrap();

    let output = map.cluster_output();
    assert_eq!(output.represented_count(), 900);
    assert_eq!(map.marker_count(), output.items.len());

    let (handle, centroid) = loader.inspect(|s| {
        s.markers
            .iter()
            .find(|(_, spec)| spec.kind == MarkerKind::Cluster)
            .map(|(handle, spec)| (*handle, spec.position))
            .unwrap()
    });
    let before = map.viewport().zoom;

    map.handle_surface_event(SurfaceEvent::MarkerClicked(handle), Instant::now());

    assert_eq!(map.viewport().zoom, (before + 2.0).min(18.0));
    assert_eq!(map.viewport().center, centroid);
    assert_eq!(loader.inspect(|s| s.zoom), map.viewport().zoom);
    assert!(map.selected_record().is_none());

    let output = map.cluster_output();
    assert_eq!(output.represented_count(), 900);
    assert_eq!(loader.inspect(|s| s.markers.len()), output.items.len());
}
