//! Runs one headless map session end to end and logs what happens.
//!
//! `listmap-demo [listings.json] [--touch] [--fetch-tiles]`

use anyhow::Context;
use listmap::data::GeoRecordValidator;
use listmap::prelude::*;
use listmap::tiles::TileOrigin;

const SAMPLE_LISTINGS: &str = r#"{
  "properties": [
    { "id": "tr-001", "title": "Apartment in Blloku", "price": 145000,
      "address": { "street": "Rruga Ismail Qemali", "city": "Tirana",
                   "coordinates": { "lat": 41.3189, "lng": 19.8156 } },
      "details": { "propertyType": "apartment", "bedrooms": 2, "bathrooms": 1, "squareFootage": 85 } },
    { "id": "tr-002", "title": "Villa near the Grand Park", "price": 520000,
      "address": { "street": "Rruga e Elbasanit", "city": "Tirana",
                   "coordinates": { "lat": 41.3118, "lng": 19.8302 } },
      "details": { "propertyType": "villa", "bedrooms": 5, "bathrooms": 3, "squareFootage": 310 } },
    { "id": "dr-001", "title": "Seaside flat", "price": 89500,
      "address": { "street": "Rruga Taulantia", "city": "Durrës",
                   "coordinates": { "lat": 41.3133, "lng": 19.4458 } },
      "details": { "propertyType": "apartment", "bedrooms": 1, "bathrooms": 1, "squareFootage": 54 } },
    { "id": "bad-001", "title": "Missing coordinates", "price": 70000,
      "address": { "street": "", "city": "Tirana" },
      "details": { "propertyType": "apartment" } },
    { "id": "bad-002", "title": "Null island", "price": 70000,
      "address": { "coordinates": { "lat": 0, "lng": 0 } },
      "details": { "propertyType": "apartment" } }
  ]
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let touch = args.iter().any(|a| a == "--touch");
    let fetch_tiles = args.iter().any(|a| a == "--fetch-tiles");
    let json = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading listings from {}", path))?,
        None => SAMPLE_LISTINGS.to_string(),
    };

    let outcome = GeoRecordValidator::new()
        .validate_json(&json)
        .context("listing feed is not a JSON list of properties")?;
    for diagnostic in &outcome.dropped {
        log::info!("not on the map: {:?} ({})", diagnostic.record_id, diagnostic.reason);
    }
    let raw = RawProperty::list_from_json(&json)?;

    let hints = if touch {
        DeviceHints::touch()
    } else {
        DeviceHints::pointer()
    };
    let mut host = HeadlessHost::new(Point::new(0.0, 0.0), hints);
    let loader = HeadlessLoader::new(&host);
    let mut map = MapController::new(MapProfile::Balanced)?;
    let events = map.events_mut().subscribe();
    map.on_property_select(|record| match record {
        Some(record) => log::info!("host: selected {} ({})", record.title, record.id),
        None => log::info!("host: selection cleared"),
    });

    // The container only gets laid out after a short while
    let resizer = host.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        resizer.resize(Point::new(1024.0, 768.0));
    });

    let status = map.mount(&loader, &mut host, raw).await?;
    log::info!("{} ({} in view)", status, map.records_in_view());

    let first = loader.inspect(|s| s.markers.keys().next().copied());
    if let Some(handle) = first {
        map.handle_surface_event(SurfaceEvent::MarkerClicked(handle), Instant::now());
        if let Some(preview) = map.preview() {
            log::info!("preview panel at {:?}", preview.placement);
            map.view_details();
        }
        map.handle_surface_event(SurfaceEvent::MapClicked, Instant::now());
    }

    // A burst of tile errors on the primary street provider
    let ticket = map.tile_chain().ticket();
    for _ in 0..4 {
        map.handle_surface_event(SurfaceEvent::TileError(ticket), Instant::now());
    }
    log::info!("street tiles now from {}", map.tile_chain().active().name);

    map.set_layer(MapLayerKind::Satellite);
    match map
        .center_on_my_location(&FixedLocation(Some(LatLng::new(41.3275, 19.8187))))
        .await
    {
        Ok(position) => log::info!("centered on {:?}", position),
        Err(message) => log::warn!("{}", message),
    }

    if fetch_tiles {
        let config = map.config().tiles.clone();
        let chain = TileProviderChain::new(
            ProviderCatalog::default(),
            config.error_window(),
            MapLayerKind::Street,
        )?;
        let mut tiles = TileService::new(HttpTileFetcher::new(&config), chain, &config);
        let coords = TileCoord::covering(&map.viewport().bounds(), map.viewport().zoom as u8);
        let loaded = tiles.load_tiles(&coords).await;
        let fetched = loaded.iter().filter(|t| t.origin == TileOrigin::Network).count();
        log::info!("fetched {}/{} tiles for the current view", fetched, loaded.len());
    }

    map.drain_events();
    for event in events.try_iter() {
        log::info!("event: {:?}", event);
    }

    map.teardown(&mut host);
    Ok(())
}
