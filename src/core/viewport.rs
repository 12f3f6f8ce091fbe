use crate::core::constants::TILE_SIZE;
use crate::core::geo::{LatLng, LatLngBounds, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const EARTH_RADIUS: f64 = 6378137.0;

/// The current view of the map: center, zoom and container dimensions.
///
/// Only the map controller mutates this; everything else receives copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the container in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(0.0, 18.0),
            size,
            min_zoom: 0.0,
            max_zoom: 18.0,
        }
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            LatLng::clamp_lat(center.lat),
            center.lng.clamp(-180.0, 180.0),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the container size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Projects a LatLng to world pixel coordinates (EPSG:3857) at the given zoom level
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let lat = LatLng::clamp_lat(lat_lng.lat);
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

        let world = 2.0 * PI * EARTH_RADIUS;
        let pixel_x = (x + PI * EARTH_RADIUS) / world * scale;
        let pixel_y = (-y + PI * EARTH_RADIUS) / world * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);

        let world = 2.0 * PI * EARTH_RADIUS;
        let x = (pixel.x / scale) * world - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * world;

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }

    /// Converts a geographical coordinate to container pixel coordinates
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let origin = self.project(&self.center, None);
        let projected = self.project(lat_lng, None);
        projected
            .subtract(&origin)
            .add(&Point::new(self.size.x / 2.0, self.size.y / 2.0))
    }

    /// Converts container pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let origin = self.project(&self.center, None);
        let offset = pixel.subtract(&Point::new(self.size.x / 2.0, self.size.y / 2.0));
        self.unproject(&origin.add(&offset), None)
    }

    /// Moves the center by `delta` pixels, like Leaflet's `panBy`
    pub fn pan_by(&mut self, delta: Point) {
        let center_px = self.project(&self.center, None);
        let new_center = self.unproject(&center_px.add(&delta), None);
        self.set_center(new_center);
    }

    /// Gets the current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&Point::new(self.size.x, self.size.y));

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    /// Fits the viewport to contain the given bounds.
    ///
    /// `padding_ratio` grows the bounds by that fraction of their span before
    /// fitting, and the chosen zoom never exceeds `max_zoom`.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding_ratio: f64, max_zoom: f64) {
        let padded = bounds.pad(padding_ratio);
        self.set_center(padded.center());

        let ceiling = max_zoom.min(self.max_zoom);
        let mut best_zoom = self.min_zoom;

        for test_zoom in (self.min_zoom as i32)..=(ceiling as i32) {
            let zoom = test_zoom as f64;

            let nw = self.project(
                &LatLng::new(padded.north_east.lat, padded.south_west.lng),
                Some(zoom),
            );
            let se = self.project(
                &LatLng::new(padded.south_west.lat, padded.north_east.lng),
                Some(zoom),
            );

            let bounds_width = (se.x - nw.x).abs();
            let bounds_height = (se.y - nw.y).abs();

            if bounds_width <= self.size.x && bounds_height <= self.size.y {
                best_zoom = zoom;
            } else {
                break;
            }
        }

        self.set_zoom(best_zoom);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(LatLng::new(41.3275, 19.8187), 13.0, Point::new(800.0, 600.0));

        assert_eq!(viewport.zoom, 13.0);
        assert_eq!(viewport.center.lat, 41.3275);
        assert_eq!(viewport.size.x, 800.0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let center_lat_lng = viewport.pixel_to_lat_lng(&Point::new(256.0, 256.0));
        assert!(center_lat_lng.lat.abs() < 0.01);
        assert!(center_lat_lng.lng.abs() < 0.01);

        let pixel = viewport.lat_lng_to_pixel(&LatLng::new(0.0, 0.0));
        assert!((pixel.x - 256.0).abs() < 0.01);
        assert!((pixel.y - 256.0).abs() < 0.01);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(8.0, 18.0);

        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom, 8.0);

        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 18.0);
    }

    #[test]
    fn test_pan_by_moves_center() {
        let mut viewport = Viewport::new(LatLng::new(41.0, 19.0), 12.0, Point::new(800.0, 600.0));
        viewport.pan_by(Point::new(0.0, 120.0));

        // A positive y offset moves the center south, so the content moves up
        assert!(viewport.center.lat < 41.0);
        assert!((viewport.center.lng - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_bounds_respects_max_zoom() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 3.0, Point::new(800.0, 600.0));
        viewport.set_zoom_limits(8.0, 18.0);

        let tiny = LatLngBounds::from_coords(41.3270, 19.8180, 41.3280, 19.8190);
        viewport.fit_bounds(&tiny, 0.1, 15.0);
        assert_eq!(viewport.zoom, 15.0);
        assert!(viewport.bounds().contains(&LatLng::new(41.3275, 19.8185)));

        let wide = LatLngBounds::from_coords(40.0, 19.0, 42.5, 21.0);
        viewport.fit_bounds(&wide, 0.1, 15.0);
        assert!(viewport.zoom < 15.0);
    }
}
