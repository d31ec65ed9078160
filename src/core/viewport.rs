use crate::core::constants::{OSM_MAX_ZOOM, TILE_SIZE};
use crate::core::geo::{LatLng, LatLngBounds, Point, TileCoord};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const EARTH_RADIUS: f64 = 6378137.0;

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        let max_zoom = OSM_MAX_ZOOM as f64;
        Self {
            center,
            zoom: zoom.clamp(0.0, max_zoom),
            size,
            min_zoom: 0.0,
            max_zoom,
        }
    }

    /// Sets the center, clamping latitude to the projectable range
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(LatLng::clamp_lat(center.lat), center.lng);
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Projects a LatLng to world pixel coordinates (EPSG:3857) at `zoom`,
    /// or at the current zoom when `None`
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let scale = TILE_SIZE as f64 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let lat = LatLng::clamp_lat(lat_lng.lat);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

        let circumference = 2.0 * PI * EARTH_RADIUS;
        Point::new(
            (x + PI * EARTH_RADIUS) / circumference * scale,
            (-y + PI * EARTH_RADIUS) / circumference * scale,
        )
    }

    /// Inverse of [`Viewport::project`]
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let scale = TILE_SIZE as f64 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let circumference = 2.0 * PI * EARTH_RADIUS;

        let x = (pixel.x / scale) * circumference - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * circumference;

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        LatLng::new(lat, lng)
    }

    /// World pixel of the top-left corner of the view
    pub fn pixel_origin(&self) -> Point {
        let center = self.project(&self.center, None);
        center.subtract(&self.size.multiply(0.5))
    }

    /// Converts a geographical coordinate to container pixel coordinates
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        self.project(lat_lng, None).subtract(&self.pixel_origin())
    }

    /// Converts container pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        self.unproject(&pixel.add(&self.pixel_origin()), None)
    }

    /// Moves the center by a pixel offset (dragging the map content by `-delta`)
    pub fn pan_by_pixels(&mut self, delta: Point) {
        let center = self.project(&self.center, None).add(&delta);
        let new_center = self.unproject(&center, None);
        self.set_center(LatLng::new(new_center.lat, LatLng::wrap_lng(new_center.lng)));
    }

    /// Geographic bounds of the visible area
    pub fn bounds(&self) -> LatLngBounds {
        let north_west = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let south_east = self.pixel_to_lat_lng(&self.size);
        LatLngBounds::new(
            LatLng::new(south_east.lat, north_west.lng),
            LatLng::new(north_west.lat, south_east.lng),
        )
    }

    /// Integer zoom used to pick tiles, capped at `max_tile_zoom`
    pub fn tile_zoom(&self, max_tile_zoom: u8) -> u8 {
        (self.zoom.round().max(0.0) as u8).min(max_tile_zoom)
    }

    /// Tiles covering the view at `tile_zoom`, row by row
    pub fn visible_tiles(&self, tile_zoom: u8) -> Vec<TileCoord> {
        let tile_size = TILE_SIZE as f64 * 2_f64.powf(self.zoom - tile_zoom as f64);
        let origin = self.pixel_origin();
        // Scale world pixels at the current zoom down to tile_zoom pixels
        let to_tile = |value: f64| (value / tile_size).floor() as i64;
        let max_index = (1_i64 << tile_zoom) - 1;

        let min_x = to_tile(origin.x).clamp(0, max_index);
        let min_y = to_tile(origin.y).clamp(0, max_index);
        let max_x = to_tile(origin.x + self.size.x).clamp(0, max_index);
        let max_y = to_tile(origin.y + self.size.y).clamp(0, max_index);

        let mut tiles = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                tiles.push(TileCoord::new(x as u32, y as u32, tile_zoom));
            }
        }
        tiles
    }

    /// Container-pixel rectangle `(top_left, bottom_right)` of a tile
    pub fn tile_rect(&self, coord: &TileCoord) -> (Point, Point) {
        let tile_size = TILE_SIZE as f64 * 2_f64.powf(self.zoom - coord.z as f64);
        let origin = self.pixel_origin();
        let min = Point::new(coord.x as f64 * tile_size, coord.y as f64 * tile_size).subtract(&origin);
        (min, min.add(&Point::new(tile_size, tile_size)))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::default(), 1.0, Point::new(800.0, 600.0))
    }
}
