//! Defaults shared by the controller, the tile layer and the viewers.
//! Keeping them in a single place makes it easier to tweak map-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Latitude of the default (continental US) view.
pub const DEFAULT_CENTER_LAT: f64 = 37.0902;

/// Longitude of the default (continental US) view.
pub const DEFAULT_CENTER_LNG: f64 = -95.7129;

/// Zoom level of the default view.
pub const DEFAULT_ZOOM: f64 = 5.0;

/// Zoom level used after a successful geolocation lookup.
pub const USER_LOCATION_ZOOM: f64 = 13.0;

/// Highest zoom the OpenStreetMap tile server serves.
pub const OSM_MAX_ZOOM: u8 = 19;

/// OpenStreetMap standard tile endpoint.
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Plain-text attribution for OpenStreetMap tiles.
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// HTML attribution for OpenStreetMap tiles.
pub const OSM_ATTRIBUTION_HTML: &str =
    "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>";

/// Message shown when the user's position cannot be determined.
pub const GEOLOCATION_FAILED_MESSAGE: &str =
    "Failed to get your coordinates, check your browser geolocation permissions and try again";

/// Marker z-index; keeps markers above base tiles.
pub const MARKER_Z_INDEX: i32 = 100;

/// Marker icon default size (regular PNG).
pub const MARKER_ICON_SIZE: (u32, u32) = (25, 41);

/// Anchor inside the icon (hot-spot) in pixel coords.
pub const MARKER_ICON_ANCHOR: (u32, u32) = (12, 41);
