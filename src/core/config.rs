//! Configuration for the map view controller and its viewers
//!
//! Every field has a default matching the stock behaviour, so a config file
//! only needs the keys it wants to change:
//!
//! ```json
//! { "filter_case": "insensitive", "fallback_policy": "reset" }
//! ```

use crate::core::constants::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_ZOOM, GEOLOCATION_FAILED_MESSAGE,
    USER_LOCATION_ZOOM,
};
use crate::core::geo::{LatLng, Point};
use crate::layers::tile::TileLayerOptions;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A center and zoom pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub center: LatLng,
    pub zoom: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: LatLng::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// How the filter query is compared with issue names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCase {
    /// Names are lowercased, the query is used as typed
    #[default]
    AsTyped,
    /// Both sides are lowercased
    Insensitive,
}

/// What the controller does after a failed geolocation lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Re-run the default view as-is: recenter, add another tile layer and
    /// render the working list on top of the existing markers
    #[default]
    Replay,
    /// Recenter, clear markers and render the working list once, keeping a
    /// single tile layer
    Reset,
}

/// Where the "detect location" button gets its position from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GeolocationMode {
    /// Platform default: browser API on wasm, IP lookup on native
    Auto,
    /// IP-based lookup against a JSON endpoint
    Ip { endpoint: String },
    /// Always report the given position
    Fixed { lat: f64, lng: f64 },
    /// Always fail; useful to exercise the fallback path
    Disabled,
}

impl Default for GeolocationMode {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewConfig {
    /// View used at start-up and after a failed lookup
    pub default_view: ViewConfig,
    /// Zoom applied when centering on the user
    pub user_zoom: f64,
    /// Initial widget size in pixels
    pub size: Point,
    pub tile_layer: TileLayerOptions,
    pub filter_case: FilterCase,
    pub fallback_policy: FallbackPolicy,
    /// Text of the alert shown when the user's position is unavailable
    pub geolocation_failed_message: String,
    pub geolocation: GeolocationMode,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            default_view: ViewConfig::default(),
            user_zoom: USER_LOCATION_ZOOM,
            size: Point::new(1200.0, 800.0),
            tile_layer: TileLayerOptions::default(),
            filter_case: FilterCase::default(),
            fallback_policy: FallbackPolicy::default(),
            geolocation_failed_message: GEOLOCATION_FAILED_MESSAGE.to_string(),
            geolocation: GeolocationMode::default(),
        }
    }
}

impl MapViewConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("loading map config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Loads `path` when it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.default_view.center.is_valid() {
            return Err(MapError::Config(format!(
                "default view center {} is out of range",
                self.default_view.center
            )));
        }
        let max_zoom = self.tile_layer.max_zoom as f64;
        for (name, zoom) in [("default zoom", self.default_view.zoom), ("user zoom", self.user_zoom)] {
            if !(0.0..=max_zoom).contains(&zoom) {
                return Err(MapError::Config(format!(
                    "{} {} is outside 0..={}",
                    name, zoom, max_zoom
                )));
            }
        }
        if self.tile_layer.min_zoom > self.tile_layer.max_zoom {
            return Err(MapError::Config(
                "tile layer min_zoom exceeds max_zoom".to_string(),
            ));
        }
        if let GeolocationMode::Fixed { lat, lng } = self.geolocation {
            if !LatLng::new(lat, lng).is_valid() {
                return Err(MapError::Config(format!(
                    "fixed geolocation ({}, {}) is out of range",
                    lat, lng
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_behaviour() {
        let config = MapViewConfig::default();
        assert_eq!(config.default_view.center, LatLng::new(37.0902, -95.7129));
        assert_eq!(config.default_view.zoom, 5.0);
        assert_eq!(config.user_zoom, 13.0);
        assert_eq!(config.filter_case, FilterCase::AsTyped);
        assert_eq!(config.fallback_policy, FallbackPolicy::Replay);
        assert_eq!(config.geolocation, GeolocationMode::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MapViewConfig::from_json_str(
            r#"{
                "filter_case": "insensitive",
                "fallback_policy": "reset",
                "geolocation": { "mode": "fixed", "lat": 42.7, "lng": -73.2 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.filter_case, FilterCase::Insensitive);
        assert_eq!(config.fallback_policy, FallbackPolicy::Reset);
        assert_eq!(
            config.geolocation,
            GeolocationMode::Fixed { lat: 42.7, lng: -73.2 }
        );
        assert_eq!(config.user_zoom, 13.0);
        assert_eq!(config.tile_layer.max_zoom, 19);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = MapViewConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(MapViewConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(MapViewConfig::from_json_str(r#"{ "user_zoom": 30 }"#).is_err());
        assert!(MapViewConfig::from_json_str(
            r#"{ "default_view": { "center": { "lat": 95.0, "lng": 0.0 }, "zoom": 5 } }"#
        )
        .is_err());
        assert!(MapViewConfig::from_json_str(r#"{ "geolocation": { "mode": "fixed", "lat": 0, "lng": 200 } }"#).is_err());
        assert!(matches!(
            MapViewConfig::from_json_str("not json"),
            Err(MapError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = MapViewConfig::load_or_default("/nonexistent/issuemap.json").unwrap();
        assert_eq!(config, MapViewConfig::default());
    }
}
