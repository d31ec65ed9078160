//! # issuemap
//!
//! Renders a small set of issue records as markers on an OpenStreetMap-backed
//! map, filters them by name, and recenters on the user's location.
//!
//! The [`controller::MapViewController`] owns all state. Front ends (the
//! native egui viewer, the browser binding behind the `wasm` feature) forward
//! their UI events to it and draw whatever layers the map holds.

pub mod controller;
pub mod core;
pub mod data;
pub mod geolocation;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod tiles;
pub mod ui;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod web;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::MapViewConfig,
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use layers::{base::LayerTrait, marker::Marker, tile::TileLayer};

pub use controller::{MapViewController, Notifier, ViewState};

pub use data::issues::{Issue, IssueSet};

pub use geolocation::{GeolocationError, GeolocationProvider, Position};

pub use input::events::{ControlEvent, MapEvent};

pub use ui::popup::Popup;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),
}

/// Error type alias for convenience
pub type Error = MapError;
