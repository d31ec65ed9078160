//! Prelude module for common issuemap types and traits
//!
//! `use issuemap::prelude::*;` brings in the controller, the map model and
//! the collection aliases used throughout the crate.

pub use crate::core::{
    config::{FallbackPolicy, FilterCase, GeolocationMode, MapViewConfig, ViewConfig},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{Map, MapOptions},
    viewport::Viewport,
};

pub use crate::layers::{
    base::{LayerProperties, LayerTrait, LayerType},
    manager::LayerManager,
    marker::Marker,
    tile::{TileLayer, TileLayerOptions},
};

pub use crate::controller::{
    LocateRequest, LocationResult, LogNotifier, MapViewController, Notifier, ViewState,
};

pub use crate::data::issues::{InlineIssueSource, Issue, IssueSet, IssueSource};

pub use crate::geolocation::{
    FixedGeolocation, GeolocationError, GeolocationErrorKind, GeolocationProvider, Position,
};

pub use crate::input::events::{ControlEvent, EventManager, MapEvent};

pub use crate::tiles::{cache::TileCache, source::TileSource};

pub use crate::ui::popup::Popup;

pub use crate::{Error as MapError, Result};

pub use std::{collections::VecDeque, sync::Arc};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
