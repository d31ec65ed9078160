//! Position lookup behind a single async trait.
//!
//! The controller treats every failure the same way; the error kind exists
//! for logging and for front ends that want to phrase the alert differently.

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod browser;
#[cfg(not(target_arch = "wasm32"))]
pub mod ip;

use crate::core::config::GeolocationMode;
use crate::core::geo::LatLng;
use async_trait::async_trait;
use std::sync::Arc;

/// A position reported by a geolocation provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    /// Accuracy radius in meters, when the provider reports one
    pub accuracy: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Failure categories of the W3C Geolocation API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl GeolocationErrorKind {
    /// Maps a `GeolocationPositionError.code`
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }
}

impl std::fmt::Display for GeolocationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::PositionUnavailable => write!(f, "position unavailable"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GeolocationError {
    pub kind: GeolocationErrorKind,
    pub message: String,
}

impl GeolocationError {
    pub fn new(kind: GeolocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(GeolocationErrorKind::PermissionDenied, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GeolocationErrorKind::PositionUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GeolocationErrorKind::Timeout, message)
    }
}

/// `Send + Sync` on native targets; browser futures are single-threaded
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

/// Something that can answer "where is the user right now"
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait GeolocationProvider: MaybeSend {
    async fn current_position(&self) -> std::result::Result<Position, GeolocationError>;
}

/// Answers every lookup with the same outcome
#[derive(Debug, Clone, PartialEq)]
pub struct FixedGeolocation {
    outcome: std::result::Result<Position, GeolocationError>,
}

impl FixedGeolocation {
    pub fn at(position: Position) -> Self {
        Self {
            outcome: Ok(position),
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> std::result::Result<Position, GeolocationError> {
        self.outcome.clone()
    }
}

/// Builds the provider selected by `mode` for the current platform
pub fn provider_from_mode(mode: &GeolocationMode) -> Arc<dyn GeolocationProvider> {
    match mode {
        GeolocationMode::Fixed { lat, lng } => Arc::new(FixedGeolocation::at(Position::new(*lat, *lng))),
        GeolocationMode::Disabled => Arc::new(FixedGeolocation::failing(
            GeolocationError::permission_denied("geolocation is disabled by configuration"),
        )),
        #[cfg(not(target_arch = "wasm32"))]
        GeolocationMode::Ip { endpoint } => Arc::new(ip::IpGeolocation::new(endpoint.clone())),
        #[cfg(not(target_arch = "wasm32"))]
        GeolocationMode::Auto => Arc::new(ip::IpGeolocation::default()),
        #[cfg(all(target_arch = "wasm32", feature = "wasm"))]
        GeolocationMode::Auto | GeolocationMode::Ip { .. } => Arc::new(browser::BrowserGeolocation),
        #[cfg(all(target_arch = "wasm32", not(feature = "wasm")))]
        GeolocationMode::Auto | GeolocationMode::Ip { .. } => Arc::new(FixedGeolocation::failing(
            GeolocationError::unavailable("no geolocation backend compiled in"),
        )),
    }
}
