use super::{GeolocationError, GeolocationProvider, Position};
use async_trait::async_trait;
use std::time::Duration;

/// ipapi.co JSON endpoint; ip-api.com responses are understood as well
pub const DEFAULT_IP_ENDPOINT: &str = "https://ipapi.co/json/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Approximate position from the public IP address of this machine.
///
/// Needs a tokio runtime, like every async `reqwest` call.
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl IpGeolocation {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for IpGeolocation {
    fn default() -> Self {
        Self::new(DEFAULT_IP_ENDPOINT)
    }
}

fn request_error(error: reqwest::Error) -> GeolocationError {
    if error.is_timeout() {
        GeolocationError::timeout(error.to_string())
    } else {
        GeolocationError::unavailable(error.to_string())
    }
}

/// Extracts a position from an IP geolocation response body
pub fn parse_ip_response(body: &serde_json::Value) -> Result<Position, GeolocationError> {
    let field = |names: &[&str]| names.iter().find_map(|name| body.get(*name).and_then(|v| v.as_f64()));

    match (field(&["latitude", "lat"]), field(&["longitude", "lon"])) {
        (Some(lat), Some(lng)) => {
            let position = Position::new(lat, lng);
            if position.lat_lng().is_valid() {
                Ok(position)
            } else {
                Err(GeolocationError::unavailable(format!(
                    "service returned out-of-range coordinates ({}, {})",
                    lat, lng
                )))
            }
        }
        _ => {
            // Both services put an explanation in "reason"/"message" on failure
            let reason = body
                .get("reason")
                .or_else(|| body.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("response has no coordinates");
            Err(GeolocationError::unavailable(reason))
        }
    }
}

#[async_trait]
impl GeolocationProvider for IpGeolocation {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        log::info!("requesting IP geolocation from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?;

        let body: serde_json::Value = response.json().await.map_err(request_error)?;
        let position = parse_ip_response(&body)?;
        log::info!("IP geolocation resolved to {}", position.lat_lng());
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geolocation::GeolocationErrorKind;
    use serde_json::json;

    #[test]
    fn test_parses_ipapi_co_response() {
        let body = json!({ "city": "Troy", "latitude": 42.7284, "longitude": -73.6918 });
        assert_eq!(parse_ip_response(&body).unwrap(), Position::new(42.7284, -73.6918));
    }

    #[test]
    fn test_parses_ip_api_com_response() {
        let body = json!({ "status": "success", "lat": 42.7284, "lon": -73.6918 });
        assert_eq!(parse_ip_response(&body).unwrap(), Position::new(42.7284, -73.6918));
    }

    #[test]
    fn test_missing_coordinates_is_unavailable() {
        let body = json!({ "error": true, "reason": "RateLimited" });
        let error = parse_ip_response(&body).unwrap_err();
        assert_eq!(error.kind, GeolocationErrorKind::PositionUnavailable);
        assert_eq!(error.message, "RateLimited");
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let body = json!({ "latitude": 120.0, "longitude": 0.0 });
        assert!(parse_ip_response(&body).is_err());
    }

    #[test]
    fn test_default_endpoint() {
        let provider = IpGeolocation::default().with_timeout(Duration::from_secs(1));
        assert_eq!(provider.endpoint(), DEFAULT_IP_ENDPOINT);
    }
}
