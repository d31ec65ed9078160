use super::{GeolocationError, GeolocationErrorKind, GeolocationProvider, Position};
use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{GeolocationPosition, GeolocationPositionError};

/// `navigator.geolocation.getCurrentPosition` wrapped in a future
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserGeolocation;

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

#[async_trait(?Send)]
impl GeolocationProvider for BrowserGeolocation {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        let window = web_sys::window()
            .ok_or_else(|| GeolocationError::unavailable("no window object"))?;
        let geolocation = window
            .navigator()
            .geolocation()
            .map_err(|e| GeolocationError::unavailable(describe(&e)))?;

        let mut started = Ok(());
        let promise = js_sys::Promise::new(&mut |resolve, reject| {
            started = geolocation.get_current_position_with_error_callback(&resolve, Some(&reject));
        });
        started.map_err(|e| GeolocationError::unavailable(describe(&e)))?;

        match JsFuture::from(promise).await {
            Ok(value) => {
                let position: GeolocationPosition = value
                    .dyn_into()
                    .map_err(|v| GeolocationError::unavailable(describe(&v)))?;
                let coords = position.coords();
                Ok(Position::new(coords.latitude(), coords.longitude())
                    .with_accuracy(coords.accuracy()))
            }
            Err(value) => match value.dyn_into::<GeolocationPositionError>() {
                Ok(error) => Err(GeolocationError::new(
                    GeolocationErrorKind::from_code(error.code()),
                    error.message(),
                )),
                Err(other) => Err(GeolocationError::unavailable(describe(&other))),
            },
        }
    }
}
