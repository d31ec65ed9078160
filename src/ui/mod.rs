pub mod popup;
#[cfg(all(feature = "egui", feature = "render", not(target_arch = "wasm32")))]
pub mod widget;

pub use popup::Popup;
#[cfg(all(feature = "egui", feature = "render", not(target_arch = "wasm32")))]
pub use widget::{MapWidget, MapWidgetConfig, MapWidgetResponse};
