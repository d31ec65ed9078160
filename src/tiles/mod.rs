pub mod cache;
#[cfg(all(feature = "render", not(target_arch = "wasm32")))]
pub mod loader;
pub mod source;
