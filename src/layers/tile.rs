use crate::{
    core::{
        constants::{OSM_ATTRIBUTION, OSM_ATTRIBUTION_HTML, OSM_MAX_ZOOM, OSM_TILE_URL, TILE_SIZE},
        geo::TileCoord,
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    tiles::source::{TileSource, UrlTemplateSource},
};
use serde::{Deserialize, Serialize};

/// Configuration for a tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerOptions {
    /// URL template for tiles, e.g. `https://tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub url_template: String,
    /// Values substituted for `{s}`; empty when the template has none
    pub subdomains: Vec<String>,
    /// Attribution text
    pub attribution: String,
    /// Attribution markup for HTML front ends
    pub attribution_html: String,
    /// Tile size in pixels
    pub tile_size: u32,
    /// Maximum zoom level for this tile source
    pub max_zoom: u8,
    /// Minimum zoom level for this tile source
    pub min_zoom: u8,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            subdomains: Vec::new(),
            attribution: OSM_ATTRIBUTION.to_string(),
            attribution_html: OSM_ATTRIBUTION_HTML.to_string(),
            tile_size: TILE_SIZE,
            max_zoom: OSM_MAX_ZOOM,
            min_zoom: 0,
        }
    }
}

/// Raster base layer served by a slippy-map tile server
pub struct TileLayer {
    properties: LayerProperties,
    options: TileLayerOptions,
    source: UrlTemplateSource,
}

impl TileLayer {
    pub fn with_options(id: String, name: String, options: TileLayerOptions) -> Self {
        let properties = LayerProperties::new(id, name, LayerType::Tile);
        let source = UrlTemplateSource::new(options.url_template.clone(), options.subdomains.clone());
        Self {
            properties,
            options,
            source,
        }
    }

    /// Standard OpenStreetMap tiles
    pub fn openstreetmap(id: String) -> Self {
        Self::with_options(id, "OpenStreetMap".to_string(), TileLayerOptions::default())
    }

    pub fn tile_options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn attribution(&self) -> &str {
        &self.options.attribution
    }

    pub fn source(&self) -> &UrlTemplateSource {
        &self.source
    }

    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.source.url(coord)
    }

    /// Zoom level tiles are requested at for `viewport`
    pub fn tile_zoom(&self, viewport: &Viewport) -> u8 {
        viewport
            .tile_zoom(self.options.max_zoom)
            .max(self.options.min_zoom)
    }

    /// Tiles needed to cover `viewport`
    pub fn visible_tiles(&self, viewport: &Viewport) -> Vec<TileCoord> {
        viewport.visible_tiles(self.tile_zoom(viewport))
    }
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(TileLayer, properties);

    fn options(&self) -> serde_json::Value {
        serde_json::to_value(&self.options).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::{LatLng, Point};

    #[test]
    fn test_openstreetmap_defaults() {
        let layer = TileLayer::openstreetmap("tile-1".to_string());
        assert_eq!(layer.layer_type(), LayerType::Tile);
        assert_eq!(layer.tile_options().max_zoom, 19);
        assert_eq!(layer.attribution(), "© OpenStreetMap contributors");
        assert!(layer.bounds().is_none());
        assert_eq!(
            layer.tile_url(TileCoord::new(7, 12, 5)),
            "https://tile.openstreetmap.org/5/7/12.png"
        );
        assert_eq!(layer.options()["max_zoom"], 19);
    }

    #[test]
    fn test_tile_zoom_respects_limits() {
        let layer = TileLayer::openstreetmap("tile-1".to_string());
        let mut viewport = Viewport::new(LatLng::new(37.0902, -95.7129), 5.0, Point::new(512.0, 512.0));
        assert_eq!(layer.tile_zoom(&viewport), 5);
        viewport.set_zoom(19.0);
        assert_eq!(layer.tile_zoom(&viewport), 19);

        let mut options = TileLayerOptions::default();
        options.max_zoom = 16;
        let capped = TileLayer::with_options("tile-2".to_string(), "Capped".to_string(), options);
        assert_eq!(capped.tile_zoom(&viewport), 16);
    }

    #[test]
    fn test_visible_tiles_at_default_view() {
        let layer = TileLayer::openstreetmap("tile-1".to_string());
        let viewport = Viewport::new(LatLng::new(37.0902, -95.7129), 5.0, Point::new(512.0, 512.0));
        let tiles = layer.visible_tiles(&viewport);
        assert!(tiles.contains(&TileCoord::new(7, 12, 5)));
        assert!(tiles.len() >= 4 && tiles.len() <= 9);
    }
}
