use crate::core::geo::TileCoord;

/// Anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Expands `{s}`, `{z}`, `{x}` and `{y}` in a URL template.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTemplateSource {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplateSource {
    pub fn new(template: String, subdomains: Vec<String>) -> Self {
        Self {
            template,
            subdomains,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());
        if !self.subdomains.is_empty() {
            // Spread requests over subdomains the way Leaflet does
            let index = (coord.x as usize + coord.y as usize) % self.subdomains.len();
            url = url.replace("{s}", &self.subdomains[index]);
        }
        url
    }
}
