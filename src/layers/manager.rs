use crate::{
    layers::base::{LayerTrait, LayerType},
    prelude::HashMap,
    MapError, Result,
};

/// Manages layers for the map, handling ordering and lookup
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Ordered list of layer IDs for rendering (sorted by z-index, stable by insertion)
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer; ids must be unique
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(MapError::Layer(format!("duplicate layer id '{}'", layer_id)));
        }
        let z_index = layer.z_index();

        self.layers.insert(layer_id.clone(), layer);

        // Insert after every layer with the same or lower z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.render_order.retain(|id| id != layer_id);
        self.layers.remove(layer_id)
    }

    /// Removes every layer of `layer_type`, returning the removed ids in render order
    pub fn remove_layers_of_type(&mut self, layer_type: LayerType) -> Vec<String> {
        let (removed, kept): (Vec<String>, Vec<String>) =
            self.render_order.drain(..).partition(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.layer_type() == layer_type)
                    .unwrap_or(false)
            });
        self.render_order = kept;
        for id in &removed {
            self.layers.remove(id);
        }
        removed
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    /// Layer ids in render order
    pub fn list_layers(&self) -> Vec<String> {
        self.render_order.clone()
    }

    /// Gets all layers in render order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.render_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|l| l.as_ref()))
            .collect()
    }

    pub fn count_of_type(&self, layer_type: LayerType) -> usize {
        self.layers
            .values()
            .filter(|l| l.layer_type() == layer_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::layers::{marker::Marker, tile::TileLayer};

    fn marker(id: &str) -> Box<dyn LayerTrait> {
        Box::new(Marker::new(id.to_string(), LatLng::new(42.0, -73.0)))
    }

    #[test]
    fn test_markers_render_above_tiles() {
        let mut manager = LayerManager::new();
        manager.add_layer(marker("marker-1")).unwrap();
        manager
            .add_layer(Box::new(TileLayer::openstreetmap("tile-2".to_string())))
            .unwrap();
        manager.add_layer(marker("marker-3")).unwrap();

        assert_eq!(manager.list_layers(), vec!["tile-2", "marker-1", "marker-3"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut manager = LayerManager::new();
        manager.add_layer(marker("marker-1")).unwrap();
        assert!(manager.add_layer(marker("marker-1")).is_err());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_layers_of_type_keeps_tiles() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(TileLayer::openstreetmap("tile-1".to_string())))
            .unwrap();
        manager.add_layer(marker("marker-2")).unwrap();
        manager.add_layer(marker("marker-3")).unwrap();

        let removed = manager.remove_layers_of_type(LayerType::Marker);
        assert_eq!(removed, vec!["marker-2", "marker-3"]);
        assert_eq!(manager.count_of_type(LayerType::Marker), 0);
        assert_eq!(manager.count_of_type(LayerType::Tile), 1);
        assert!(manager.get_layer("tile-1").is_some());
    }

    #[test]
    fn test_remove_single_layer() {
        let mut manager = LayerManager::new();
        manager.add_layer(marker("marker-1")).unwrap();
        assert!(manager.remove_layer("marker-1").is_some());
        assert!(manager.remove_layer("marker-1").is_none());
        assert!(manager.is_empty());
    }
}
