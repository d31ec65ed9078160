use crate::{
    core::{
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    input::events::{EventManager, MapEvent},
    layers::{
        base::{LayerTrait, LayerType},
        manager::LayerManager,
    },
    MapError, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub attribution_control: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            min_zoom: None,
            max_zoom: None,
            attribution_control: true,
        }
    }
}

/// The map widget: a viewport, its layers and a queue of map events
pub struct Map {
    pub viewport: Viewport,
    layer_manager: LayerManager,
    event_manager: EventManager,
    options: MapOptions,
    layer_seq: u64,
}

impl Map {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        let viewport = Viewport::new(center, zoom, size);
        Self::with_options(viewport, MapOptions::default())
    }

    pub fn with_options(viewport: Viewport, options: MapOptions) -> Self {
        let mut map = Self {
            viewport,
            layer_manager: LayerManager::new(),
            event_manager: EventManager::new(),
            options,
            layer_seq: 0,
        };

        if let (Some(min), Some(max)) = (map.options.min_zoom, map.options.max_zoom) {
            map.viewport.set_zoom_limits(min, max);
        }

        map
    }

    /// Recenters the map. Emits `ViewChanged` when center or zoom actually change.
    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()> {
        if !center.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "cannot center map on {}",
                center
            )));
        }
        if !zoom.is_finite() {
            return Err(MapError::InvalidCoordinates(format!("invalid zoom {}", zoom)));
        }

        let old_center = self.viewport.center;
        let old_zoom = self.viewport.zoom;

        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);

        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            log::debug!(
                "view changed to {} @ zoom {}",
                self.viewport.center,
                self.viewport.zoom
            );
            self.event_manager.emit(MapEvent::ViewChanged {
                center: self.viewport.center,
                zoom: self.viewport.zoom,
            });
        }

        Ok(())
    }

    /// Hands out a layer id unique within this map, e.g. `marker-3`
    pub fn next_layer_id(&mut self, prefix: &str) -> String {
        self.layer_seq += 1;
        format!("{}-{}", prefix, self.layer_seq)
    }

    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layer_manager.add_layer(layer)?;
        self.event_manager.emit(MapEvent::LayerAdd { layer_id });
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Result<()> {
        if self.layer_manager.remove_layer(layer_id).is_some() {
            self.event_manager.emit(MapEvent::LayerRemove {
                layer_id: layer_id.to_string(),
            });
        }
        Ok(())
    }

    /// Removes every layer of one kind, leaving the others untouched
    pub fn remove_layers_of_type(&mut self, layer_type: LayerType) -> usize {
        let removed = self.layer_manager.remove_layers_of_type(layer_type);
        let count = removed.len();
        for layer_id in removed {
            self.event_manager.emit(MapEvent::LayerRemove { layer_id });
        }
        count
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layer_manager.get_layer(layer_id)
    }

    /// Layers in render order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.layer_manager.layers()
    }

    /// Layers of one kind downcast to their concrete type, in render order
    pub fn layers_of_type<T: 'static>(&self) -> Vec<&T> {
        self.layer_manager
            .layers()
            .into_iter()
            .filter_map(|layer| layer.as_any().downcast_ref::<T>())
            .collect()
    }

    pub fn count_layers_of_type(&self, layer_type: LayerType) -> usize {
        self.layer_manager.count_of_type(layer_type)
    }

    pub fn list_layers(&self) -> Vec<String> {
        self.layer_manager.list_layers()
    }

    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(event_type, callback);
    }

    pub fn emit(&mut self, event: MapEvent) {
        self.event_manager.emit(event);
    }

    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }
}
