use crate::{
    core::{
        constants::MARKER_Z_INDEX,
        geo::{LatLng, LatLngBounds},
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    ui::popup::Popup,
};

/// A pin at a single coordinate with an optional popup
pub struct Marker {
    properties: LayerProperties,
    position: LatLng,
    popup: Option<Popup>,
}

impl Marker {
    pub fn new(id: String, position: LatLng) -> Self {
        let properties = LayerProperties::new(id, "Marker".to_string(), LayerType::Marker)
            .with_z_index(MARKER_Z_INDEX);
        Self {
            properties,
            position,
            popup: None,
        }
    }

    /// Attaches a popup; the marker takes the popup title as its name
    pub fn with_popup(mut self, popup: Popup) -> Self {
        self.properties.name = popup.title().to_string();
        self.popup = Some(popup);
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }
}

impl LayerTrait for Marker {
    crate::impl_layer_trait!(Marker, properties);

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "position": {
                "lat": self.position.lat,
                "lng": self.position.lng
            },
            "popup": self.popup.as_ref().map(|p| p.to_html())
        })
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.position, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_with_popup() {
        let marker = Marker::new("marker-1".to_string(), LatLng::new(42.712082, -73.218619))
            .with_popup(Popup::new("Abandoned Vehicles", "submitted"));

        assert_eq!(marker.layer_type(), LayerType::Marker);
        assert_eq!(marker.name(), "Abandoned Vehicles");
        assert_eq!(marker.z_index(), MARKER_Z_INDEX);
        assert_eq!(marker.position(), LatLng::new(42.712082, -73.218619));

        let options = marker.options();
        assert_eq!(options["position"]["lat"], 42.712082);
        assert_eq!(
            options["popup"],
            "<b>Abandoned Vehicles</b> <br> submitted"
        );
    }

    #[test]
    fn test_marker_bounds_are_a_point() {
        let position = LatLng::new(1.0, 2.0);
        let marker = Marker::new("m".to_string(), position);
        assert_eq!(marker.bounds(), Some(LatLngBounds::new(position, position)));
        assert!(marker.popup().is_none());
        assert!(marker.options()["popup"].is_null());
    }
}
