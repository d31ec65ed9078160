use crate::{
    core::{
        constants::{MARKER_ICON_ANCHOR, MARKER_ICON_SIZE},
        geo::{LatLng, Point, TileCoord},
        map::Map,
    },
    input::events::MapEvent,
    layers::{base::LayerTrait, marker::Marker, tile::TileLayer},
    prelude::HashMap,
    tiles::loader::TileLoader,
};
use egui::{Color32, ColorImage, Pos2, Rect, Response, Sense, Stroke, TextureHandle, Ui, Vec2};
use std::time::Duration;

/// Map widget configuration
#[derive(Debug, Clone)]
pub struct MapWidgetConfig {
    pub interactive: bool,
    pub show_zoom_controls: bool,
    pub show_attribution: bool,
    pub background_color: Color32,
    pub marker_color: Color32,
    /// Zoom levels per scrolled point
    pub zoom_sensitivity: f64,
    pub tile_cache_capacity: usize,
}

impl Default for MapWidgetConfig {
    fn default() -> Self {
        Self {
            interactive: true,
            show_zoom_controls: true,
            show_attribution: true,
            background_color: Color32::from_rgb(230, 230, 230),
            marker_color: Color32::from_rgb(42, 129, 203),
            zoom_sensitivity: 0.002,
            tile_cache_capacity: 512,
        }
    }
}

pub struct MapWidgetResponse {
    pub response: Response,
    /// Set when dragging, scrolling or the zoom buttons moved the view
    pub view_changed: bool,
    /// Marker whose popup was opened this frame
    pub opened_popup: Option<String>,
    /// Map events queued since the previous frame, already handed to listeners
    pub events: Vec<MapEvent>,
}

/// Draws a [`Map`]'s tile layers and markers into an egui `Ui`.
///
/// The widget keeps the tile loader and GPU textures across frames; the map
/// itself stays with its owner and is borrowed for each `show` call.
pub struct MapWidget {
    config: MapWidgetConfig,
    loader: TileLoader,
    textures: HashMap<TileCoord, TextureHandle>,
    open_popup: Option<String>,
}

impl Default for MapWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl MapWidget {
    pub fn new() -> Self {
        Self::with_config(MapWidgetConfig::default())
    }

    pub fn with_config(config: MapWidgetConfig) -> Self {
        Self {
            loader: TileLoader::new(config.tile_cache_capacity),
            config,
            textures: HashMap::default(),
            open_popup: None,
        }
    }

    pub fn config(&self) -> &MapWidgetConfig {
        &self.config
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    /// Attribution line to draw, if both the widget and the map want one
    pub fn attribution(&self, map: &Map) -> Option<String> {
        if !self.config.show_attribution || !map.options().attribution_control {
            return None;
        }
        map.layers_of_type::<TileLayer>()
            .first()
            .map(|layer| layer.attribution().to_string())
    }

    /// Id of the marker whose popup is showing
    pub fn open_popup(&self) -> Option<&str> {
        self.open_popup.as_deref()
    }

    pub fn close_popup(&mut self) {
        self.open_popup = None;
    }

    pub fn show(&mut self, ui: &mut Ui, map: &mut Map) -> MapWidgetResponse {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let size = Point::new(rect.width() as f64, rect.height() as f64);
        if map.viewport().size != size {
            map.viewport_mut().set_size(size);
        }

        let mut view_changed = false;
        if self.config.interactive {
            view_changed |= self.handle_input(ui, &response, map);
        }
        if self.config.show_zoom_controls {
            view_changed |= zoom_controls(ui, rect, map);
        }

        if view_changed {
            // Tiles that failed for the old view get another chance
            self.loader.forget_failures();
        }

        let mut opened_popup = None;
        if response.clicked() {
            let hit = response
                .interact_pointer_pos()
                .and_then(|pos| marker_at(map, rect, pos));
            if hit.is_some() {
                opened_popup = hit.clone();
            }
            self.open_popup = hit;
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.config.background_color);

        self.loader.poll();
        self.paint_tiles(ui.ctx(), &painter, rect, map);
        self.paint_markers(&painter, rect, map);
        self.show_popup(ui.ctx(), rect, map);

        if let Some(attribution) = self.attribution(map) {
            painter.text(
                rect.right_bottom() + Vec2::new(-5.0, -5.0),
                egui::Align2::RIGHT_BOTTOM,
                attribution,
                egui::FontId::proportional(10.0),
                Color32::from_gray(90),
            );
        }

        if self.config.show_zoom_controls {
            paint_zoom_controls(&painter, rect);
        }

        if view_changed {
            ui.ctx().request_repaint();
        } else if self.loader.pending_count() > 0 {
            ui.ctx().request_repaint_after(Duration::from_millis(100));
        }

        MapWidgetResponse {
            response,
            view_changed,
            opened_popup,
            events: map.process_events(),
        }
    }

    fn handle_input(&self, ui: &Ui, response: &Response, map: &mut Map) -> bool {
        let mut changed = false;

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.1 {
                let center = map.viewport().center;
                let zoom = map.viewport().zoom + scroll as f64 * self.config.zoom_sensitivity;
                changed |= apply_view(map, center, zoom);
            }
        }

        if response.dragged() {
            let delta = response.drag_delta();
            if delta.length_sq() > 0.5 {
                let mut viewport = map.viewport().clone();
                viewport.pan_by_pixels(Point::new(-delta.x as f64, -delta.y as f64));
                changed |= apply_view(map, viewport.center, viewport.zoom);
            }
        }

        changed
    }

    fn texture_for(&mut self, ctx: &egui::Context, coord: TileCoord) -> Option<egui::TextureId> {
        if let Some(texture) = self.textures.get(&coord) {
            return Some(texture.id());
        }

        let tile = self.loader.cache().get(&coord)?;
        let image = ColorImage::from_rgba_unmultiplied(tile.size, &tile.rgba);
        let texture = ctx.load_texture(
            format!("tile_{}_{}_{}", coord.z, coord.x, coord.y),
            image,
            egui::TextureOptions::LINEAR,
        );
        let id = texture.id();
        self.textures.insert(coord, texture);
        Some(id)
    }

    fn paint_tiles(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: Rect, map: &Map) {
        let viewport = map.viewport().clone();
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

        for layer in map.layers_of_type::<TileLayer>() {
            if !layer.is_visible() {
                continue;
            }
            self.loader.request_visible(layer, &viewport);

            let tint = Color32::WHITE.gamma_multiply(layer.opacity());
            for coord in layer.visible_tiles(&viewport) {
                let Some(texture) = self.texture_for(ctx, coord) else {
                    continue;
                };
                let (min, max) = viewport.tile_rect(&coord);
                let tile_rect = Rect::from_min_max(to_screen(rect, min), to_screen(rect, max));
                painter.image(texture, tile_rect, uv, tint);
            }
        }

        // Textures of tiles the cache has evicted
        let cache = self.loader.cache();
        self.textures.retain(|coord, _| cache.contains(coord));
    }

    fn paint_markers(&self, painter: &egui::Painter, rect: Rect, map: &Map) {
        let viewport = map.viewport();
        let visible = rect.expand(MARKER_ICON_SIZE.1 as f32);

        for marker in map.layers_of_type::<Marker>() {
            if !marker.is_visible() {
                continue;
            }
            let anchor = to_screen(rect, viewport.lat_lng_to_pixel(&marker.position()));
            if visible.contains(anchor) {
                paint_pin(painter, anchor, self.config.marker_color);
            }
        }
    }

    fn show_popup(&mut self, ctx: &egui::Context, rect: Rect, map: &Map) {
        let Some(id) = self.open_popup.as_deref() else {
            return;
        };
        let Some(marker) = map
            .get_layer(id)
            .and_then(|layer| layer.as_any().downcast_ref::<Marker>())
        else {
            // The marker went away with a filter change
            self.open_popup = None;
            return;
        };
        let Some(popup) = marker.popup() else {
            return;
        };

        let anchor = to_screen(rect, map.viewport().lat_lng_to_pixel(&marker.position()));
        egui::Area::new(egui::Id::new("issuemap_marker_popup"))
            .order(egui::Order::Foreground)
            .fixed_pos(anchor - Vec2::new(0.0, MARKER_ICON_ANCHOR.1 as f32 + 4.0))
            .pivot(egui::Align2::CENTER_BOTTOM)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| popup.show(ui));
            });
    }
}

fn apply_view(map: &mut Map, center: LatLng, zoom: f64) -> bool {
    let before = (map.viewport().center, map.viewport().zoom);
    if let Err(e) = map.set_view(center, zoom) {
        log::debug!("ignoring view change: {}", e);
        return false;
    }
    before != (map.viewport().center, map.viewport().zoom)
}

fn to_screen(rect: Rect, point: Point) -> Pos2 {
    Pos2::new(rect.min.x + point.x as f32, rect.min.y + point.y as f32)
}

/// Clickable area of a marker icon whose tip sits at `anchor`
fn marker_hit_rect(anchor: Pos2) -> Rect {
    let (width, height) = MARKER_ICON_SIZE;
    let (anchor_x, anchor_y) = MARKER_ICON_ANCHOR;
    Rect::from_min_size(
        anchor - Vec2::new(anchor_x as f32, anchor_y as f32),
        Vec2::new(width as f32, height as f32),
    )
}

/// Topmost visible marker under `pos`
fn marker_at(map: &Map, rect: Rect, pos: Pos2) -> Option<String> {
    let viewport = map.viewport();
    map.layers_of_type::<Marker>()
        .into_iter()
        .rev()
        .filter(|marker| marker.is_visible())
        .find(|marker| {
            let anchor = to_screen(rect, viewport.lat_lng_to_pixel(&marker.position()));
            marker_hit_rect(anchor).contains(pos)
        })
        .map(|marker| marker.id().to_string())
}

fn paint_pin(painter: &egui::Painter, anchor: Pos2, color: Color32) {
    let head = anchor - Vec2::new(0.0, 28.0);
    let outline = Stroke::new(1.0, Color32::from_black_alpha(140));
    painter.add(egui::Shape::convex_polygon(
        vec![head + Vec2::new(-8.5, 5.0), head + Vec2::new(8.5, 5.0), anchor],
        color,
        Stroke::NONE,
    ));
    painter.circle(head, 10.0, color, outline);
    painter.circle_filled(head, 4.0, Color32::WHITE);
}

fn zoom_control_rects(rect: Rect) -> (Rect, Rect) {
    let size = Vec2::splat(30.0);
    (
        Rect::from_min_size(rect.right_top() + Vec2::new(-40.0, 10.0), size),
        Rect::from_min_size(rect.right_top() + Vec2::new(-40.0, 45.0), size),
    )
}

fn zoom_controls(ui: &mut Ui, rect: Rect, map: &mut Map) -> bool {
    let (zoom_in_rect, zoom_out_rect) = zoom_control_rects(rect);
    let zoom_in = ui.allocate_rect(zoom_in_rect, Sense::click());
    let zoom_out = ui.allocate_rect(zoom_out_rect, Sense::click());

    let step = if zoom_in.clicked() {
        1.0
    } else if zoom_out.clicked() {
        -1.0
    } else {
        return false;
    };
    let center = map.viewport().center;
    let zoom = map.viewport().zoom + step;
    apply_view(map, center, zoom)
}

fn paint_zoom_controls(painter: &egui::Painter, rect: Rect) {
    let (zoom_in_rect, zoom_out_rect) = zoom_control_rects(rect);
    for (button, label) in [(zoom_in_rect, "+"), (zoom_out_rect, "−")] {
        painter.rect_filled(button, 3.0, Color32::from_rgba_unmultiplied(255, 255, 255, 220));
        painter.rect_stroke(button, 3.0, Stroke::new(1.0, Color32::from_gray(100)));
        painter.text(
            button.center(),
            egui::Align2::CENTER_CENTER,
            label,
            egui::FontId::proportional(16.0),
            Color32::BLACK,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{map::MapOptions, viewport::Viewport};
    use crate::ui::popup::Popup;

    fn map_with_marker() -> (Map, Rect) {
        let mut map = Map::new(LatLng::new(42.71, -73.21), 13.0, Point::new(800.0, 600.0));
        let marker = Marker::new("marker-1".to_string(), LatLng::new(42.71, -73.21))
            .with_popup(Popup::new("Grafitti", "resolved"));
        map.add_layer(Box::new(marker)).unwrap();
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(800.0, 600.0));
        (map, rect)
    }

    #[test]
    fn test_marker_hit_testing() {
        let (map, rect) = map_with_marker();
        // The marker sits at the view center, its tip at (410, 320) on screen
        assert_eq!(
            marker_at(&map, rect, Pos2::new(410.0, 300.0)).as_deref(),
            Some("marker-1")
        );
        assert!(marker_at(&map, rect, Pos2::new(410.0, 330.0)).is_none());
        assert!(marker_at(&map, rect, Pos2::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn test_topmost_marker_wins() {
        let (mut map, rect) = map_with_marker();
        map.add_layer(Box::new(Marker::new(
            "marker-2".to_string(),
            LatLng::new(42.71, -73.21),
        )))
        .unwrap();
        assert_eq!(
            marker_at(&map, rect, Pos2::new(410.0, 300.0)).as_deref(),
            Some("marker-2")
        );
    }

    #[test]
    fn test_hit_rect_matches_icon() {
        let hit = marker_hit_rect(Pos2::new(100.0, 100.0));
        assert_eq!(hit.width(), MARKER_ICON_SIZE.0 as f32);
        assert_eq!(hit.height(), MARKER_ICON_SIZE.1 as f32);
        assert_eq!(hit.max.y, 100.0);
    }

    #[test]
    fn test_apply_view_reports_changes() {
        let (mut map, _) = map_with_marker();
        assert!(apply_view(&mut map, LatLng::new(42.71, -73.21), 14.0));
        assert!(!apply_view(&mut map, LatLng::new(42.71, -73.21), 14.0));
        assert!(!apply_view(&mut map, LatLng::new(95.0, 0.0), 14.0));
    }

    #[test]
    fn test_attribution_follows_map_options() {
        let widget = MapWidget::new();
        let (mut map, _) = map_with_marker();
        assert!(widget.attribution(&map).is_none());

        map.add_layer(Box::new(TileLayer::openstreetmap("tile-9".to_string())))
            .unwrap();
        assert!(widget
            .attribution(&map)
            .is_some_and(|text| text.contains("OpenStreetMap")));

        let options = MapOptions {
            attribution_control: false,
            ..Default::default()
        };
        let viewport = Viewport::new(LatLng::new(42.71, -73.21), 13.0, Point::new(800.0, 600.0));
        let mut quiet = Map::with_options(viewport, options);
        quiet
            .add_layer(Box::new(TileLayer::openstreetmap("tile-1".to_string())))
            .unwrap();
        assert!(widget.attribution(&quiet).is_none());

        let hidden = MapWidget::with_config(MapWidgetConfig {
            show_attribution: false,
            ..Default::default()
        });
        assert!(hidden.attribution(&map).is_none());
    }

    #[test]
    fn test_widget_defaults() {
        let widget = MapWidget::new();
        assert!(widget.config().interactive);
        assert!(widget.open_popup().is_none());
        assert_eq!(widget.loader().pending_count(), 0);
    }
}
