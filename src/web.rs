//! Browser binding.
//!
//! Expects three elements in the page: `.map` (the container), `.map__select`
//! (an input or select whose "change" event filters markers) and
//! `.detect__location` (a button that recenters on the user).

use crate::{
    controller::{MapViewController, Notifier},
    core::{
        config::MapViewConfig,
        constants::{MARKER_ICON_ANCHOR, MARKER_ICON_SIZE},
        geo::Point,
    },
    data::issues::{parse_issues, SAMPLE_ISSUES_JSON},
    geolocation::provider_from_mode,
    layers::{base::LayerTrait, marker::Marker, tile::TileLayer},
    MapError,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, Element, Event};

/// `window.alert`
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn alert(&self, message: &str) {
        let shown = web_sys::window().map(|window| window.alert_with_message(message));
        if !matches!(shown, Some(Ok(()))) {
            log::warn!("could not show alert: {}", message);
        }
    }
}

fn js_error(error: MapError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn find(document: &Document, selector: &str) -> Result<Element, JsValue> {
    document
        .query_selector(selector)?
        .ok_or_else(|| JsValue::from_str(&format!("no element matches {}", selector)))
}

/// The `.map` container and what has been drawn into it
struct DomView {
    document: Document,
    container: Element,
}

impl DomView {
    fn render(&self, controller: &mut MapViewController) -> Result<(), JsValue> {
        let width = self.container.client_width() as f64;
        let height = self.container.client_height() as f64;
        if width > 0.0 && height > 0.0 {
            controller
                .map_mut()
                .viewport_mut()
                .set_size(Point::new(width, height));
        }

        self.container.set_inner_html("");
        self.container
            .set_attribute("style", "position: relative; overflow: hidden;")?;

        self.draw(controller)?;

        // Listeners run once per render
        let events = controller.map_mut().process_events();
        log::trace!("render drained {} map events", events.len());
        Ok(())
    }

    fn draw(&self, controller: &MapViewController) -> Result<(), JsValue> {
        let map = controller.map();
        let viewport = map.viewport();

        for layer in map.layers_of_type::<TileLayer>() {
            if !layer.is_visible() {
                continue;
            }
            for coord in layer.visible_tiles(viewport) {
                let (min, max) = viewport.tile_rect(&coord);
                let img = self.document.create_element("img")?;
                img.set_attribute("class", "map__tile")?;
                img.set_attribute("src", &layer.tile_url(coord))?;
                img.set_attribute("alt", "")?;
                img.set_attribute(
                    "style",
                    &format!(
                        "position: absolute; left: {:.0}px; top: {:.0}px; width: {:.0}px; height: {:.0}px; opacity: {};",
                        min.x,
                        min.y,
                        max.x - min.x,
                        max.y - min.y,
                        layer.opacity()
                    ),
                )?;
                self.container.append_child(&img)?;
            }
        }

        for marker in map.layers_of_type::<Marker>() {
            if marker.is_visible() {
                let pixel = viewport.lat_lng_to_pixel(&marker.position());
                self.container.append_child(&self.marker_element(marker, pixel)?)?;
            }
        }

        let attribution_layer = map
            .layers_of_type::<TileLayer>()
            .into_iter()
            .next()
            .filter(|_| map.options().attribution_control);
        if let Some(layer) = attribution_layer {
            let attribution = self.document.create_element("div")?;
            attribution.set_attribute("class", "map__attribution")?;
            attribution.set_attribute(
                "style",
                "position: absolute; right: 0; bottom: 0; padding: 0 4px; font-size: 11px; background: rgba(255, 255, 255, 0.7);",
            )?;
            attribution.set_inner_html(&layer.tile_options().attribution_html);
            self.container.append_child(&attribution)?;
        }

        Ok(())
    }

    fn marker_element(&self, marker: &Marker, pixel: Point) -> Result<Element, JsValue> {
        let element = self.document.create_element("div")?;
        element.set_attribute("class", "map__marker")?;
        element.set_attribute(
            "style",
            &format!(
                "position: absolute; left: {:.0}px; top: {:.0}px; width: {}px; height: {}px; cursor: pointer;",
                pixel.x - MARKER_ICON_ANCHOR.0 as f64,
                pixel.y - MARKER_ICON_ANCHOR.1 as f64,
                MARKER_ICON_SIZE.0,
                MARKER_ICON_SIZE.1
            ),
        )?;
        if let Some(popup) = marker.popup() {
            element.set_attribute("title", &popup.plain_text())?;
            element.set_attribute("data-popup", &popup.to_html())?;
        }
        Ok(element)
    }

    /// Shows the popup of the clicked marker above it
    fn open_popup(&self, marker: &Element) -> Result<(), JsValue> {
        let Some(html) = marker.get_attribute("data-popup") else {
            return Ok(());
        };
        if let Some(previous) = self.container.query_selector(".map__popup")? {
            previous.remove();
        }

        let style = marker.get_attribute("style").unwrap_or_default();
        let popup = self.document.create_element("div")?;
        popup.set_attribute("class", "map__popup")?;
        popup.set_attribute(
            "style",
            &format!(
                "{} width: auto; height: auto; transform: translate(-40%, -110%); background: white; padding: 6px 10px; border-radius: 4px; white-space: nowrap;",
                style
            ),
        )?;
        popup.set_inner_html(&html);
        self.container.append_child(&popup)?;
        Ok(())
    }
}

type Shared = Rc<RefCell<MapViewController>>;

/// Keeps the controller and the DOM listeners alive
#[wasm_bindgen]
pub struct IssueMapHandle {
    controller: Shared,
    view: Rc<DomView>,
    _listeners: Vec<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
impl IssueMapHandle {
    /// Same as a "change" event on the filter control
    pub fn filter(&self, query: &str) -> Result<(), JsValue> {
        let mut controller = self.controller.borrow_mut();
        controller.on_filter_changed(query).map_err(js_error)?;
        self.view.render(&mut controller)
    }

    /// Same as a click on the locate button
    pub fn locate(&self) {
        locate(self.controller.clone(), self.view.clone());
    }

    pub fn marker_count(&self) -> usize {
        self.controller.borrow().markers().len()
    }
}

fn locate(controller: Shared, view: Rc<DomView>) {
    let request = controller.borrow().on_locate_clicked();
    wasm_bindgen_futures::spawn_local(async move {
        let result = request.resolve().await;
        let mut controller = controller.borrow_mut();
        if let Err(e) = controller.handle_location_result(result) {
            log::warn!("could not apply location result: {}", e);
        }
        if let Err(e) = view.render(&mut controller) {
            log::warn!("render failed: {:?}", e);
        }
    });
}

fn listen(
    target: &Element,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<Closure<dyn FnMut(Event)>, JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    Ok(closure)
}

/// Builds the map from the sample issues and wires up the page controls.
///
/// `config_json` takes the same JSON as the native viewer's config file.
#[wasm_bindgen]
pub fn start(config_json: Option<String>) -> Result<IssueMapHandle, JsValue> {
    console_error_panic_hook::set_once();

    let config = match config_json {
        Some(json) => MapViewConfig::from_json_str(&json).map_err(js_error)?,
        None => MapViewConfig::default(),
    };
    let records = parse_issues(SAMPLE_ISSUES_JSON).map_err(js_error)?;
    let geolocation = provider_from_mode(&config.geolocation);

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let container = find(&document, ".map")?;
    let select = find(&document, ".map__select")?;
    let detect = find(&document, ".detect__location")?;

    let controller = MapViewController::new(config, records, Box::new(AlertNotifier), geolocation)
        .map_err(js_error)?;
    let controller: Shared = Rc::new(RefCell::new(controller));
    let view = Rc::new(DomView {
        document,
        container: container.clone(),
    });
    view.render(&mut controller.borrow_mut())?;

    let mut listeners = Vec::new();

    {
        let controller = controller.clone();
        let view = view.clone();
        listeners.push(listen(&select, "change", move |event: Event| {
            let query = event
                .target()
                .and_then(|target| js_sys::Reflect::get(&target, &JsValue::from_str("value")).ok())
                .and_then(|value| value.as_string())
                .unwrap_or_default();
            let mut controller = controller.borrow_mut();
            if let Err(e) = controller.on_filter_changed(&query) {
                log::warn!("filter failed: {}", e);
            }
            if let Err(e) = view.render(&mut controller) {
                log::warn!("render failed: {:?}", e);
            }
        })?);
    }

    {
        let controller = controller.clone();
        let view = view.clone();
        listeners.push(listen(&detect, "click", move |_event: Event| {
            locate(controller.clone(), view.clone());
        })?);
    }

    {
        let view = view.clone();
        listeners.push(listen(&container, "click", move |event: Event| {
            let marker = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .filter(|element| element.class_name() == "map__marker");
            if let Some(marker) = marker {
                if let Err(e) = view.open_popup(&marker) {
                    log::warn!("popup failed: {:?}", e);
                }
            }
        })?);
    }

    Ok(IssueMapHandle {
        controller,
        view,
        _listeners: listeners,
    })
}
