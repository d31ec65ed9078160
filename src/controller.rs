//! The map view controller.
//!
//! Owns the map, the working list of issues and the geolocation provider.
//! Front ends forward UI events here and draw whatever layers the map holds.

use crate::{
    core::{
        config::{FallbackPolicy, MapViewConfig},
        map::Map,
    },
    data::issues::{Issue, IssueSet},
    geolocation::{GeolocationError, GeolocationProvider, Position},
    input::events::{ControlEvent, MapEvent},
    layers::{base::LayerType, marker::Marker, tile::TileLayer},
    Result,
};
use std::sync::Arc;

/// Shows a message the user has to acknowledge
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Writes alerts to the log instead of showing them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        log::warn!("alert: {}", message);
    }
}

/// Where the viewport is currently centered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    DefaultCentered,
    UserCentered,
}

/// A pending position lookup.
///
/// Holds its own handle on the provider so it can be awaited without
/// borrowing the controller; feed the outcome back through
/// [`MapViewController::handle_location_result`].
#[must_use = "a locate request does nothing until resolved"]
pub struct LocateRequest {
    provider: Arc<dyn GeolocationProvider>,
}

/// Outcome of a position lookup
pub type LocationResult = std::result::Result<Position, GeolocationError>;

impl LocateRequest {
    pub async fn resolve(self) -> LocationResult {
        self.provider.current_position().await
    }

    /// Runs the lookup on `runtime` and sends the outcome to `results`,
    /// then calls `on_done` (typically a repaint request)
    #[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
    pub fn spawn_on<F>(
        self,
        runtime: &tokio::runtime::Handle,
        results: crossbeam_channel::Sender<LocationResult>,
        on_done: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        runtime.spawn(async move {
            let result = self.resolve().await;
            if results.send(result).is_err() {
                log::debug!("location result dropped, receiver is gone");
            }
            on_done();
        })
    }
}

pub struct MapViewController {
    config: MapViewConfig,
    map: Map,
    records: IssueSet,
    notifier: Box<dyn Notifier>,
    geolocation: Arc<dyn GeolocationProvider>,
    view_state: ViewState,
}

impl MapViewController {
    /// Builds the map and shows the default view with every record as a marker
    pub fn new(
        config: MapViewConfig,
        records: impl Into<IssueSet>,
        notifier: Box<dyn Notifier>,
        geolocation: Arc<dyn GeolocationProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let view = config.default_view;
        let mut controller = Self {
            map: Map::new(view.center, view.zoom, config.size),
            config,
            records: records.into(),
            notifier,
            geolocation,
            view_state: ViewState::DefaultCentered,
        };
        controller.show_default_view()?;
        log::info!(
            "map initialized with {} issues",
            controller.records.len()
        );
        Ok(controller)
    }

    /// Default center and zoom, a fresh tile layer, and the working list on top
    pub fn show_default_view(&mut self) -> Result<()> {
        self.reset_view()?;
        self.add_tile_layer()?;
        self.render_working_list()
    }

    fn reset_view(&mut self) -> Result<()> {
        let view = self.config.default_view;
        self.map.set_view(view.center, view.zoom)?;
        self.view_state = ViewState::DefaultCentered;
        Ok(())
    }

    fn add_tile_layer(&mut self) -> Result<()> {
        let id = self.map.next_layer_id("tile");
        let layer = TileLayer::with_options(
            id,
            "OpenStreetMap".to_string(),
            self.config.tile_layer.clone(),
        );
        self.map.add_layer(Box::new(layer))
    }

    /// Adds one marker per issue, each with a name/status popup
    pub fn render_markers(&mut self, issues: &[Issue]) -> Result<()> {
        for issue in issues {
            let id = self.map.next_layer_id("marker");
            let marker = Marker::new(id, issue.position()).with_popup(issue.popup());
            self.map.add_layer(Box::new(marker))?;
        }
        log::debug!("rendered {} markers", issues.len());
        Ok(())
    }

    fn render_working_list(&mut self) -> Result<()> {
        let issues = self.records.as_slice().to_vec();
        self.render_markers(&issues)
    }

    /// Removes every marker, leaving tile layers in place. Returns how many went.
    pub fn clear_markers(&mut self) -> usize {
        self.map.remove_layers_of_type(LayerType::Marker)
    }

    /// Narrows the working list to names containing `query` and redraws the
    /// markers. An empty query redraws the list as it is.
    pub fn apply_filter(&mut self, query: &str) -> Result<()> {
        let remaining = self.records.filter_by_name(query, self.config.filter_case);
        log::debug!("filter {:?} leaves {} issues", query, remaining);
        self.clear_markers();
        self.render_working_list()
    }

    pub fn on_filter_changed(&mut self, query: &str) -> Result<()> {
        self.apply_filter(query)
    }

    /// Starts a position lookup; resolve it off the UI thread if need be
    pub fn on_locate_clicked(&self) -> LocateRequest {
        log::info!("locating user");
        LocateRequest {
            provider: Arc::clone(&self.geolocation),
        }
    }

    /// Centers on `position` at the user zoom. Markers stay as they are.
    pub fn on_location_found(&mut self, position: Position) -> Result<()> {
        let center = position.lat_lng();
        if !center.is_valid() {
            return self.on_location_error(GeolocationError::unavailable(format!(
                "provider reported out-of-range coordinates {}",
                center
            )));
        }

        self.map.set_view(center, self.config.user_zoom)?;
        self.view_state = ViewState::UserCentered;
        self.map.emit(MapEvent::LocationFound { position: center });
        log::info!("centered on user at {}", center);
        Ok(())
    }

    /// Alerts once, then falls back to the default view
    pub fn on_location_error(&mut self, error: GeolocationError) -> Result<()> {
        log::warn!("geolocation failed: {}", error);
        self.notifier.alert(&self.config.geolocation_failed_message);
        self.map.emit(MapEvent::LocationError {
            message: error.to_string(),
        });

        match self.config.fallback_policy {
            FallbackPolicy::Replay => self.show_default_view(),
            FallbackPolicy::Reset => {
                self.reset_view()?;
                self.clear_markers();
                if self.map.count_layers_of_type(LayerType::Tile) == 0 {
                    self.add_tile_layer()?;
                }
                self.render_working_list()
            }
        }
    }

    pub fn handle_location_result(&mut self, result: LocationResult) -> Result<()> {
        match result {
            Ok(position) => self.on_location_found(position),
            Err(error) => self.on_location_error(error),
        }
    }

    /// Looks the user up and applies the outcome in one go
    pub async fn recenter_on_user_location(&mut self) -> Result<()> {
        let result = self.on_locate_clicked().resolve().await;
        self.handle_location_result(result)
    }

    /// Applies a UI event. `LocateClicked` hands back the lookup to run.
    pub fn handle_control_event(&mut self, event: ControlEvent) -> Result<Option<LocateRequest>> {
        match event {
            ControlEvent::FilterChanged(query) => {
                self.on_filter_changed(&query)?;
                Ok(None)
            }
            ControlEvent::LocateClicked => Ok(Some(self.on_locate_clicked())),
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    /// The working list
    pub fn records(&self) -> &IssueSet {
        &self.records
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    pub fn markers(&self) -> Vec<&Marker> {
        self.map.layers_of_type::<Marker>()
    }

    pub fn tile_layers(&self) -> Vec<&TileLayer> {
        self.map.layers_of_type::<TileLayer>()
    }

    pub fn config(&self) -> &MapViewConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FilterCase;
    use crate::core::geo::LatLng;
    use crate::data::issues::sample_issues;
    use crate::geolocation::FixedGeolocation;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Alerts(Rc<RefCell<Vec<String>>>);

    impl Notifier for Alerts {
        fn alert(&self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }
    }

    fn controller_with(
        config: MapViewConfig,
        geolocation: FixedGeolocation,
    ) -> (MapViewController, Alerts) {
        let alerts = Alerts::default();
        let controller = MapViewController::new(
            config,
            sample_issues().unwrap(),
            Box::new(alerts.clone()),
            Arc::new(geolocation),
        )
        .unwrap();
        (controller, alerts)
    }

    fn marker_names(controller: &MapViewController) -> Vec<String> {
        controller
            .markers()
            .iter()
            .map(|m| m.popup().map(|p| p.title().to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_initialize() {
        let (controller, alerts) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7, -73.2)),
        );

        assert_eq!(controller.view_state(), ViewState::DefaultCentered);
        assert_eq!(controller.map().viewport().center, LatLng::new(37.0902, -95.7129));
        assert_eq!(controller.map().viewport().zoom, 5.0);
        assert_eq!(controller.tile_layers().len(), 1);
        assert_eq!(marker_names(&controller), vec!["Grafitti", "Abandoned Vehicles"]);
        assert!(alerts.0.borrow().is_empty());
    }

    #[test]
    fn test_filter_redraws_markers() {
        let (mut controller, _) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7, -73.2)),
        );

        controller.apply_filter("graf").unwrap();
        assert_eq!(marker_names(&controller), vec!["Grafitti"]);
        assert_eq!(controller.records().len(), 1);

        controller.apply_filter("").unwrap();
        assert_eq!(marker_names(&controller), vec!["Grafitti"]);
        assert_eq!(controller.tile_layers().len(), 1);
    }

    #[test]
    fn test_case_insensitive_filter_option() {
        let config = MapViewConfig {
            filter_case: FilterCase::Insensitive,
            ..Default::default()
        };
        let (mut controller, _) =
            controller_with(config, FixedGeolocation::at(Position::new(42.7, -73.2)));

        controller.apply_filter("ABANDONED").unwrap();
        assert_eq!(marker_names(&controller), vec!["Abandoned Vehicles"]);
    }

    #[test]
    fn test_clear_markers_keeps_tiles() {
        let (mut controller, _) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7, -73.2)),
        );

        assert_eq!(controller.clear_markers(), 2);
        assert!(controller.markers().is_empty());
        assert_eq!(controller.tile_layers().len(), 1);
        assert_eq!(controller.clear_markers(), 0);
    }

    #[test]
    fn test_located_user_keeps_markers() {
        let (mut controller, alerts) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7284, -73.6918)),
        );
        controller.map_mut().process_events();

        block_on(controller.recenter_on_user_location()).unwrap();

        assert_eq!(controller.view_state(), ViewState::UserCentered);
        assert_eq!(controller.map().viewport().center, LatLng::new(42.7284, -73.6918));
        assert_eq!(controller.map().viewport().zoom, 13.0);
        assert_eq!(controller.markers().len(), 2);
        assert!(alerts.0.borrow().is_empty());

        let events = controller.map_mut().process_events();
        assert!(events.contains(&MapEvent::LocationFound {
            position: LatLng::new(42.7284, -73.6918)
        }));
    }

    #[test]
    fn test_replay_fallback_stacks_layers() {
        let (mut controller, alerts) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::failing(GeolocationError::permission_denied("User denied Geolocation")),
        );
        controller.on_location_found(Position::new(42.7, -73.2)).unwrap();

        block_on(controller.recenter_on_user_location()).unwrap();

        assert_eq!(alerts.0.borrow().len(), 1);
        assert_eq!(
            alerts.0.borrow()[0],
            "Failed to get your coordinates, check your browser geolocation permissions and try again"
        );
        assert_eq!(controller.view_state(), ViewState::DefaultCentered);
        assert_eq!(controller.map().viewport().center, LatLng::new(37.0902, -95.7129));
        assert_eq!(controller.map().viewport().zoom, 5.0);
        assert_eq!(controller.tile_layers().len(), 2);
        assert_eq!(controller.markers().len(), 4);
    }

    #[test]
    fn test_reset_fallback_keeps_single_copies() {
        let config = MapViewConfig {
            fallback_policy: FallbackPolicy::Reset,
            ..Default::default()
        };
        let (mut controller, alerts) = controller_with(
            config,
            FixedGeolocation::failing(GeolocationError::timeout("timed out")),
        );

        block_on(controller.recenter_on_user_location()).unwrap();
        block_on(controller.recenter_on_user_location()).unwrap();

        assert_eq!(alerts.0.borrow().len(), 2);
        assert_eq!(controller.tile_layers().len(), 1);
        assert_eq!(controller.markers().len(), 2);
    }

    #[test]
    fn test_log_notifier_fallback() {
        let mut controller = MapViewController::new(
            MapViewConfig::default(),
            sample_issues().unwrap(),
            Box::new(LogNotifier),
            Arc::new(FixedGeolocation::failing(GeolocationError::unavailable("no fix"))),
        )
        .unwrap();

        block_on(controller.recenter_on_user_location()).unwrap();
        assert_eq!(controller.view_state(), ViewState::DefaultCentered);
        assert_eq!(controller.markers().len(), 4);
    }

    #[test]
    fn test_out_of_range_position_is_a_failure() {
        let (mut controller, alerts) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7, -73.2)),
        );

        controller.on_location_found(Position::new(123.0, 0.0)).unwrap();
        assert_eq!(alerts.0.borrow().len(), 1);
        assert_eq!(controller.view_state(), ViewState::DefaultCentered);
    }

    #[test]
    fn test_control_events() {
        let (mut controller, _) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::at(Position::new(42.7, -73.2)),
        );

        let request = controller
            .handle_control_event(ControlEvent::FilterChanged("vehic".to_string()))
            .unwrap();
        assert!(request.is_none());
        assert_eq!(marker_names(&controller), vec!["Abandoned Vehicles"]);

        let request = controller
            .handle_control_event(ControlEvent::LocateClicked)
            .unwrap()
            .unwrap();
        let result = block_on(request.resolve());
        controller.handle_location_result(result).unwrap();
        assert_eq!(controller.view_state(), ViewState::UserCentered);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_spawned_lookup_reports_back() {
        let (mut controller, alerts) = controller_with(
            MapViewConfig::default(),
            FixedGeolocation::failing(GeolocationError::unavailable("no fix")),
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = Arc::clone(&done);
        controller
            .on_locate_clicked()
            .spawn_on(&tokio::runtime::Handle::current(), tx, move || {
                flag.store(true, std::sync::atomic::Ordering::SeqCst)
            })
            .await
            .unwrap();

        assert!(done.load(std::sync::atomic::Ordering::SeqCst));
        controller.handle_location_result(rx.try_recv().unwrap()).unwrap();
        assert_eq!(alerts.0.borrow().len(), 1);
    }
}
