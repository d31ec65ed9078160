use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use issuemap::{
    controller::{LocationResult, MapViewController, Notifier, ViewState},
    data::issues::{InlineIssueSource, Issue, IssueSource},
    geolocation::provider_from_mode,
    ui::widget::MapWidget,
    MapViewConfig,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

const CONFIG_FILE: &str = "issuemap.json";

/// Standalone issue map viewer
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MapViewConfig::load_or_default(CONFIG_FILE)
        .with_context(|| format!("could not load {}", CONFIG_FILE))?;
    let records = InlineIssueSource::default()
        .fetch_issues()
        .await
        .context("could not load issues")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.size.x as f32, config.size.y as f32])
            .with_title("Issue Map"),
        ..Default::default()
    };

    let app = IssueMapApp::new(config, records, tokio::runtime::Handle::current())?;
    eframe::run_native("issuemap-app", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|e| anyhow::anyhow!("viewer exited with an error: {}", e))?;

    Ok(())
}

/// Queues alerts for the modal window
#[derive(Clone, Default)]
struct ModalNotifier {
    queue: Rc<RefCell<VecDeque<String>>>,
}

impl Notifier for ModalNotifier {
    fn alert(&self, message: &str) {
        log::warn!("{}", message);
        self.queue.borrow_mut().push_back(message.to_string());
    }
}

struct IssueMapApp {
    controller: MapViewController,
    widget: MapWidget,
    runtime: tokio::runtime::Handle,
    alerts: ModalNotifier,
    filter_text: String,
    /// Last filter value handed to the controller
    committed_filter: String,
    locating: bool,
    location_tx: Sender<LocationResult>,
    location_rx: Receiver<LocationResult>,
}

impl IssueMapApp {
    fn new(
        config: MapViewConfig,
        records: Vec<Issue>,
        runtime: tokio::runtime::Handle,
    ) -> anyhow::Result<Self> {
        let alerts = ModalNotifier::default();
        let geolocation = provider_from_mode(&config.geolocation);
        let controller =
            MapViewController::new(config, records, Box::new(alerts.clone()), geolocation)
                .context("could not initialize the map")?;
        let (location_tx, location_rx) = crossbeam_channel::unbounded();

        Ok(Self {
            controller,
            widget: MapWidget::new(),
            runtime,
            alerts,
            filter_text: String::new(),
            committed_filter: String::new(),
            locating: false,
            location_tx,
            location_rx,
        })
    }

    fn locate(&mut self, ctx: &egui::Context) {
        let ctx = ctx.clone();
        self.locating = true;
        self.controller.on_locate_clicked().spawn_on(
            &self.runtime,
            self.location_tx.clone(),
            move || ctx.request_repaint(),
        );
    }

    fn apply_location_results(&mut self) {
        while let Ok(result) = self.location_rx.try_recv() {
            self.locating = false;
            if let Err(e) = self.controller.handle_location_result(result) {
                log::error!("could not apply location: {}", e);
            }
        }
    }

    fn commit_filter(&mut self) {
        if self.filter_text == self.committed_filter {
            return;
        }
        self.committed_filter = self.filter_text.clone();
        if let Err(e) = self.controller.on_filter_changed(&self.committed_filter) {
            log::error!("filter failed: {}", e);
        }
        self.widget.close_popup();
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Filter:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.filter_text)
                    .hint_text("issue name")
                    .desired_width(200.0),
            );
            // Commit like an HTML "change" event: on Enter or when focus leaves
            if response.lost_focus() {
                self.commit_filter();
            }

            ui.separator();

            let button = ui.add_enabled(!self.locating, egui::Button::new("Detect location"));
            if button.clicked() {
                self.locate(ui.ctx());
            }
            if self.locating {
                ui.spinner();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let viewport = self.controller.map().viewport();
                let centered_on = match self.controller.view_state() {
                    ViewState::DefaultCentered => "default view",
                    ViewState::UserCentered => "your location",
                };
                ui.label(format!(
                    "{} issues | {} | {:.4}, {:.4} @ {:.1}",
                    self.controller.markers().len(),
                    centered_on,
                    viewport.center.lat,
                    viewport.center.lng,
                    viewport.zoom
                ));
            });
        });
    }

    fn alert_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alerts.queue.borrow().front().cloned() else {
            return;
        };

        let mut acknowledged = false;
        egui::Window::new("Location unavailable")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    acknowledged = true;
                }
            });

        if acknowledged {
            self.alerts.queue.borrow_mut().pop_front();
        }
    }
}

impl eframe::App for IssueMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_location_results();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        let modal_open = !self.alerts.queue.borrow().is_empty();
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| {
                    let response = self.widget.show(ui, self.controller.map_mut());
                    for event in &response.events {
                        log::trace!("map event: {:?}", event);
                    }
                });
            });

        self.alert_window(ctx);
    }
}
