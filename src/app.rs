use eframe::egui;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct QuakeLensApp {
    pub state: AppState,
}

impl QuakeLensApp {
    /// Build the app and load the configured data file, if present.
    pub fn new(config: AppConfig) -> Self {
        let mut state = AppState::new(config);
        state.load_default();
        Self { state }
    }
}

impl eframe::App for QuakeLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: introduction and filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts, records, game ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::central_panel(ui, &mut self.state);
        });
    }
}
