mod app;
mod cache;
mod charts;
mod color;
mod config;
mod data;
mod error;
mod game;
mod state;
mod ui;

use app::QuakeLensApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::from_env();
    log::debug!("starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Quake Lens – Earthquake Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(QuakeLensApp::new(config)))),
    )
}
