use eframe::egui::{self, Color32, Ui};
use egui_plot::{Legend, MarkerShape, Plot, Points};

use crate::state::AppState;

/// "Guess the location" page: two sliders for the guess, the distance to
/// the hidden earthquake, and both points on a map.
pub fn game_page(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("New target").clicked() {
            state.new_game();
        }
    });

    let Some(game) = state.game.as_mut() else {
        ui.label("No earthquake to guess.");
        return;
    };

    let (mut lat, mut lon) = game.guess();
    let mut moved = ui
        .add(egui::Slider::new(&mut lat, -90.0..=90.0).step_by(0.1).text("Guess the latitude"))
        .changed();
    moved |= ui
        .add(egui::Slider::new(&mut lon, -180.0..=180.0).step_by(0.1).text("Guess the longitude"))
        .changed();
    if moved {
        game.set_guess(lat, lon);
    }

    ui.label(format!(
        "Distance to target: {:.2} degrees ({:.0} km)",
        game.distance_degrees(),
        game.distance_km()
    ));

    let (target_lat, target_lon) = game.target();
    let (guess_lat, guess_lon) = game.guess();
    let target_title = game.target_title.clone();

    Plot::new("guess_plot")
        .legend(Legend::default())
        .data_aspect(1.0)
        .include_x(-180.0)
        .include_x(180.0)
        .include_y(-90.0)
        .include_y(90.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(vec![[target_lon, target_lat]])
                    .shape(MarkerShape::Cross)
                    .radius(8.0)
                    .color(Color32::RED)
                    .name(format!("Actual location: {target_title}")),
            );
            plot_ui.points(
                Points::new(vec![[guess_lon, guess_lat]])
                    .shape(MarkerShape::Circle)
                    .filled(true)
                    .radius(6.0)
                    .color(Color32::from_rgb(70, 110, 230))
                    .name("Your guess"),
            );
        });
}
