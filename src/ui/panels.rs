use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::RangeConstraint;
use crate::data::model::{CategoricalField, NumericField};
use crate::state::AppState;

/// Decimals kept by the non-integer range sliders.
const SLIDER_DECIMALS: usize = 2;

// ---------------------------------------------------------------------------
// Left side panel – introduction and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Earthquakes");
    ui.label(
        "Explore recorded earthquake events: narrow the dataset with the \
         filters below and every chart is redrawn from the matching rows.",
    );
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    ui.label(format!(
        "{} earthquakes across {} countries.",
        dataset.len(),
        dataset
            .unique_values
            .get(&CategoricalField::Country)
            .map_or(0, |c| c.len())
    ));

    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Filters");
        if ui
            .add_enabled(state.filters_active(), egui::Button::new("Reset filters"))
            .clicked()
        {
            state.reset_filters();
        }
    });
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .add_enabled(state.filters_active(), egui::Button::new("Keep only matching"))
            .on_hover_text("Make the matching earthquakes the whole dataset")
            .clicked()
        {
            state.keep_visible_only();
        }
        if state.narrowed && ui.button("Restore full dataset").clicked() {
            state.restore_full_dataset();
        }
    });

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Numeric ranges ----
            for field in NumericField::FILTERABLE {
                let Some((lo, hi)) = dataset.bounds(field) else {
                    continue;
                };
                let current = state
                    .spec
                    .ranges
                    .get(&field)
                    .copied()
                    .unwrap_or(RangeConstraint::new(lo, hi));
                if let Some((low, high)) = range_widget(ui, field, lo, hi, current) {
                    state.set_range(field, low, high);
                }
            }

            ui.separator();

            // ---- Categorical dropdowns ----
            for field in CategoricalField::ALL {
                let Some(values) = dataset.unique_values.get(&field) else {
                    continue;
                };
                if values.is_empty() {
                    continue;
                }
                let current = state.spec.categories.get(&field).cloned().flatten();
                let mut picked = current.clone();

                ui.strong(field.name());
                egui::ComboBox::from_id_salt(field.name())
                    .selected_text(current.as_deref().unwrap_or("All"))
                    .width(ui.available_width() * 0.9)
                    .show_ui(ui, |ui: &mut Ui| {
                        ui.selectable_value(&mut picked, None, "All");
                        for value in values {
                            ui.selectable_value(&mut picked, Some(value.clone()), value.as_str());
                        }
                    });

                if picked != current {
                    state.set_category(field, picked);
                }
            }
        });
}

/// Two sliders bounding one numeric field. Returns the new range when it changed.
fn range_widget(
    ui: &mut Ui,
    field: NumericField,
    lo: f64,
    hi: f64,
    current: RangeConstraint,
) -> Option<(f64, f64)> {
    let (mut low, mut high) = (current.low, current.high);
    let mut changed = false;

    ui.strong(field.name());
    let integer = field.is_integer();
    changed |= ui.add(bound_slider(&mut low, lo, hi, "min", integer)).changed();
    changed |= ui.add(bound_slider(&mut high, lo, hi, "max", integer)).changed();

    if !changed {
        return None;
    }
    let tolerance = if integer { 0.5 } else { 10f64.powi(-(SLIDER_DECIMALS as i32)) };
    low = snap_to_bounds(low, lo, hi, tolerance);
    high = snap_to_bounds(high, lo, hi, tolerance);
    // Dragging one handle past the other pushes the other along.
    if low > high {
        if low != current.low {
            high = low;
        } else {
            low = high;
        }
    }
    Some((low, high))
}

fn bound_slider<'a>(value: &'a mut f64, lo: f64, hi: f64, label: &str, integer: bool) -> egui::Slider<'a> {
    let slider = egui::Slider::new(value, lo..=hi).text(label);
    if integer {
        slider.integer()
    } else {
        slider.max_decimals(SLIDER_DECIMALS)
    }
}

/// Move a value within `tolerance` of either end of `lo..=hi` exactly onto
/// that end.
fn snap_to_bounds(value: f64, lo: f64, hi: f64, tolerance: f64) -> f64 {
    if (hi - value).abs() <= tolerance {
        hi
    } else if (value - lo).abs() <= tolerance {
        lo
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(!state.chart.is_no_data(), egui::Button::new("Export chart…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let source = state
                .source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!(
                "{source}: {} earthquakes loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ))
            .on_hover_text(ds.report.to_string());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open earthquake data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export chart")
        .set_file_name("chart.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export_chart(&path) {
            Ok(()) => {
                log::info!("Exported chart to {}", path.display());
                state.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to export chart: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
