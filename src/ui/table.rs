use eframe::egui::{Align, Layout, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

/// Scrollable table of the records in the current view.
pub fn records_table(ui: &mut Ui, state: &AppState) {
    let Some(ds) = &state.dataset else {
        return;
    };
    let rows = &state.visible_indices;
    if rows.is_empty() {
        ui.label("No earthquakes match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder().at_least(200.0))
        .columns(Column::auto().at_least(60.0), 5)
        .header(20.0, |mut header| {
            for title in ["date", "title", "magnitude", "depth", "alert", "continent", "country"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let rec = &ds.records[rows[row.index()]];
                row.col(|ui: &mut Ui| {
                    ui.label(rec.date_time.as_str());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(rec.title.as_str());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(format!("{:.1}", rec.magnitude));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(format!("{:.1}", rec.depth));
                });
                for value in [&rec.alert, &rec.continent, &rec.country] {
                    row.col(|ui: &mut Ui| {
                        ui.label(value.as_deref().unwrap_or("—"));
                    });
                }
            });
        });
}
