use std::f64::consts::PI;

use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};

use crate::charts::{
    project, ring_label_position, ring_segment, ChartKind, ChartSpec, GeoFrame, Point3, Series,
    SunburstSegment, AXES_3D, HISTOGRAM_FIELDS, SCATTER_AXES,
};
use crate::color::{generate_palette, scale_color, ValueBands};
use crate::data::aggregate::{DensityGrid, Histogram, BIN_RANGE};
use crate::data::model::{CategoricalField, NumericField};
use crate::state::{AppState, Summary, Tab};

/// Magnitude bands used to colour scatter points.
const MAGNITUDE_BANDS: usize = 6;

/// Seconds between animation frames of the map.
const FRAME_SECONDS: f64 = 0.8;

/// Ring radii of the sunburst.
const INNER_RING: (f64, f64) = (0.3, 0.65);
const OUTER_RING: (f64, f64) = (0.65, 1.0);

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the central panel: tabs, summary line and the selected page.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to explore earthquakes  (File → Open…)");
        });
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.tab, Tab::Charts, "Charts");
        ui.selectable_value(&mut state.tab, Tab::Records, "Records");
        ui.selectable_value(&mut state.tab, Tab::Game, "Guess the location");
        ui.separator();
        summary_line(ui, &state.summary);
    });
    ui.separator();

    match state.tab {
        Tab::Charts => chart_page(ui, state),
        Tab::Records => super::table::records_table(ui, state),
        Tab::Game => super::game::game_page(ui, state),
    }
}

fn summary_line(ui: &mut Ui, summary: &Summary) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "—".to_string(), |v| format!("{v:.2}"));
    ui.label(format!(
        "{} events · mean magnitude {} · max magnitude {} · mean depth {} km",
        summary.count,
        fmt(summary.mean_magnitude),
        fmt(summary.max_magnitude),
        fmt(summary.mean_depth),
    ));
}

fn chart_page(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for kind in ChartKind::ALL {
            if ui
                .selectable_label(state.chart_kind == kind, kind.title())
                .clicked()
            {
                state.set_chart_kind(kind);
            }
        }
    });
    chart_options(ui, state);
    ui.separator();

    ui.label(RichText::new(state.chart.title()).strong());
    match &state.chart {
        ChartSpec::NoData { .. } => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label("No earthquakes match the current filters.");
            });
        }
        ChartSpec::GeoScatter {
            frames,
            magnitude_range,
            ..
        } => {
            let shown: Vec<&GeoFrame> = match state.geo_frame {
                Some(i) => frames.get(i).into_iter().collect(),
                None => frames.iter().collect(),
            };
            geo_plot(ui, &shown, *magnitude_range);
        }
        ChartSpec::Scatter { x, y, series, .. } => scatter_plot(ui, state, *x, *y, series),
        ChartSpec::Histogram { histogram, .. } => histogram_plot(ui, histogram),
        ChartSpec::Scatter3d {
            axes,
            magnitude_range,
            points,
            ..
        } => scatter_3d_plot(ui, *axes, *magnitude_range, points, state.yaw, state.pitch),
        ChartSpec::Sunburst {
            segments, missing, ..
        } => sunburst_plot(ui, segments, *missing),
        ChartSpec::DensityContour { grid, .. } => density_plot(ui, grid),
        ChartSpec::CumulativeCount { points, .. } => cumulative_plot(ui, points),
    }
}

// ---------------------------------------------------------------------------
// Per-chart option rows
// ---------------------------------------------------------------------------

fn chart_options(ui: &mut Ui, state: &mut AppState) {
    let mut options = state.chart_options.clone();
    let mut color_by = options.color_by;

    ui.horizontal_wrapped(|ui: &mut Ui| match state.chart_kind {
        ChartKind::GeoScatter => geo_controls(ui, state),
        ChartKind::Scatter => {
            field_combo(ui, "scatter_x", "x", &mut options.scatter_x, &SCATTER_AXES);
            field_combo(ui, "scatter_y", "y", &mut options.scatter_y, &SCATTER_AXES);
            ui.label("color");
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(color_by.name())
                .show_ui(ui, |ui: &mut Ui| {
                    for field in CategoricalField::ALL {
                        ui.selectable_value(&mut color_by, field, field.name());
                    }
                });
        }
        ChartKind::Histogram => {
            field_combo(ui, "hist_field", "field", &mut options.histogram_field, &HISTOGRAM_FIELDS);
            ui.add(egui::Slider::new(&mut options.histogram_bins, BIN_RANGE).text("bins"));
        }
        ChartKind::Scatter3d => {
            for (k, label) in ["x", "y", "z"].into_iter().enumerate() {
                field_combo(ui, &format!("axis3d_{k}"), label, &mut options.axes_3d[k], &AXES_3D);
            }
            ui.add(egui::Slider::new(&mut state.yaw, -PI..=PI).text("yaw"));
            ui.add(egui::Slider::new(&mut state.pitch, -1.5..=1.5).text("pitch"));
        }
        ChartKind::DensityContour => {
            field_combo(ui, "density_x", "x", &mut options.density_x, &SCATTER_AXES);
            field_combo(ui, "density_y", "y", &mut options.density_y, &SCATTER_AXES);
            ui.add(egui::Slider::new(&mut options.density_cells, 5..=60).text("cells"));
        }
        ChartKind::Sunburst | ChartKind::CumulativeCount => {}
    });

    if color_by != state.chart_options.color_by {
        state.set_color_by(color_by);
        options.color_by = color_by;
    }
    if options != state.chart_options {
        state.chart_options = options;
        state.rebuild_chart();
    }
}

fn field_combo(ui: &mut Ui, id: &str, label: &str, value: &mut NumericField, allowed: &[NumericField]) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.name())
        .show_ui(ui, |ui: &mut Ui| {
            for &field in allowed {
                ui.selectable_value(value, field, field.name());
            }
        });
}

fn geo_controls(ui: &mut Ui, state: &mut AppState) {
    let ChartSpec::GeoScatter { frames, .. } = &state.chart else {
        return;
    };
    let years: Vec<i32> = frames.iter().map(|f| f.year).collect();
    if years.is_empty() {
        return;
    }

    let mut all_years = state.geo_frame.is_none();
    if ui.checkbox(&mut all_years, "All years").changed() {
        state.geo_frame = if all_years { None } else { Some(0) };
        state.playing = false;
    }

    if let Some(mut frame) = state.geo_frame {
        let slider = egui::Slider::new(&mut frame, 0..=years.len() - 1)
            .custom_formatter(|v, _| years.get(v as usize).map(|y| y.to_string()).unwrap_or_default())
            .text("year");
        if ui.add(slider).changed() {
            state.geo_frame = Some(frame);
        }
        let label = if state.playing { "⏸ Pause" } else { "▶ Play" };
        if ui.button(label).clicked() {
            state.playing = !state.playing;
        }
    }

    if state.playing {
        let now = ui.ctx().input(|i| i.time);
        if now - state.last_step_at >= FRAME_SECONDS {
            state.step_geo_frame();
            state.last_step_at = now;
        }
        ui.ctx()
            .request_repaint_after(std::time::Duration::from_secs_f64(FRAME_SECONDS));
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Points grouped into magnitude bands, one coloured series per band.
fn banded_points(
    plot_ui: &mut egui_plot::PlotUi,
    points: impl Iterator<Item = ([f64; 2], f64)>,
    magnitude_range: (f64, f64),
) {
    let bands = ValueBands::new(magnitude_range.0, magnitude_range.1, MAGNITUDE_BANDS);
    let mut grouped: Vec<Vec<[f64; 2]>> = vec![Vec::new(); bands.n];
    for (xy, magnitude) in points {
        grouped[bands.band_of(magnitude)].push(xy);
    }
    for (i, pts) in grouped.into_iter().enumerate() {
        if pts.is_empty() {
            continue;
        }
        let (a, b) = bands.bounds(i);
        plot_ui.points(
            Points::new(pts)
                .radius(2.0 + i as f32)
                .filled(true)
                .color(bands.color(i))
                .name(format!("M {a:.1}–{b:.1}")),
        );
    }
}

fn geo_plot(ui: &mut Ui, frames: &[&GeoFrame], magnitude_range: (f64, f64)) {
    Plot::new("geo_plot")
        .legend(Legend::default())
        .data_aspect(1.0)
        .include_x(-180.0)
        .include_x(180.0)
        .include_y(-90.0)
        .include_y(90.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            let points = frames
                .iter()
                .flat_map(|f| f.points.iter())
                .map(|p| ([p.longitude, p.latitude], p.magnitude));
            banded_points(plot_ui, points, magnitude_range);
        });
}

fn scatter_plot(ui: &mut Ui, state: &AppState, x: NumericField, y: NumericField, series: &[Series]) {
    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(x.name())
        .y_axis_label(y.name())
        .show(ui, |plot_ui| {
            for s in series {
                let color = state
                    .color_map
                    .as_ref()
                    .map(|cm| cm.color_for(&s.label))
                    .unwrap_or(Color32::LIGHT_BLUE);
                plot_ui.points(
                    Points::new(s.points.clone())
                        .radius(3.0)
                        .filled(true)
                        .color(color)
                        .name(&s.label),
                );
            }
        });
}

fn histogram_plot(ui: &mut Ui, histogram: &Histogram) {
    let width = histogram.bin_width();
    let bars: Vec<Bar> = histogram
        .counts
        .iter()
        .zip(histogram.edges.windows(2))
        .map(|(&n, edge)| {
            Bar::new((edge[0] + edge[1]) / 2.0, n as f64)
                .width(width)
                .name(format!("{:.2} – {:.2}", edge[0], edge[1]))
        })
        .collect();

    Plot::new("histogram_plot")
        .x_axis_label(histogram.field.name())
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::from_rgb(90, 140, 220)));
        });
}

fn scatter_3d_plot(
    ui: &mut Ui,
    axes: [NumericField; 3],
    magnitude_range: (f64, f64),
    points: &[Point3],
    yaw: f64,
    pitch: f64,
) {
    Plot::new("scatter_3d_plot")
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .include_x(-1.6)
        .include_x(1.6)
        .include_y(-1.6)
        .include_y(1.6)
        .show(ui, |plot_ui| {
            // Axis lines from the cube centre.
            for (k, field) in axes.into_iter().enumerate() {
                let mut tip = [0.0; 3];
                tip[k] = if field == NumericField::Depth { -1.2 } else { 1.2 };
                let end = project(tip, yaw, pitch);
                plot_ui.line(
                    Line::new(PlotPoints::from(vec![project([0.0; 3], yaw, pitch), end]))
                        .color(Color32::GRAY)
                        .width(1.0),
                );
                plot_ui.text(Text::new(PlotPoint::new(end[0], end[1]), field.name()).color(Color32::GRAY));
            }
            let projected = points
                .iter()
                .map(|p| (project(p.position, yaw, pitch), p.magnitude));
            banded_points(plot_ui, projected, magnitude_range);
        });
}

fn sunburst_plot(ui: &mut Ui, segments: &[SunburstSegment], missing: usize) {
    let inner: Vec<&SunburstSegment> = segments.iter().filter(|s| s.ring == 0).collect();
    let palette = generate_palette(inner.len());
    let parent_color = |label: &str| {
        inner
            .iter()
            .position(|s| s.label == label)
            .and_then(|i| palette.get(i).copied())
            .unwrap_or(Color32::GRAY)
    };

    if missing > 0 {
        ui.label(format!("{missing} events without continent or country are not shown."));
    }

    Plot::new("sunburst_plot")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .include_x(-1.1)
        .include_x(1.1)
        .include_y(-1.1)
        .include_y(1.1)
        .show(ui, |plot_ui| {
            for seg in segments {
                let (r0, r1, color) = match &seg.parent {
                    None => (INNER_RING.0, INNER_RING.1, parent_color(&seg.label)),
                    Some(parent) => (
                        OUTER_RING.0,
                        OUTER_RING.1,
                        parent_color(parent).gamma_multiply(0.7),
                    ),
                };
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(ring_segment(seg.start, seg.end, r0, r1)))
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, Color32::from_gray(25)))
                        .name(format!("{} ({})", seg.label, seg.count)),
                );
                if seg.end - seg.start > 0.03 {
                    let [x, y] = ring_label_position(seg.start, seg.end, r0, r1);
                    plot_ui.text(Text::new(PlotPoint::new(x, y), seg.label.as_str()).color(Color32::WHITE));
                }
            }
        });
}

fn density_plot(ui: &mut Ui, grid: &DensityGrid) {
    Plot::new("density_plot")
        .x_axis_label(grid.x.name())
        .y_axis_label(grid.y.name())
        .show(ui, |plot_ui| {
            for (row, counts) in grid.counts.iter().enumerate() {
                for (col, &n) in counts.iter().enumerate() {
                    if n == 0 {
                        continue;
                    }
                    let (x0, x1) = (grid.x_edges[col], grid.x_edges[col + 1]);
                    let (y0, y1) = (grid.y_edges[row], grid.y_edges[row + 1]);
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]))
                            .fill_color(scale_color(n as f64, 0.0, grid.peak as f64))
                            .stroke(Stroke::NONE),
                    );
                }
            }
        });
}

fn cumulative_plot(ui: &mut Ui, points: &[(i32, usize)]) {
    let line: PlotPoints = points
        .iter()
        .map(|&(year, n)| [f64::from(year), n as f64])
        .collect();
    Plot::new("cumulative_plot")
        .x_axis_label("year")
        .y_axis_label("earthquakes")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(line).width(2.0).color(Color32::from_rgb(220, 80, 60)));
        });
}
