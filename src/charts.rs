//! Chart builders: pure functions from a [`FilteredView`] plus column choices
//! to a serialisable [`ChartSpec`]. Drawing lives in `ui::plot`.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use serde::Serialize;

use crate::data::aggregate::{
    cumulative_by_year, density_grid, frames_by_year, grouped_path, histogram, max, min, DensityGrid,
    Histogram, BIN_RANGE,
};
use crate::data::filter::FilteredView;
use crate::data::model::{CategoricalField, NumericField};
use crate::error::FieldNotFound;

/// Legend label for records whose category is missing.
pub const MISSING_LABEL: &str = "(missing)";

/// Axis choices offered for the 2D scatter and density charts.
pub const SCATTER_AXES: [NumericField; 5] = [
    NumericField::Magnitude,
    NumericField::Depth,
    NumericField::Gap,
    NumericField::Dmin,
    NumericField::Sig,
];

pub const HISTOGRAM_FIELDS: [NumericField; 6] = [
    NumericField::Magnitude,
    NumericField::Depth,
    NumericField::Gap,
    NumericField::Dmin,
    NumericField::Sig,
    NumericField::Nst,
];

pub const AXES_3D: [NumericField; 4] = [
    NumericField::Longitude,
    NumericField::Latitude,
    NumericField::Depth,
    NumericField::Magnitude,
];

// ---------------------------------------------------------------------------
// Chart selection and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    GeoScatter,
    Scatter,
    Histogram,
    Scatter3d,
    Sunburst,
    DensityContour,
    CumulativeCount,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::GeoScatter,
        ChartKind::Scatter,
        ChartKind::Histogram,
        ChartKind::Scatter3d,
        ChartKind::Sunburst,
        ChartKind::DensityContour,
        ChartKind::CumulativeCount,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::GeoScatter => "Map over time",
            ChartKind::Scatter => "Scatter",
            ChartKind::Histogram => "Histogram",
            ChartKind::Scatter3d => "3D scatter",
            ChartKind::Sunburst => "Continent / country",
            ChartKind::DensityContour => "Density",
            ChartKind::CumulativeCount => "Cumulative count",
        }
    }
}

/// Column choices for every chart. Axis fields are restricted to the allow-lists above.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub scatter_x: NumericField,
    pub scatter_y: NumericField,
    pub color_by: CategoricalField,
    pub histogram_field: NumericField,
    pub histogram_bins: usize,
    pub axes_3d: [NumericField; 3],
    pub density_x: NumericField,
    pub density_y: NumericField,
    pub density_cells: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            scatter_x: NumericField::Magnitude,
            scatter_y: NumericField::Depth,
            color_by: CategoricalField::Continent,
            histogram_field: NumericField::Magnitude,
            histogram_bins: 20,
            axes_3d: [NumericField::Longitude, NumericField::Latitude, NumericField::Depth],
            density_x: NumericField::Magnitude,
            density_y: NumericField::Depth,
            density_cells: 25,
        }
    }
}

impl ChartOptions {
    pub fn set_histogram_bins(&mut self, bins: usize) {
        self.histogram_bins = bins.clamp(*BIN_RANGE.start(), *BIN_RANGE.end());
    }

    /// Choose scatter axes by column name; both must be in [`SCATTER_AXES`].
    pub fn set_scatter_axes(&mut self, x: &str, y: &str) -> Result<(), FieldNotFound> {
        let (x, y) = (pick(x, &SCATTER_AXES)?, pick(y, &SCATTER_AXES)?);
        self.scatter_x = x;
        self.scatter_y = y;
        Ok(())
    }

    /// Choose the three 3D axes by name; each must be in [`AXES_3D`].
    pub fn set_axes_3d(&mut self, names: [&str; 3]) -> Result<(), FieldNotFound> {
        let mut axes = self.axes_3d;
        for (slot, name) in axes.iter_mut().zip(names) {
            *slot = pick(name, &AXES_3D)?;
        }
        self.axes_3d = axes;
        Ok(())
    }

    /// Choose the histogram column by name; must be in [`HISTOGRAM_FIELDS`].
    pub fn set_histogram_field(&mut self, name: &str) -> Result<(), FieldNotFound> {
        self.histogram_field = pick(name, &HISTOGRAM_FIELDS)?;
        Ok(())
    }

    pub fn set_color_by(&mut self, name: &str) -> Result<(), FieldNotFound> {
        self.color_by = name.parse()?;
        Ok(())
    }
}

/// Resolve `name` against an allow-list.
fn pick(name: &str, allowed: &[NumericField]) -> Result<NumericField, FieldNotFound> {
    name.parse::<NumericField>()
        .ok()
        .filter(|f| allowed.contains(f))
        .ok_or_else(|| FieldNotFound(name.to_string()))
}

// ---------------------------------------------------------------------------
// Chart specifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub title: String,
}

/// All events of one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoFrame {
    pub year: i32,
    pub points: Vec<GeoPoint>,
}

/// Points sharing one category label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point3 {
    /// Each axis scaled to [-1, 1]; depth is negated so deeper events sit lower.
    pub position: [f64; 3],
    pub magnitude: f64,
}

/// One ring segment. Angles are fractions of a full turn, clockwise from 12 o'clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstSegment {
    pub label: String,
    pub parent: Option<String>,
    /// 0 for the inner ring, 1 for the outer ring.
    pub ring: u8,
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Renderer-independent description of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartSpec {
    /// The view was empty; renderers show a placeholder.
    NoData { title: String },
    GeoScatter {
        title: String,
        magnitude_range: (f64, f64),
        frames: Vec<GeoFrame>,
    },
    Scatter {
        title: String,
        x: NumericField,
        y: NumericField,
        color_by: CategoricalField,
        series: Vec<Series>,
    },
    Histogram { title: String, histogram: Histogram },
    Scatter3d {
        title: String,
        axes: [NumericField; 3],
        magnitude_range: (f64, f64),
        points: Vec<Point3>,
    },
    Sunburst {
        title: String,
        total: usize,
        missing: usize,
        segments: Vec<SunburstSegment>,
    },
    DensityContour { title: String, grid: DensityGrid },
    CumulativeCount { title: String, points: Vec<(i32, usize)> },
}

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            ChartSpec::NoData { title }
            | ChartSpec::GeoScatter { title, .. }
            | ChartSpec::Scatter { title, .. }
            | ChartSpec::Histogram { title, .. }
            | ChartSpec::Scatter3d { title, .. }
            | ChartSpec::Sunburst { title, .. }
            | ChartSpec::DensityContour { title, .. }
            | ChartSpec::CumulativeCount { title, .. } => title,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartSpec::NoData { .. })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the chart of `kind` for `view`. Never fails: an empty view gives
/// [`ChartSpec::NoData`].
pub fn build(kind: ChartKind, view: &FilteredView<'_>, options: &ChartOptions) -> ChartSpec {
    if view.is_empty() {
        return ChartSpec::NoData {
            title: kind.title().to_string(),
        };
    }
    match kind {
        ChartKind::GeoScatter => geo_scatter(view),
        ChartKind::Scatter => scatter(view, options.scatter_x, options.scatter_y, options.color_by),
        ChartKind::Histogram => histogram_chart(view, options.histogram_field, options.histogram_bins),
        ChartKind::Scatter3d => scatter_3d(view, options.axes_3d),
        ChartKind::Sunburst => sunburst(view),
        ChartKind::DensityContour => density(view, options.density_x, options.density_y, options.density_cells),
        ChartKind::CumulativeCount => cumulative(view),
    }
}

fn no_data(title: String) -> ChartSpec {
    ChartSpec::NoData { title }
}

pub fn geo_scatter(view: &FilteredView<'_>) -> ChartSpec {
    let title = "Earthquake locations by year".to_string();
    let (Some(lo), Some(hi)) = (min(view, NumericField::Magnitude), max(view, NumericField::Magnitude)) else {
        return no_data(title);
    };
    let ds = view.dataset();
    let frames = frames_by_year(view)
        .into_iter()
        .map(|(year, rows)| GeoFrame {
            year,
            points: rows
                .into_iter()
                .map(|i| {
                    let r = &ds.records[i];
                    GeoPoint {
                        latitude: r.latitude,
                        longitude: r.longitude,
                        magnitude: r.magnitude,
                        title: r.title.clone(),
                    }
                })
                .collect(),
        })
        .collect();
    ChartSpec::GeoScatter {
        title,
        magnitude_range: (lo, hi),
        frames,
    }
}

pub fn scatter(view: &FilteredView<'_>, x: NumericField, y: NumericField, color_by: CategoricalField) -> ChartSpec {
    let mut groups: BTreeMap<String, Vec<[f64; 2]>> = BTreeMap::new();
    for r in view.records() {
        let label = r.category(color_by).unwrap_or(MISSING_LABEL);
        groups
            .entry(label.to_string())
            .or_default()
            .push([r.numeric(x), r.numeric(y)]);
    }
    ChartSpec::Scatter {
        title: format!("{y} vs {x}"),
        x,
        y,
        color_by,
        series: groups
            .into_iter()
            .map(|(label, points)| Series { label, points })
            .collect(),
    }
}

pub fn histogram_chart(view: &FilteredView<'_>, field: NumericField, bins: usize) -> ChartSpec {
    let title = format!("Distribution of {field}");
    match histogram(view, field, bins) {
        Some(histogram) => ChartSpec::Histogram { title, histogram },
        None => no_data(title),
    }
}

pub fn scatter_3d(view: &FilteredView<'_>, axes: [NumericField; 3]) -> ChartSpec {
    let title = format!("{} / {} / {}", axes[0], axes[1], axes[2]);
    let mut ranges = [(0.0, 0.0); 3];
    for (range, field) in ranges.iter_mut().zip(axes) {
        match (min(view, field), max(view, field)) {
            (Some(lo), Some(hi)) => *range = (lo, hi),
            _ => return no_data(title),
        }
    }
    let magnitude_range = (
        min(view, NumericField::Magnitude).unwrap_or(0.0),
        max(view, NumericField::Magnitude).unwrap_or(0.0),
    );

    let points = view
        .records()
        .map(|r| {
            let mut position = [0.0; 3];
            for (k, field) in axes.into_iter().enumerate() {
                let (lo, hi) = ranges[k];
                let scaled = if hi > lo {
                    2.0 * (r.numeric(field) - lo) / (hi - lo) - 1.0
                } else {
                    0.0
                };
                position[k] = if field == NumericField::Depth { -scaled } else { scaled };
            }
            Point3 {
                position,
                magnitude: r.magnitude,
            }
        })
        .collect();

    ChartSpec::Scatter3d {
        title,
        axes,
        magnitude_range,
        points,
    }
}

pub fn sunburst(view: &FilteredView<'_>) -> ChartSpec {
    let title = "Earthquakes by continent and country".to_string();
    let path = grouped_path(view, CategoricalField::Continent, CategoricalField::Country);
    let total = path.total();
    if total == 0 {
        return no_data(title);
    }

    let mut segments = Vec::new();
    let mut cursor = 0.0;
    for ((outer, outer_count), inner) in path.outer_totals().into_iter().zip(path.groups.values()) {
        let outer_start = cursor;
        for (label, &count) in inner {
            let span = count as f64 / total as f64;
            segments.push(SunburstSegment {
                label: label.clone(),
                parent: Some(outer.to_string()),
                ring: 1,
                start: cursor,
                end: cursor + span,
                count,
            });
            cursor += span;
        }
        segments.push(SunburstSegment {
            label: outer.to_string(),
            parent: None,
            ring: 0,
            start: outer_start,
            end: cursor,
            count: outer_count,
        });
    }

    ChartSpec::Sunburst {
        title,
        total,
        missing: path.missing,
        segments,
    }
}

pub fn density(view: &FilteredView<'_>, x: NumericField, y: NumericField, cells: usize) -> ChartSpec {
    let title = format!("Density of {y} vs {x}");
    match density_grid(view, x, y, cells) {
        Some(grid) => ChartSpec::DensityContour { title, grid },
        None => no_data(title),
    }
}

pub fn cumulative(view: &FilteredView<'_>) -> ChartSpec {
    ChartSpec::CumulativeCount {
        title: "Cumulative number of earthquakes".to_string(),
        points: cumulative_by_year(view),
    }
}

// ---------------------------------------------------------------------------
// Geometry helpers for renderers
// ---------------------------------------------------------------------------

/// Orthographic projection of a 3D point: rotate by `yaw` around the
/// vertical (third) axis, then tilt by `pitch` towards the viewer.
pub fn project(position: [f64; 3], yaw: f64, pitch: f64) -> [f64; 2] {
    let [x, y, z] = position;
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let rx = x * cy - y * sy;
    let ry = x * sy + y * cy;
    [rx, z * cp + ry * sp]
}

/// Polygon outline of a ring segment between radii `r0` and `r1`.
pub fn ring_segment(start: f64, end: f64, r0: f64, r1: f64) -> Vec<[f64; 2]> {
    let steps = (((end - start) * 120.0).ceil() as usize).max(2);
    let at = |frac: f64, r: f64| {
        let angle = FRAC_PI_2 - frac * TAU;
        [r * angle.cos(), r * angle.sin()]
    };
    let outer = (0..=steps).map(|i| at(start + (end - start) * i as f64 / steps as f64, r1));
    let inner = (0..=steps)
        .rev()
        .map(|i| at(start + (end - start) * i as f64 / steps as f64, r0));
    outer.chain(inner).collect()
}

/// Centre of a ring segment, for labels.
pub fn ring_label_position(start: f64, end: f64, r0: f64, r1: f64) -> [f64; 2] {
    let angle = FRAC_PI_2 - (start + end) / 2.0 * TAU;
    let r = (r0 + r1) / 2.0;
    [r * angle.cos(), r * angle.sin()]
}
