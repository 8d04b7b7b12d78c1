use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use super::filter::FilteredView;
use super::model::{CategoricalField, NumericField};

/// Allowed histogram bin counts.
pub const BIN_RANGE: RangeInclusive<usize> = 5..=50;

// ---------------------------------------------------------------------------
// Scalar aggregates
// ---------------------------------------------------------------------------

pub fn count(view: &FilteredView<'_>) -> usize {
    view.len()
}

/// Arithmetic mean, `None` for an empty view.
pub fn mean(view: &FilteredView<'_>, field: NumericField) -> Option<f64> {
    if view.is_empty() {
        return None;
    }
    let sum: f64 = view.records().map(|r| r.numeric(field)).sum();
    Some(sum / view.len() as f64)
}

/// Largest value, `None` for an empty view.
pub fn max(view: &FilteredView<'_>, field: NumericField) -> Option<f64> {
    view.records().map(|r| r.numeric(field)).reduce(f64::max)
}

/// Smallest value, `None` for an empty view.
pub fn min(view: &FilteredView<'_>, field: NumericField) -> Option<f64> {
    view.records().map(|r| r.numeric(field)).reduce(f64::min)
}

// ---------------------------------------------------------------------------
// Two-level grouping (sunburst input)
// ---------------------------------------------------------------------------

/// Counts per `(outer, inner)` pair, e.g. continent → country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedPath {
    pub outer: CategoricalField,
    pub inner: CategoricalField,
    pub groups: BTreeMap<String, BTreeMap<String, usize>>,
    /// Records lacking either level; not part of `groups`.
    pub missing: usize,
}

impl GroupedPath {
    /// Sum of all leaf counts.
    pub fn total(&self) -> usize {
        self.groups.values().flat_map(|inner| inner.values()).sum()
    }

    /// Per-outer-group totals in key order.
    pub fn outer_totals(&self) -> Vec<(&str, usize)> {
        self.groups
            .iter()
            .map(|(k, inner)| (k.as_str(), inner.values().sum()))
            .collect()
    }
}

pub fn grouped_path(view: &FilteredView<'_>, outer: CategoricalField, inner: CategoricalField) -> GroupedPath {
    let mut path = GroupedPath {
        outer,
        inner,
        groups: BTreeMap::new(),
        missing: 0,
    };
    for rec in view.records() {
        match (rec.category(outer), rec.category(inner)) {
            (Some(o), Some(i)) => {
                *path
                    .groups
                    .entry(o.to_string())
                    .or_default()
                    .entry(i.to_string())
                    .or_default() += 1;
            }
            _ => path.missing += 1,
        }
    }
    path
}

// ---------------------------------------------------------------------------
// Binning
// ---------------------------------------------------------------------------

/// Equal-width bins over the observed span of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub field: NumericField,
    /// `counts.len() + 1` edges; the last bin is closed on the right.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        }
    }
}

/// Edges and a bucketing function for `bins` equal-width bins over `[lo, hi]`.
/// A zero-width span is widened to 1 so every value still lands in a bin.
struct Bins {
    lo: f64,
    width: f64,
    n: usize,
}

impl Bins {
    fn new(lo: f64, hi: f64, n: usize) -> Self {
        let span = if hi > lo { hi - lo } else { 1.0 };
        Self {
            lo,
            width: span / n as f64,
            n,
        }
    }

    fn index(&self, v: f64) -> usize {
        let i = ((v - self.lo) / self.width).floor();
        if i <= 0.0 {
            0
        } else {
            (i as usize).min(self.n - 1)
        }
    }

    fn edges(&self) -> Vec<f64> {
        (0..=self.n).map(|i| self.lo + i as f64 * self.width).collect()
    }
}

/// Histogram of `field`; `bins` is clamped to [`BIN_RANGE`]. `None` for an empty view.
pub fn histogram(view: &FilteredView<'_>, field: NumericField, bins: usize) -> Option<Histogram> {
    let lo = min(view, field)?;
    let hi = max(view, field)?;
    let bins = Bins::new(lo, hi, bins.clamp(*BIN_RANGE.start(), *BIN_RANGE.end()));

    let mut counts = vec![0; bins.n];
    for rec in view.records() {
        counts[bins.index(rec.numeric(field))] += 1;
    }
    Some(Histogram {
        field,
        edges: bins.edges(),
        counts,
    })
}

/// 2D counts over an `cells × cells` grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGrid {
    pub x: NumericField,
    pub y: NumericField,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// Row-major: `counts[row][col]`, rows along y.
    pub counts: Vec<Vec<usize>>,
    pub peak: usize,
}

pub fn density_grid(view: &FilteredView<'_>, x: NumericField, y: NumericField, cells: usize) -> Option<DensityGrid> {
    let cells = cells.max(1);
    let xb = Bins::new(min(view, x)?, max(view, x)?, cells);
    let yb = Bins::new(min(view, y)?, max(view, y)?, cells);

    let mut counts = vec![vec![0; cells]; cells];
    for rec in view.records() {
        counts[yb.index(rec.numeric(y))][xb.index(rec.numeric(x))] += 1;
    }
    let peak = counts.iter().flatten().copied().max().unwrap_or(0);
    Some(DensityGrid {
        x,
        y,
        x_edges: xb.edges(),
        y_edges: yb.edges(),
        counts,
        peak,
    })
}

// ---------------------------------------------------------------------------
// Per-year series
// ---------------------------------------------------------------------------

/// `(year, events up to and including that year)` in ascending year order.
pub fn cumulative_by_year(view: &FilteredView<'_>) -> Vec<(i32, usize)> {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for rec in view.records() {
        *per_year.entry(rec.year).or_default() += 1;
    }
    per_year
        .into_iter()
        .scan(0, |running, (year, n)| {
            *running += n;
            Some((year, *running))
        })
        .collect()
}

/// Dataset row indices grouped by year, for animation frames.
pub fn frames_by_year(view: &FilteredView<'_>) -> BTreeMap<i32, Vec<usize>> {
    let ds = view.dataset();
    let mut frames: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for &i in view.indices() {
        frames.entry(ds.records[i].year).or_default().push(i);
    }
    frames
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::filter::{apply, FilterSpec};
    use crate::data::model::fixtures::{record, three_quakes};
    use crate::data::model::{EarthquakeDataset, LoadReport};

    fn empty_view(ds: &EarthquakeDataset) -> FilteredView<'_> {
        let mut spec = FilterSpec::default_for(ds);
        spec.set_range(NumericField::Magnitude, 100.0, 200.0);
        apply(ds, &spec)
    }

    #[test]
    fn empty_view_aggregates_are_undefined() {
        let ds = three_quakes();
        let view = empty_view(&ds);
        assert_eq!(count(&view), 0);
        assert_eq!(mean(&view, NumericField::Magnitude), None);
        assert_eq!(max(&view, NumericField::Depth), None);
        assert_eq!(histogram(&view, NumericField::Magnitude, 10), None);
        assert_eq!(density_grid(&view, NumericField::Magnitude, NumericField::Depth, 8), None);
        assert!(cumulative_by_year(&view).is_empty());
        assert_eq!(grouped_path(&view, CategoricalField::Continent, CategoricalField::Country).total(), 0);
    }

    #[test]
    fn scalar_aggregates() {
        let ds = three_quakes();
        let view = apply(&ds, &FilterSpec::default_for(&ds));
        assert_eq!(count(&view), 3);
        assert_eq!(max(&view, NumericField::Magnitude), Some(7.1));
        assert_eq!(min(&view, NumericField::Magnitude), Some(2.0));
        let m = mean(&view, NumericField::Magnitude).unwrap();
        assert!((m - 14.6 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn grouped_path_counts_pairs() {
        let ds = three_quakes();
        let view = apply(&ds, &FilterSpec::default_for(&ds));
        let path = grouped_path(&view, CategoricalField::Continent, CategoricalField::Country);
        assert_eq!(path.total(), 3);
        assert_eq!(path.groups["Asia"]["Japan"], 1);
        assert_eq!(path.outer_totals(), vec![("Asia", 2), ("Europe", 1)]);
        assert_eq!(path.missing, 0);
    }

    #[test]
    fn grouped_path_sets_aside_missing_levels() {
        let ds = EarthquakeDataset::from_records(
            vec![record(5.0, Some("Asia")), record(5.0, None)],
            LoadReport::default(),
        );
        let view = apply(&ds, &FilterSpec::default_for(&ds));
        let path = grouped_path(&view, CategoricalField::Continent, CategoricalField::Net);
        assert_eq!(path.total(), 1);
        assert_eq!(path.missing, 1);
    }

    #[test]
    fn histogram_clamps_bins_and_closes_last_bin() {
        let ds = three_quakes();
        let view = apply(&ds, &FilterSpec::default_for(&ds));

        let h = histogram(&view, NumericField::Magnitude, 1).unwrap();
        assert_eq!(h.counts.len(), 5);
        assert_eq!(h.edges.len(), 6);
        assert_eq!(h.counts.iter().sum::<usize>(), 3);
        assert_eq!(*h.counts.last().unwrap(), 1);

        let h = histogram(&view, NumericField::Magnitude, 500).unwrap();
        assert_eq!(h.counts.len(), 50);
    }

    #[test]
    fn constant_field_lands_in_first_bin() {
        let ds = three_quakes();
        let view = apply(&ds, &FilterSpec::default_for(&ds));
        let h = histogram(&view, NumericField::Depth, 5).unwrap();
        assert_eq!(h.counts, vec![3, 0, 0, 0, 0]);
        assert!((h.bin_width() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn cumulative_and_frames_follow_years() {
        let ds = three_quakes();
        let view = apply(&ds, &FilterSpec::default_for(&ds));
        assert_eq!(cumulative_by_year(&view), vec![(2001, 1), (2005, 2), (2009, 3)]);
        let frames = frames_by_year(&view);
        assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![2001, 2005, 2009]);
        assert_eq!(frames[&2009], vec![2]);
    }

    proptest! {
        #[test]
        fn leaf_counts_sum_to_view_size(pairs in prop::collection::vec((0usize..4, 0usize..5), 1..60)) {
            let records = pairs
                .into_iter()
                .map(|(c, k)| {
                    let mut r = record(5.0, Some(["Asia", "Africa", "Europe", "Oceania"][c]));
                    r.country = Some(format!("country-{k}"));
                    r
                })
                .collect();
            let ds = EarthquakeDataset::from_records(records, LoadReport::default());
            let view = apply(&ds, &FilterSpec::default_for(&ds));
            let path = grouped_path(&view, CategoricalField::Continent, CategoricalField::Country);
            prop_assert_eq!(path.total(), count(&view));
        }

        #[test]
        fn density_grid_accounts_for_every_record(mags in prop::collection::vec(0.0..10.0f64, 1..50)) {
            let records = mags
                .iter()
                .enumerate()
                .map(|(i, &m)| {
                    let mut r = record(m, Some("Asia"));
                    r.depth = i as f64;
                    r
                })
                .collect();
            let ds = EarthquakeDataset::from_records(records, LoadReport::default());
            let view = apply(&ds, &FilterSpec::default_for(&ds));
            let grid = density_grid(&view, NumericField::Magnitude, NumericField::Depth, 12).unwrap();
            let total: usize = grid.counts.iter().flatten().sum();
            prop_assert_eq!(total, mags.len());
        }
    }
}
