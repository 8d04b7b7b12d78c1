use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::cache::load_cached;
use crate::charts::{self, ChartKind, ChartOptions, ChartSpec};
use crate::color::ColorMap;
use crate::config::{AppConfig, FILTERS_ENV};
use crate::data::aggregate::{count, max, mean};
use crate::data::filter::{apply, CategoryChoice, FilterSpec, FilteredView};
use crate::data::model::{CategoricalField, EarthquakeDataset, NumericField};
use crate::game::GuessGame;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which page the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Charts,
    Records,
    Game,
}

/// Aggregates shown above the charts. `None` means "undefined" (empty view).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_magnitude: Option<f64>,
    pub max_magnitude: Option<f64>,
    pub mean_depth: Option<f64>,
}

impl Summary {
    fn of(view: &FilteredView<'_>) -> Self {
        Self {
            count: count(view),
            mean_magnitude: mean(view, NumericField::Magnitude),
            max_magnitude: max(view, NumericField::Magnitude),
            mean_depth: mean(view, NumericField::Depth),
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded dataset (None until a file is loaded).
    pub dataset: Option<Arc<EarthquakeDataset>>,

    /// Path the current dataset came from.
    pub source: Option<PathBuf>,

    /// Current filter selection; owned here, handed to the pipeline on change.
    pub spec: FilterSpec,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    pub summary: Summary,

    pub tab: Tab,
    pub chart_kind: ChartKind,
    pub chart_options: ChartOptions,

    /// Chart for the current view and options (cached).
    pub chart: ChartSpec,

    /// Colours for the `color_by` column of the scatter chart.
    pub color_map: Option<ColorMap>,

    /// Selected frame of the animated map; `None` shows every year.
    pub geo_frame: Option<usize>,
    pub playing: bool,
    /// UI clock time of the last animation step, seconds.
    pub last_step_at: f64,

    /// 3D scatter camera, radians.
    pub yaw: f64,
    pub pitch: f64,

    pub game: Option<GuessGame>,

    /// The dataset was cut down to a filtered subset of `source`.
    pub narrowed: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let chart_options = config.chart_options.clone();
        Self {
            config,
            dataset: None,
            source: None,
            spec: FilterSpec::default(),
            visible_indices: Vec::new(),
            summary: Summary::default(),
            tab: Tab::Charts,
            chart_kind: ChartKind::GeoScatter,
            chart_options,
            chart: ChartSpec::NoData {
                title: ChartKind::GeoScatter.title().to_string(),
            },
            color_map: None,
            geo_frame: None,
            playing: false,
            last_step_at: 0.0,
            yaw: 0.6,
            pitch: 0.4,
            game: None,
            narrowed: false,
            status_message: None,
        }
    }

    /// Load the configured start-up file if it exists.
    pub fn load_default(&mut self) {
        let path = self.config.data_path.clone();
        if path.exists() {
            self.load_path(&path);
            self.apply_configured_filters();
        } else {
            log::info!("no data file at {}; waiting for File → Open", path.display());
        }
    }

    /// Load (or fetch from the cache) and install a dataset. On failure the
    /// previous dataset stays and the error is shown in the status line.
    pub fn load_path(&mut self, path: &Path) {
        match load_cached(path, &self.config.load_options) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} earthquakes from {} ({})",
                    dataset.len(),
                    path.display(),
                    dataset.report
                );
                self.source = Some(path.to_path_buf());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Narrow the start-up dataset with the filters named in the config.
    fn apply_configured_filters(&mut self) {
        if self.dataset.is_none() || self.config.filters.is_empty() {
            return;
        }
        for filter in &self.config.filters {
            if let Err(e) = filter.apply_to(&mut self.spec) {
                log::warn!("{FILTERS_ENV}: {e}; filter ignored");
            }
        }
        self.refilter();
    }

    /// Ingest a newly loaded dataset, reset filters and derived state.
    pub fn set_dataset(&mut self, dataset: Arc<EarthquakeDataset>) {
        self.narrowed = false;
        self.spec = FilterSpec::default_for(&dataset);
        self.game = dataset.records.first().map(GuessGame::new);
        self.dataset = Some(dataset);
        self.geo_frame = None;
        self.status_message = None;
        self.rebuild_color_map();
        self.refilter();
    }

    fn rebuild_color_map(&mut self) {
        let column = self.chart_options.color_by;
        self.color_map = self.dataset.as_ref().and_then(|ds| {
            ds.unique_values
                .get(&column)
                .map(ColorMap::new)
        });
    }

    /// Recompute the view, summary and chart after a filter change.
    pub fn refilter(&mut self) {
        let Some(ds) = self.dataset.clone() else {
            return;
        };
        let view = apply(&ds, &self.spec);
        log::debug!("filter matched {} of {} records", view.len(), ds.len());
        self.summary = Summary::of(&view);
        self.chart = charts::build(self.chart_kind, &view, &self.chart_options);
        self.visible_indices = view.into_indices();
        self.clamp_geo_frame();
    }

    /// Rebuild only the chart (options changed, filters did not).
    pub fn rebuild_chart(&mut self) {
        let Some(ds) = self.dataset.clone() else {
            return;
        };
        let view = FilteredView::from_indices(&ds, self.visible_indices.clone());
        self.chart = charts::build(self.chart_kind, &view, &self.chart_options);
        self.clamp_geo_frame();
    }

    fn clamp_geo_frame(&mut self) {
        if let (Some(frame), ChartSpec::GeoScatter { frames, .. }) = (self.geo_frame, &self.chart) {
            if frame >= frames.len() {
                self.geo_frame = frames.len().checked_sub(1);
            }
        }
    }

    pub fn set_range(&mut self, field: NumericField, low: f64, high: f64) {
        self.spec.set_range(field, low, high);
        self.refilter();
    }

    pub fn set_category(&mut self, field: CategoricalField, choice: CategoryChoice) {
        self.spec.set_category(field, choice);
        self.refilter();
    }

    /// Back to the no-op filter for the current dataset.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.spec = FilterSpec::default_for(ds);
            self.refilter();
        }
    }

    /// Replace the dataset with the records currently visible, so the
    /// filter ranges span the subset.
    pub fn keep_visible_only(&mut self) {
        let Some(ds) = self.dataset.clone() else {
            return;
        };
        let subset = FilteredView::from_indices(&ds, self.visible_indices.clone()).to_dataset();
        if subset.is_empty() {
            self.status_message = Some("No earthquakes match the current filters.".to_string());
            return;
        }
        log::info!("narrowed dataset to {} of {} records", subset.len(), ds.len());
        self.set_dataset(Arc::new(subset));
        self.narrowed = true;
    }

    /// Undo [`keep_visible_only`](Self::keep_visible_only) by reloading the source file.
    pub fn restore_full_dataset(&mut self) {
        if let Some(path) = self.source.clone() {
            self.load_path(&path);
        }
    }

    pub fn filters_active(&self) -> bool {
        self.dataset
            .as_ref()
            .is_some_and(|ds| !self.spec.is_noop_for(ds))
    }

    pub fn set_chart_kind(&mut self, kind: ChartKind) {
        if self.chart_kind != kind {
            self.chart_kind = kind;
            self.rebuild_chart();
        }
    }

    pub fn set_color_by(&mut self, column: CategoricalField) {
        self.chart_options.color_by = column;
        self.rebuild_color_map();
        self.rebuild_chart();
    }

    /// Pick a new hidden location from the current view.
    pub fn new_game(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let view = FilteredView::from_indices(ds, self.visible_indices.clone());
        self.game = view.first().or_else(|| ds.records.first()).map(GuessGame::new);
    }

    /// Advance the animated map by one frame, wrapping around.
    pub fn step_geo_frame(&mut self) {
        if let ChartSpec::GeoScatter { frames, .. } = &self.chart {
            if frames.is_empty() {
                return;
            }
            self.geo_frame = Some(match self.geo_frame {
                Some(i) if i + 1 < frames.len() => i + 1,
                _ => 0,
            });
        }
    }

    /// Write the current chart description as pretty JSON.
    pub fn export_chart(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.chart).context("serialising chart")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
