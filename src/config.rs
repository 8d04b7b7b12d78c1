use std::path::PathBuf;

use crate::charts::ChartOptions;
use crate::data::filter::FilterSpec;
use crate::data::loader::LoadOptions;
use crate::error::FieldNotFound;

pub const DATA_ENV: &str = "QUAKE_LENS_DATA";
pub const DROP_CONTINENT_ENV: &str = "QUAKE_LENS_DROP_MISSING_CONTINENT";
pub const HIST_BINS_ENV: &str = "QUAKE_LENS_HIST_BINS";
pub const HIST_FIELD_ENV: &str = "QUAKE_LENS_HIST_FIELD";
pub const SCATTER_AXES_ENV: &str = "QUAKE_LENS_SCATTER_AXES";
pub const AXES_3D_ENV: &str = "QUAKE_LENS_AXES_3D";
pub const COLOR_BY_ENV: &str = "QUAKE_LENS_COLOR_BY";
pub const FILTERS_ENV: &str = "QUAKE_LENS_FILTERS";

/// One start-up filter, addressed by column name until a dataset is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOverride {
    /// `magnitude=6.5..7.5`
    Range { field: String, low: f64, high: f64 },
    /// `continent=Asia`
    Category { field: String, value: String },
}

impl FilterOverride {
    pub fn apply_to(&self, spec: &mut FilterSpec) -> Result<(), FieldNotFound> {
        match self {
            FilterOverride::Range { field, low, high } => spec.set_range_by_name(field, *low, *high),
            FilterOverride::Category { field, value } => {
                spec.set_category_by_name(field, Some(value.clone()))
            }
        }
    }
}

/// Start-up settings, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// File loaded at start-up when it exists.
    pub data_path: PathBuf,
    pub load_options: LoadOptions,
    /// Initial column choices for the charts.
    pub chart_options: ChartOptions,
    /// Applied once to the start-up dataset.
    pub filters: Vec<FilterOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("earthquake_data.csv"),
            load_options: LoadOptions::default(),
            chart_options: ChartOptions::default(),
            filters: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values fall back
    /// to the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(DATA_ENV).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(flag) = lookup(DROP_CONTINENT_ENV) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.load_options.drop_missing_continent = true,
                "0" | "false" | "no" | "off" | "" => {}
                other => log::warn!("{DROP_CONTINENT_ENV}: ignoring unrecognised value '{other}'"),
            }
        }

        let charts = &mut config.chart_options;
        if let Some(bins) = lookup(HIST_BINS_ENV) {
            match bins.trim().parse::<usize>() {
                Ok(n) => charts.set_histogram_bins(n),
                Err(_) => log::warn!("{HIST_BINS_ENV}: '{bins}' is not a bin count"),
            }
        }
        if let Some(name) = lookup(HIST_FIELD_ENV) {
            warn_on_err(HIST_FIELD_ENV, charts.set_histogram_field(name.trim()));
        }
        if let Some(axes) = lookup(SCATTER_AXES_ENV) {
            let result = match split_names(&axes)[..] {
                [x, y] => charts.set_scatter_axes(x, y),
                _ => Err(FieldNotFound(axes.clone())),
            };
            warn_on_err(SCATTER_AXES_ENV, result);
        }
        if let Some(axes) = lookup(AXES_3D_ENV) {
            let result = match split_names(&axes)[..] {
                [x, y, z] => charts.set_axes_3d([x, y, z]),
                _ => Err(FieldNotFound(axes.clone())),
            };
            warn_on_err(AXES_3D_ENV, result);
        }
        if let Some(name) = lookup(COLOR_BY_ENV) {
            warn_on_err(COLOR_BY_ENV, charts.set_color_by(name.trim()));
        }

        if let Some(filters) = lookup(FILTERS_ENV) {
            config.filters = parse_filters(&filters);
        }

        config
    }
}

fn split_names(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).collect()
}

fn warn_on_err(var: &str, result: Result<(), FieldNotFound>) {
    if let Err(e) = result {
        log::warn!("{var}: {e}; keeping the default");
    }
}

/// Parse `name=low..high;name=value;...`. Malformed entries are skipped.
fn parse_filters(text: &str) -> Vec<FilterOverride> {
    text.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let Some((field, value)) = entry.split_once('=') else {
                log::warn!("{FILTERS_ENV}: '{entry}' is not name=value");
                return None;
            };
            let (field, value) = (field.trim().to_string(), value.trim());
            let range: Option<(f64, f64)> = value
                .split_once("..")
                .and_then(|(lo, hi)| Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?)));
            Some(match range {
                Some((low, high)) => FilterOverride::Range { field, low, high },
                None => FilterOverride::Category {
                    field,
                    value: value.to_string(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::model::{CategoricalField, NumericField};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (DATA_ENV, "/data/quakes.parquet"),
            (DROP_CONTINENT_ENV, "Yes"),
            (HIST_BINS_ENV, "200"),
        ]));
        assert_eq!(config.data_path, PathBuf::from("/data/quakes.parquet"));
        assert!(config.load_options.drop_missing_continent);
        assert_eq!(config.chart_options.histogram_bins, 50);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[(DROP_CONTINENT_ENV, "maybe"), (HIST_BINS_ENV, "lots")]));
        assert!(!config.load_options.drop_missing_continent);
        assert_eq!(config.chart_options.histogram_bins, 20);
    }

    #[test]
    fn chart_columns_by_name() {
        let config = AppConfig::from_lookup(lookup(&[
            (HIST_FIELD_ENV, "nst"),
            (SCATTER_AXES_ENV, "gap, sig"),
            (AXES_3D_ENV, "longitude,latitude,magnitude"),
            (COLOR_BY_ENV, "magType"),
        ]));
        let charts = &config.chart_options;
        assert_eq!(charts.histogram_field, NumericField::Nst);
        assert_eq!((charts.scatter_x, charts.scatter_y), (NumericField::Gap, NumericField::Sig));
        assert_eq!(charts.axes_3d[2], NumericField::Magnitude);
        assert_eq!(charts.color_by, CategoricalField::MagType);
    }

    #[test]
    fn chart_columns_outside_allow_lists_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[
            (HIST_FIELD_ENV, "year"),
            (SCATTER_AXES_ENV, "gap,latitude"),
            (AXES_3D_ENV, "longitude,latitude"),
            (COLOR_BY_ENV, "colour"),
        ]));
        assert_eq!(config.chart_options, ChartOptions::default());
    }

    #[test]
    fn filters_parse_ranges_and_categories() {
        let config = AppConfig::from_lookup(lookup(&[(
            FILTERS_ENV,
            "magnitude=6.5..7.5; continent=Asia;;broken",
        )]));
        assert_eq!(
            config.filters,
            vec![
                FilterOverride::Range {
                    field: "magnitude".into(),
                    low: 6.5,
                    high: 7.5
                },
                FilterOverride::Category {
                    field: "continent".into(),
                    value: "Asia".into()
                },
            ]
        );
    }

    #[test]
    fn filter_with_unknown_column_is_rejected() {
        let mut spec = FilterSpec::default();
        let depth_as_category = FilterOverride::Category {
            field: "depth".into(),
            value: "deep".into(),
        };
        assert_eq!(
            depth_as_category.apply_to(&mut spec),
            Err(FieldNotFound("depth".into()))
        );
        assert!(spec.categories.is_empty());
    }
}
