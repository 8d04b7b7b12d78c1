use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FieldNotFound;

// ---------------------------------------------------------------------------
// Field enumerations
// ---------------------------------------------------------------------------

/// Numeric columns of an earthquake record.
///
/// The set is closed so a filter or chart axis can never name a column the
/// dataset does not have; parsing an unknown name fails with [`FieldNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Latitude,
    Longitude,
    Magnitude,
    Depth,
    Dmin,
    Gap,
    Sig,
    Nst,
    Year,
}

impl NumericField {
    pub const ALL: [NumericField; 9] = [
        NumericField::Latitude,
        NumericField::Longitude,
        NumericField::Magnitude,
        NumericField::Depth,
        NumericField::Dmin,
        NumericField::Gap,
        NumericField::Sig,
        NumericField::Nst,
        NumericField::Year,
    ];

    /// Fields that get a range slider in the filter panel.
    pub const FILTERABLE: [NumericField; 7] = [
        NumericField::Magnitude,
        NumericField::Depth,
        NumericField::Dmin,
        NumericField::Gap,
        NumericField::Sig,
        NumericField::Nst,
        NumericField::Year,
    ];

    /// Column name as it appears in the source file.
    pub fn name(self) -> &'static str {
        match self {
            NumericField::Latitude => "latitude",
            NumericField::Longitude => "longitude",
            NumericField::Magnitude => "magnitude",
            NumericField::Depth => "depth",
            NumericField::Dmin => "dmin",
            NumericField::Gap => "gap",
            NumericField::Sig => "sig",
            NumericField::Nst => "nst",
            NumericField::Year => "year",
        }
    }

    /// Integer-valued fields use whole-number slider steps.
    pub fn is_integer(self) -> bool {
        matches!(self, NumericField::Nst | NumericField::Year | NumericField::Sig)
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericField {
    type Err = FieldNotFound;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumericField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| FieldNotFound(s.to_string()))
    }
}

/// Categorical (string) columns of an earthquake record. Values may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Alert,
    Tsunami,
    Net,
    MagType,
    Continent,
    Country,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 6] = [
        CategoricalField::Alert,
        CategoricalField::Tsunami,
        CategoricalField::Net,
        CategoricalField::MagType,
        CategoricalField::Continent,
        CategoricalField::Country,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Alert => "alert",
            CategoricalField::Tsunami => "tsunami",
            CategoricalField::Net => "net",
            CategoricalField::MagType => "magType",
            CategoricalField::Continent => "continent",
            CategoricalField::Country => "country",
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CategoricalField {
    type Err = FieldNotFound;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoricalField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| FieldNotFound(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single earthquake event.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub title: String,
    pub location: Option<String>,
    /// Source `date_time` text, trimmed.
    pub date_time: String,
    /// Calendar year of `date_time`.
    pub year: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth: f64,
    pub dmin: f64,
    pub gap: f64,
    pub sig: f64,
    /// Number of reporting stations.
    pub nst: i64,
    pub alert: Option<String>,
    pub tsunami: Option<String>,
    pub net: Option<String>,
    pub mag_type: Option<String>,
    pub continent: Option<String>,
    pub country: Option<String>,
}

impl Record {
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Latitude => self.latitude,
            NumericField::Longitude => self.longitude,
            NumericField::Magnitude => self.magnitude,
            NumericField::Depth => self.depth,
            NumericField::Dmin => self.dmin,
            NumericField::Gap => self.gap,
            NumericField::Sig => self.sig,
            NumericField::Nst => self.nst as f64,
            NumericField::Year => f64::from(self.year),
        }
    }

    pub fn category(&self, field: CategoricalField) -> Option<&str> {
        let value = match field {
            CategoricalField::Alert => &self.alert,
            CategoricalField::Tsunami => &self.tsunami,
            CategoricalField::Net => &self.net,
            CategoricalField::MagType => &self.mag_type,
            CategoricalField::Continent => &self.continent,
            CategoricalField::Country => &self.country,
        };
        value.as_deref()
    }
}

// ---------------------------------------------------------------------------
// LoadReport – what the loader discarded
// ---------------------------------------------------------------------------

/// Row accounting from the load step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    /// Rows missing a required numeric field (or continent, when requested).
    pub dropped_missing: usize,
    /// Rows whose `date_time` could not be parsed.
    pub dropped_timestamp: usize,
}

impl LoadReport {
    pub fn kept(&self) -> usize {
        self.rows_read - self.dropped_missing - self.dropped_timestamp
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows read, {} kept ({} missing values, {} bad timestamps)",
            self.rows_read,
            self.kept(),
            self.dropped_missing,
            self.dropped_timestamp
        )
    }
}

// ---------------------------------------------------------------------------
// EarthquakeDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices. Read-only once built.
#[derive(Debug, Clone)]
pub struct EarthquakeDataset {
    pub records: Vec<Record>,
    /// Observed (min, max) of every numeric field. Empty for an empty dataset.
    pub bounds: BTreeMap<NumericField, (f64, f64)>,
    /// For each categorical column the sorted set of present values.
    pub unique_values: BTreeMap<CategoricalField, BTreeSet<String>>,
    pub report: LoadReport,
}

impl EarthquakeDataset {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<Record>, report: LoadReport) -> Self {
        let mut bounds: BTreeMap<NumericField, (f64, f64)> = BTreeMap::new();
        let mut unique_values: BTreeMap<CategoricalField, BTreeSet<String>> = CategoricalField::ALL
            .into_iter()
            .map(|f| (f, BTreeSet::new()))
            .collect();

        for rec in &records {
            for field in NumericField::ALL {
                let v = rec.numeric(field);
                bounds
                    .entry(field)
                    .and_modify(|(lo, hi)| {
                        *lo = lo.min(v);
                        *hi = hi.max(v);
                    })
                    .or_insert((v, v));
            }
            for field in CategoricalField::ALL {
                if let Some(v) = rec.category(field) {
                    unique_values.entry(field).or_default().insert(v.to_string());
                }
            }
        }

        EarthquakeDataset {
            records,
            bounds,
            unique_values,
            report,
        }
    }

    pub fn bounds(&self, field: NumericField) -> Option<(f64, f64)> {
        self.bounds.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for f in NumericField::ALL {
            assert_eq!(f.name().parse::<NumericField>(), Ok(f));
        }
        for f in CategoricalField::ALL {
            assert_eq!(f.name().parse::<CategoricalField>(), Ok(f));
        }
        assert_eq!(
            "richter".parse::<NumericField>(),
            Err(FieldNotFound("richter".into()))
        );
    }

    #[test]
    fn dataset_indexes_bounds_and_categories() {
        let ds = three_quakes();
        assert_eq!(ds.bounds(NumericField::Magnitude), Some((2.0, 7.1)));
        assert_eq!(ds.bounds(NumericField::Year), Some((2001.0, 2009.0)));
        let continents = &ds.unique_values[&CategoricalField::Continent];
        assert_eq!(
            continents.iter().cloned().collect::<Vec<_>>(),
            vec!["Asia".to_string(), "Europe".to_string()]
        );
        assert!(ds.unique_values[&CategoricalField::Alert].is_empty());
    }

    #[test]
    fn empty_dataset_has_no_bounds() {
        let ds = EarthquakeDataset::from_records(Vec::new(), LoadReport::default());
        assert!(ds.is_empty());
        assert_eq!(ds.bounds(NumericField::Depth), None);
    }
}
