use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{CategoricalField, EarthquakeDataset, LoadReport, NumericField, Record};
use crate::error::FieldNotFound;

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Inclusive `[low, high]` bound on a numeric field.
///
/// An inverted range (`low > high`) passes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeConstraint {
    pub low: f64,
    pub high: f64,
}

impl RangeConstraint {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Selected value of a categorical filter. `None` lets every record through,
/// including records whose value is missing.
pub type CategoryChoice = Option<String>;

// ---------------------------------------------------------------------------
// FilterSpec
// ---------------------------------------------------------------------------

/// The full set of active constraints.
///
/// A record passes when it satisfies every range and every category choice.
/// Fields absent from either map are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSpec {
    pub ranges: BTreeMap<NumericField, RangeConstraint>,
    pub categories: BTreeMap<CategoricalField, CategoryChoice>,
}

impl FilterSpec {
    /// The no-op spec for `dataset`: every filterable range spans the observed
    /// min/max and every category is "All".
    pub fn default_for(dataset: &EarthquakeDataset) -> Self {
        let ranges = NumericField::FILTERABLE
            .into_iter()
            .filter_map(|f| {
                dataset
                    .bounds(f)
                    .map(|(lo, hi)| (f, RangeConstraint::new(lo, hi)))
            })
            .collect();
        let categories = CategoricalField::ALL.into_iter().map(|f| (f, None)).collect();
        Self { ranges, categories }
    }

    pub fn set_range(&mut self, field: NumericField, low: f64, high: f64) {
        self.ranges.insert(field, RangeConstraint::new(low, high));
    }

    pub fn set_category(&mut self, field: CategoricalField, choice: CategoryChoice) {
        self.categories.insert(field, choice);
    }

    /// Like [`set_range`](Self::set_range) but addressed by column name.
    pub fn set_range_by_name(&mut self, name: &str, low: f64, high: f64) -> Result<(), FieldNotFound> {
        let field: NumericField = name.parse()?;
        self.set_range(field, low, high);
        Ok(())
    }

    /// Like [`set_category`](Self::set_category) but addressed by column name.
    pub fn set_category_by_name(&mut self, name: &str, choice: CategoryChoice) -> Result<(), FieldNotFound> {
        let field: CategoricalField = name.parse()?;
        self.set_category(field, choice);
        Ok(())
    }

    /// Whether this spec lets every record of `dataset` through unchanged.
    pub fn is_noop_for(&self, dataset: &EarthquakeDataset) -> bool {
        let ranges_open = self.ranges.iter().all(|(field, range)| {
            dataset
                .bounds(*field)
                .map_or(true, |(lo, hi)| range.low <= lo && hi <= range.high)
        });
        ranges_open && self.categories.values().all(Option::is_none)
    }

    /// Conjunction of all constraints for one record.
    pub fn matches(&self, record: &Record) -> bool {
        let in_ranges = self
            .ranges
            .iter()
            .all(|(field, range)| range.contains(record.numeric(*field)));
        let in_categories = self.categories.iter().all(|(field, choice)| match choice {
            None => true,
            Some(wanted) => record.category(*field) == Some(wanted.as_str()),
        });
        in_ranges && in_categories
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// Records of a dataset that passed a [`FilterSpec`], in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a EarthquakeDataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Rebuild a view from indices obtained from an earlier [`apply`].
    /// Out-of-range indices are discarded.
    pub fn from_indices(dataset: &'a EarthquakeDataset, mut indices: Vec<usize>) -> Self {
        indices.retain(|&i| i < dataset.len());
        Self { dataset, indices }
    }

    pub fn dataset(&self) -> &'a EarthquakeDataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let ds = self.dataset;
        self.indices.iter().map(move |&i| &ds.records[i])
    }

    pub fn first(&self) -> Option<&'a Record> {
        self.indices.first().map(|&i| &self.dataset.records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Copy the passing records into a standalone dataset.
    pub fn to_dataset(&self) -> EarthquakeDataset {
        let records: Vec<Record> = self.records().cloned().collect();
        let report = LoadReport {
            rows_read: records.len(),
            ..LoadReport::default()
        };
        EarthquakeDataset::from_records(records, report)
    }
}

/// Return the records of `dataset` that pass every constraint in `spec`.
pub fn apply<'a>(dataset: &'a EarthquakeDataset, spec: &FilterSpec) -> FilteredView<'a> {
    let indices = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| spec.matches(rec))
        .map(|(i, _)| i)
        .collect();
    FilteredView { dataset, indices }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::aggregate::{count, mean};
    use crate::data::model::fixtures::{record, three_quakes};

    #[test]
    fn asia_between_three_and_eight() {
        let ds = three_quakes();
        let mut spec = FilterSpec::default_for(&ds);
        spec.set_range(NumericField::Magnitude, 3.0, 8.0);
        spec.set_category(CategoricalField::Continent, Some("Asia".into()));

        let view = apply(&ds, &spec);
        assert_eq!(count(&view), 1);
        assert_eq!(view.first().map(|r| r.magnitude), Some(5.5));
        assert_eq!(mean(&view, NumericField::Magnitude), Some(5.5));
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let ds = three_quakes();
        let mut spec = FilterSpec::default_for(&ds);
        spec.set_range(NumericField::Magnitude, 8.0, 9.0);

        let view = apply(&ds, &spec);
        assert!(view.is_empty());
        assert_eq!(count(&view), 0);
        assert_eq!(mean(&view, NumericField::Magnitude), None);
    }

    #[test]
    fn inverted_range_passes_nothing() {
        let ds = three_quakes();
        let mut spec = FilterSpec::default_for(&ds);
        spec.set_range(NumericField::Depth, 50.0, 5.0);
        assert!(apply(&ds, &spec).is_empty());
    }

    #[test]
    fn category_named_all_is_a_real_value() {
        let mut odd = record(4.0, Some("All"));
        odd.country = Some(String::new());
        let ds = EarthquakeDataset::from_records(
            vec![odd, record(4.5, Some("Asia")), record(5.0, None)],
            LoadReport::default(),
        );

        let mut spec = FilterSpec::default_for(&ds);
        spec.set_category(CategoricalField::Continent, Some("All".into()));
        assert_eq!(apply(&ds, &spec).indices(), &[0]);

        spec.set_category(CategoricalField::Continent, None);
        spec.set_category(CategoricalField::Country, Some(String::new()));
        assert_eq!(apply(&ds, &spec).indices(), &[0]);

        spec.set_category(CategoricalField::Country, None);
        assert_eq!(apply(&ds, &spec).len(), 3);
    }

    #[test]
    fn names_resolve_or_fail_fast() {
        let ds = three_quakes();
        let mut spec = FilterSpec::default_for(&ds);
        assert!(spec.set_range_by_name("magnitude", 5.0, 6.0).is_ok());
        assert!(spec.set_category_by_name("continent", Some("Asia".into())).is_ok());
        assert_eq!(
            spec.set_range_by_name("intensity", 0.0, 1.0),
            Err(FieldNotFound("intensity".into()))
        );
        assert_eq!(
            spec.set_category_by_name("planet", None),
            Err(FieldNotFound("planet".into()))
        );
        assert_eq!(apply(&ds, &spec).len(), 1);
    }

    #[test]
    fn default_spec_is_noop() {
        let ds = three_quakes();
        let mut spec = FilterSpec::default_for(&ds);
        assert!(spec.is_noop_for(&ds));
        spec.set_category(CategoricalField::Net, Some("us".into()));
        assert!(!spec.is_noop_for(&ds));
    }

    #[test]
    fn apply_leaves_dataset_untouched() {
        let ds = three_quakes();
        let before = ds.records.clone();
        let mut spec = FilterSpec::default_for(&ds);
        spec.set_range(NumericField::Magnitude, 6.0, 8.0);
        let view = apply(&ds, &spec);
        let copy = view.to_dataset();
        assert_eq!(copy.len(), 1);
        assert_eq!(ds.records, before);
    }

    // -- properties --

    const CONTINENTS: [&str; 3] = ["Asia", "Europe", "Oceania"];

    fn arb_dataset() -> impl Strategy<Value = EarthquakeDataset> {
        prop::collection::vec(
            (0.0..10.0f64, 0.0..700.0f64, 1995i32..2024, prop::option::of(0usize..3)),
            1..40,
        )
        .prop_map(|rows| {
            let records = rows
                .into_iter()
                .map(|(mag, depth, year, continent)| {
                    let mut r = record(mag, continent.map(|c| CONTINENTS[c]));
                    r.depth = depth;
                    r.year = year;
                    r
                })
                .collect();
            EarthquakeDataset::from_records(records, LoadReport::default())
        })
    }

    proptest! {
        #[test]
        fn default_spec_is_identity(ds in arb_dataset()) {
            let view = apply(&ds, &FilterSpec::default_for(&ds));
            prop_assert_eq!(view.indices().to_vec(), (0..ds.len()).collect::<Vec<_>>());
        }

        #[test]
        fn narrowing_never_grows(ds in arb_dataset(), lo in 0.0..10.0f64, width in 0.0..10.0f64, c in 0usize..3) {
            let base = FilterSpec::default_for(&ds);
            let wide = apply(&ds, &base).len();

            let mut narrow = base.clone();
            narrow.set_range(NumericField::Magnitude, lo, lo + width);
            let narrowed = apply(&ds, &narrow).len();
            prop_assert!(narrowed <= wide);

            narrow.set_category(CategoricalField::Continent, Some(CONTINENTS[c].to_string()));
            prop_assert!(apply(&ds, &narrow).len() <= narrowed);
        }

        #[test]
        fn constraint_order_is_irrelevant(ds in arb_dataset(), lo in 0.0..5.0f64, depth_hi in 0.0..700.0f64, c in 0usize..3) {
            let continent = Some(CONTINENTS[c].to_string());

            let mut forward = FilterSpec::default();
            forward.set_range(NumericField::Magnitude, lo, 10.0);
            forward.set_range(NumericField::Depth, 0.0, depth_hi);
            forward.set_category(CategoricalField::Continent, continent.clone());

            let mut backward = FilterSpec::default();
            backward.set_category(CategoricalField::Continent, continent);
            backward.set_range(NumericField::Depth, 0.0, depth_hi);
            backward.set_range(NumericField::Magnitude, lo, 10.0);

            let a = apply(&ds, &forward).into_indices();
            let b = apply(&ds, &backward).into_indices();
            prop_assert_eq!(&a, &b);

            // Sequential application of each constraint alone agrees too.
            let mut staged = ds.clone();
            for single in [
                { let mut s = FilterSpec::default(); s.set_range(NumericField::Depth, 0.0, depth_hi); s },
                { let mut s = FilterSpec::default(); s.set_category(CategoricalField::Continent, Some(CONTINENTS[c].to_string())); s },
                { let mut s = FilterSpec::default(); s.set_range(NumericField::Magnitude, lo, 10.0); s },
            ] {
                let next = apply(&staged, &single).to_dataset();
                staged = next;
            }
            prop_assert_eq!(staged.len(), a.len());
        }

        #[test]
        fn reapplying_noop_changes_nothing(ds in arb_dataset(), lo in 0.0..10.0f64) {
            let mut spec = FilterSpec::default_for(&ds);
            spec.set_range(NumericField::Magnitude, lo, 10.0);
            let once = apply(&ds, &spec).to_dataset();
            let twice = apply(&once, &FilterSpec::default_for(&once)).to_dataset();
            prop_assert_eq!(once.records, twice.records);
        }
    }
}
