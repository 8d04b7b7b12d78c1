/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → drop missing → derive year → EarthquakeDataset
///   └──────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ EarthquakeDataset │  Vec<Record>, bounds, unique categories
///   └───────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec (ranges + categories) → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  count / mean / max, grouping, bins, per-year series
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
