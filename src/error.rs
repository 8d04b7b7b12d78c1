use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a source file into an [`EarthquakeDataset`].
///
/// Fatal for the load attempt; the shell keeps whatever dataset it had before.
///
/// [`EarthquakeDataset`]: crate::data::model::EarthquakeDataset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("malformed Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("no usable rows ({rows_read} read, all dropped)")]
    NoRows { rows_read: usize },
}

/// A `date_time` value that none of the accepted layouts could parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable timestamp '{value}'")]
pub struct ParseError {
    pub value: String,
}

/// A column name that is not one of the known filterable fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct FieldNotFound(pub String);
