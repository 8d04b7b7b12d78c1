use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{EarthquakeDataset, LoadReport, Record};
use crate::error::{LoadError, ParseError};

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 17] = [
    "latitude",
    "longitude",
    "magnitude",
    "depth",
    "date_time",
    "alert",
    "tsunami",
    "sig",
    "net",
    "nst",
    "dmin",
    "gap",
    "magType",
    "location",
    "continent",
    "country",
    "title",
];

/// Timestamp layouts tried in order after RFC 3339.
const TIMESTAMP_LAYOUTS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// Individual timestamp warnings logged before switching to a summary.
const MAX_TIMESTAMP_WARNINGS: usize = 5;

/// Knobs for the missing-value step of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Drop rows whose `continent` is empty.
    pub drop_missing_continent: bool,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an earthquake dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with at least [`REQUIRED_COLUMNS`]
/// * `.json`    – `[{ "magnitude": 7.0, "date_time": "...", ... }, ...]`
/// * `.parquet` – flat columns with the same names (any primitive type)
///
/// Every format goes through the same steps, in this order: drop rows missing
/// a required value, derive `year` from `date_time` (dropping rows that do
/// not parse), index the result.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<EarthquakeDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    build_dataset(rows, options)
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ParseError> {
    let s = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for layout in TIMESTAMP_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN));
    }
    Err(ParseError {
        value: value.to_string(),
    })
}

/// Calendar year of a `date_time` cell.
pub fn derive_year(value: &str) -> Result<i32, ParseError> {
    parse_timestamp(value).map(|dt| dt.year())
}

// ---------------------------------------------------------------------------
// Raw rows → dataset
// ---------------------------------------------------------------------------

/// One source row as optional text cells keyed by column name.
/// Empty strings are normalised to `None` by the readers.
type RawRow = BTreeMap<&'static str, Option<String>>;

fn build_dataset(rows: Vec<RawRow>, options: &LoadOptions) -> Result<EarthquakeDataset, LoadError> {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut records = Vec::with_capacity(rows.len());

    for (row_no, row) in rows.iter().enumerate() {
        match build_record(row_no, row, options)? {
            RowOutcome::Kept(rec) => records.push(*rec),
            RowOutcome::MissingValue => report.dropped_missing += 1,
            RowOutcome::BadTimestamp(err) => {
                report.dropped_timestamp += 1;
                if report.dropped_timestamp <= MAX_TIMESTAMP_WARNINGS {
                    log::warn!("row {row_no}: {err}; row dropped");
                }
            }
        }
    }

    if report.dropped_timestamp > MAX_TIMESTAMP_WARNINGS {
        log::warn!(
            "{} rows dropped for unparseable timestamps",
            report.dropped_timestamp
        );
    }
    if report.dropped_missing > 0 {
        log::info!("{} rows dropped for missing values", report.dropped_missing);
    }
    if records.is_empty() {
        return Err(LoadError::NoRows {
            rows_read: report.rows_read,
        });
    }

    Ok(EarthquakeDataset::from_records(records, report))
}

enum RowOutcome {
    Kept(Box<Record>),
    MissingValue,
    BadTimestamp(ParseError),
}

fn build_record(row_no: usize, row: &RawRow, options: &LoadOptions) -> Result<RowOutcome, LoadError> {
    let text = |col: &'static str| row.get(col).cloned().flatten();

    let mut numbers = [0.0_f64; 7];
    let numeric_cols = ["latitude", "longitude", "magnitude", "depth", "dmin", "gap", "sig"];
    for (slot, col) in numbers.iter_mut().zip(numeric_cols) {
        match parse_number(row_no, col, text(col))? {
            Some(v) => *slot = v,
            None => return Ok(RowOutcome::MissingValue),
        }
    }
    let [latitude, longitude, magnitude, depth, dmin, gap, sig] = numbers;

    let nst = match parse_number(row_no, "nst", text("nst"))? {
        Some(v) if v.fract() == 0.0 => v as i64,
        Some(v) => {
            return Err(LoadError::InvalidNumber {
                row: row_no,
                column: "nst".into(),
                value: v.to_string(),
            })
        }
        None => return Ok(RowOutcome::MissingValue),
    };

    let continent = text("continent");
    if options.drop_missing_continent && continent.is_none() {
        return Ok(RowOutcome::MissingValue);
    }

    let Some(raw_time) = text("date_time") else {
        return Ok(RowOutcome::MissingValue);
    };
    let year = match derive_year(&raw_time) {
        Ok(year) => year,
        Err(err) => return Ok(RowOutcome::BadTimestamp(err)),
    };

    Ok(RowOutcome::Kept(Box::new(Record {
        title: text("title").unwrap_or_default(),
        location: text("location"),
        date_time: raw_time.trim().to_string(),
        year,
        latitude,
        longitude,
        magnitude,
        depth,
        dmin,
        gap,
        sig,
        nst,
        alert: text("alert"),
        tsunami: text("tsunami"),
        net: text("net"),
        mag_type: text("magType"),
        continent,
        country: text("country"),
    })))
}

fn parse_number(row: usize, column: &str, value: Option<String>) -> Result<Option<f64>, LoadError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(LoadError::InvalidNumber {
            row,
            column: column.to_string(),
            value,
        }),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers = reader.headers()?.clone();

    let mut columns = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for col in REQUIRED_COLUMNS {
        let idx = headers
            .iter()
            .position(|h| h.trim() == col)
            .ok_or_else(|| LoadError::MissingColumn(col.to_string()))?;
        columns.push((col, idx));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = columns
            .iter()
            .map(|&(col, idx)| (col, record.get(idx).and_then(non_empty)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented layout (`df.to_json(orient='records')`). Absent keys and
/// `null` are both treated as missing values.
fn read_json(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))?;
    let records = root.as_array().ok_or_else(|| LoadError::InvalidRow {
        row: 0,
        reason: "expected a top-level JSON array".into(),
    })?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec.as_object().ok_or_else(|| LoadError::InvalidRow {
                row: i,
                reason: "not a JSON object".into(),
            })?;
            Ok(REQUIRED_COLUMNS
                .into_iter()
                .map(|col| (col, obj.get(col).and_then(json_to_text)))
                .collect())
        })
        .collect()
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => non_empty(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Every required column is cast to UTF-8 and then parsed like CSV text, so
/// integer, float, string and timestamp physical types are all accepted.
fn read_parquet(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let mut columns = Vec::with_capacity(REQUIRED_COLUMNS.len());
        for col in REQUIRED_COLUMNS {
            let idx = schema
                .index_of(col)
                .map_err(|_| LoadError::MissingColumn(col.to_string()))?;
            let as_text = cast(batch.column(idx), &DataType::Utf8)?;
            columns.push((col, as_text));
        }

        for row in 0..batch.num_rows() {
            let raw: RawRow = columns
                .iter()
                .map(|(col, array)| {
                    let value = array
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .filter(|s| !s.is_null(row))
                        .and_then(|s| non_empty(s.value(row)));
                    (*col, value)
                })
                .collect();
            rows.push(raw);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::{CategoricalField, NumericField};

    const HEADER: &str = "title,magnitude,date_time,cdi,mmi,alert,tsunami,sig,net,nst,dmin,gap,magType,depth,latitude,longitude,location,continent,country";

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parses_accepted_timestamp_layouts() {
        assert_eq!(derive_year("16-08-2023 12:47"), Ok(2023));
        assert_eq!(derive_year("2001-01-13T17:33:00Z"), Ok(2001));
        assert_eq!(derive_year("1999-09-21 01:47:12"), Ok(1999));
        assert_eq!(derive_year("2011-03-11"), Ok(2011));
        assert_eq!(
            derive_year("yesterday"),
            Err(ParseError {
                value: "yesterday".into()
            })
        );
    }

    #[test]
    fn loads_csv_and_derives_year() {
        let file = write_csv(
            "\"M 7.0 - Acandi, Colombia\",7.0,16-08-2023 12:47,8,7,green,0,768,us,117,0.509,17,mww,14,9.7963,159.596,\"Acandi, Colombia\",South America,Colombia\n\
             M 6.9 - Bengkulu,6.9,19-07-2023 00:22,4,4,,1,735,us,99,2.229,34,mww,25,-4.9559,100.738,,Asia,Indonesia\n",
        );
        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(ds.len(), 2);
        let first = &ds.records[0];
        assert_eq!(first.year, 2023);
        assert_eq!(first.nst, 117);
        assert_eq!(first.country.as_deref(), Some("Colombia"));
        assert_eq!(ds.records[1].alert, None);
        assert_eq!(ds.records[1].location, None);
        assert_eq!(ds.bounds(NumericField::Magnitude), Some((6.9, 7.0)));
        assert!(ds.unique_values[&CategoricalField::Alert].contains("green"));
        assert_eq!(ds.report.kept(), 2);
    }

    #[test]
    fn drops_bad_timestamps_and_missing_values() {
        let file = write_csv(
            "a,7.0,not a date,0,0,green,0,768,us,117,0.5,17,mww,14,9.7,159.5,x,Asia,Japan\n\
             b,6.5,2020-01-01 00:00,0,0,green,0,700,us,,0.5,17,mww,14,9.7,159.5,x,Asia,Japan\n\
             c,6.6,2020-01-01 00:00,0,0,green,0,700,us,50,0.5,17,mww,14,9.7,159.5,x,,\n\
             d,6.7,2021-05-01 00:00,0,0,green,0,700,us,50,0.5,17,mww,14,9.7,159.5,x,Asia,Japan\n",
        );

        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.report.dropped_timestamp, 1);
        assert_eq!(ds.report.dropped_missing, 1);

        let strict = LoadOptions {
            drop_missing_continent: true,
        };
        let ds = load_file(file.path(), &strict).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].title, "d");
        assert_eq!(ds.report.dropped_missing, 2);
    }

    #[test]
    fn rejects_malformed_sources() {
        let file = write_csv("a,big,2020-01-01,0,0,,0,1,us,1,1,1,mww,1,1,1,x,Asia,Japan\n");
        assert!(matches!(
            load_file(file.path(), &LoadOptions::default()),
            Err(LoadError::InvalidNumber { column, .. }) if column == "magnitude"
        ));

        let missing = Path::new("/definitely/not/here.csv");
        assert!(matches!(
            load_file(missing, &LoadOptions::default()),
            Err(LoadError::Io { .. })
        ));
        assert!(matches!(
            load_file(Path::new("quakes.xlsx"), &LoadOptions::default()),
            Err(LoadError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn rejects_missing_column_and_empty_result() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "title,magnitude").unwrap();
        writeln!(file, "a,1.0").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_file(file.path(), &LoadOptions::default()),
            Err(LoadError::MissingColumn(_))
        ));

        let only_bad = write_csv("a,7.0,garbage,0,0,,0,1,us,1,1,1,mww,1,1,1,x,Asia,Japan\n");
        assert!(matches!(
            load_file(only_bad.path(), &LoadOptions::default()),
            Err(LoadError::NoRows { rows_read: 1 })
        ));
    }

    #[test]
    fn loads_records_oriented_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"title":"t","magnitude":6.1,"date_time":"2004-12-26T00:58:53Z","alert":null,
                "tsunami":1,"sig":900,"net":"us","nst":60,"dmin":1.2,"gap":22.0,"magType":"mw",
                "depth":30.0,"latitude":3.3,"longitude":95.9,"location":"Sumatra",
                "continent":"Asia","country":"Indonesia"}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].year, 2004);
        assert_eq!(ds.records[0].tsunami.as_deref(), Some("1"));
        assert_eq!(ds.records[0].alert, None);
    }

    fn write_parquet(columns: Vec<(&str, ArrayRef)>) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(file.path()).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        file
    }

    fn parquet_columns() -> Vec<(&'static str, ArrayRef)> {
        let text = |v: Vec<Option<&str>>| -> ArrayRef { Arc::new(StringArray::from(v)) };
        let float = |v: Vec<f64>| -> ArrayRef { Arc::new(Float64Array::from(v)) };
        let int = |v: Vec<i64>| -> ArrayRef { Arc::new(Int64Array::from(v)) };
        vec![
            ("title", text(vec![Some("M 7.0 - Malango"), Some("M 6.9 - El Salvador")])),
            ("magnitude", float(vec![7.0, 6.9])),
            ("date_time", text(vec![Some("16-08-2023 12:47"), Some("2001-01-13T17:33:00Z")])),
            ("alert", text(vec![None, Some("green")])),
            ("tsunami", int(vec![0, 1])),
            ("sig", int(vec![768, 735])),
            ("net", text(vec![Some("us"), Some("us")])),
            ("nst", int(vec![40, 12])),
            ("dmin", float(vec![0.509, 0.0])),
            ("gap", float(vec![17.0, 25.0])),
            ("magType", text(vec![Some("mww"), Some("mwc")])),
            ("depth", float(vec![14.0, 60.0])),
            ("latitude", float(vec![-9.8, 13.0])),
            ("longitude", float(vec![159.6, -88.7])),
            ("location", text(vec![Some("Malango"), None])),
            ("continent", text(vec![Some("Oceania"), Some("North America")])),
            ("country", text(vec![None, Some("El Salvador")])),
        ]
    }

    #[test]
    fn loads_typed_parquet_columns() {
        let file = write_parquet(parquet_columns());
        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(ds.report.kept(), 2);
        let years: Vec<i32> = ds.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2001]);
        let nst: Vec<i64> = ds.records.iter().map(|r| r.nst).collect();
        assert_eq!(nst, vec![40, 12]);
        let tsunami: Vec<Option<&str>> = ds.records.iter().map(|r| r.tsunami.as_deref()).collect();
        assert_eq!(tsunami, vec![Some("0"), Some("1")]);
        let alert: Vec<Option<&str>> = ds.records.iter().map(|r| r.alert.as_deref()).collect();
        assert_eq!(alert, vec![None, Some("green")]);

        assert_eq!(ds.records[0].date_time, "16-08-2023 12:47");
        assert_eq!(ds.records[0].country, None);
        assert_eq!(ds.records[1].location, None);
        assert_eq!(ds.records[1].sig, 735.0);
        assert_eq!(ds.bounds(NumericField::Magnitude), Some((6.9, 7.0)));
    }

    #[test]
    fn parquet_without_a_required_column_fails() {
        let columns: Vec<_> = parquet_columns()
            .into_iter()
            .filter(|(name, _)| *name != "gap")
            .collect();
        let file = write_parquet(columns);
        assert!(matches!(
            load_file(file.path(), &LoadOptions::default()),
            Err(LoadError::MissingColumn(col)) if col == "gap"
        ));
    }
}
