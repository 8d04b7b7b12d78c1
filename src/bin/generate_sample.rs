use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

const ROWS: usize = 800;
const CSV_PATH: &str = "earthquake_data.csv";
const PARQUET_PATH: &str = "earthquake_data.parquet";

/// (continent, country, latitude, longitude, network)
const REGIONS: [(&str, &str, f64, f64, &str); 8] = [
    ("Asia", "Japan", 37.5, 142.0, "us"),
    ("Asia", "Indonesia", -3.0, 120.0, "us"),
    ("South America", "Chile", -30.0, -71.5, "us"),
    ("South America", "Peru", -12.0, -76.0, "us"),
    ("North America", "United States of America", 55.0, -155.0, "ak"),
    ("North America", "Mexico", 17.0, -99.0, "us"),
    ("Europe", "Italy", 42.5, 13.5, "us"),
    ("Oceania", "Vanuatu", -16.0, 168.0, "us"),
];

const MAG_TYPES: [&str; 4] = ["mww", "mwc", "mb", "ms"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Default)]
struct Columns {
    title: Vec<String>,
    magnitude: Vec<f64>,
    date_time: Vec<String>,
    alert: Vec<Option<&'static str>>,
    tsunami: Vec<i64>,
    sig: Vec<i64>,
    net: Vec<&'static str>,
    nst: Vec<i64>,
    dmin: Vec<f64>,
    gap: Vec<f64>,
    mag_type: Vec<&'static str>,
    depth: Vec<f64>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    location: Vec<String>,
    continent: Vec<Option<&'static str>>,
    country: Vec<Option<&'static str>>,
}

fn round(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

fn generate(rng: &mut SimpleRng) -> Result<Columns> {
    let start = NaiveDate::from_ymd_opt(2001, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start date")?;
    let span_minutes = 22 * 365 * 24 * 60;

    let mut cols = Columns::default();
    for _ in 0..ROWS {
        let (continent, country, lat, lon, net) = REGIONS[rng.pick(REGIONS.len())];
        // Gutenberg-Richter-ish: most events near the 6.5 floor
        let magnitude = round(6.5 + (-rng.next_f64().max(1e-9).ln() * 0.45).min(2.6), 1);
        let depth = round((rng.gauss(0.0, 1.0).abs() * 90.0 + 5.0).min(670.0), 1);
        let latitude = round((lat + rng.gauss(0.0, 3.0)).clamp(-90.0, 90.0), 4);
        let longitude = round((lon + rng.gauss(0.0, 3.0)).clamp(-180.0, 180.0), 4);
        let when = start + Duration::minutes(rng.pick(span_minutes) as i64);

        let alert = match magnitude {
            m if m >= 8.0 => Some("red"),
            m if m >= 7.5 => Some("orange"),
            m if m >= 7.0 => Some("yellow"),
            _ if rng.next_f64() < 0.5 => Some("green"),
            _ => None,
        };
        // A few rows without continent, like offshore events in the real data
        let offshore = rng.next_f64() < 0.08;

        cols.title.push(format!("M {magnitude:.1} - {country}"));
        cols.magnitude.push(magnitude);
        cols.date_time.push(when.format("%d-%m-%Y %H:%M").to_string());
        cols.alert.push(alert);
        cols.tsunami.push(i64::from(depth < 70.0 && rng.next_f64() < 0.4));
        cols.sig.push((magnitude * 110.0 + rng.uniform(0.0, 300.0)).round() as i64);
        cols.net.push(net);
        cols.nst.push(rng.pick(600) as i64);
        cols.dmin.push(round(rng.uniform(0.0, 8.0), 3));
        cols.gap.push(round(rng.uniform(5.0, 240.0), 1));
        cols.mag_type.push(MAG_TYPES[rng.pick(MAG_TYPES.len())]);
        cols.depth.push(depth);
        cols.latitude.push(latitude);
        cols.longitude.push(longitude);
        cols.location.push(format!("{:.0} km from {country}", rng.uniform(5.0, 300.0)));
        cols.continent.push(if offshore { None } else { Some(continent) });
        cols.country.push(if offshore { None } else { Some(country) });
    }
    Ok(cols)
}

fn write_csv(cols: &Columns) -> Result<()> {
    let mut writer = csv::Writer::from_path(CSV_PATH).with_context(|| format!("creating {CSV_PATH}"))?;
    writer.write_record([
        "title", "magnitude", "date_time", "alert", "tsunami", "sig", "net", "nst", "dmin", "gap",
        "magType", "depth", "latitude", "longitude", "location", "continent", "country",
    ])?;
    for i in 0..cols.title.len() {
        writer.write_record([
            cols.title[i].clone(),
            cols.magnitude[i].to_string(),
            cols.date_time[i].clone(),
            cols.alert[i].unwrap_or_default().to_string(),
            cols.tsunami[i].to_string(),
            cols.sig[i].to_string(),
            cols.net[i].to_string(),
            cols.nst[i].to_string(),
            cols.dmin[i].to_string(),
            cols.gap[i].to_string(),
            cols.mag_type[i].to_string(),
            cols.depth[i].to_string(),
            cols.latitude[i].to_string(),
            cols.longitude[i].to_string(),
            cols.location[i].clone(),
            cols.continent[i].unwrap_or_default().to_string(),
            cols.country[i].unwrap_or_default().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(cols: &Columns) -> Result<()> {
    let text = |name: &str| Field::new(name, DataType::Utf8, true);
    let float = |name: &str| Field::new(name, DataType::Float64, false);
    let int = |name: &str| Field::new(name, DataType::Int64, false);

    let schema = Arc::new(Schema::new(vec![
        text("title"),
        float("magnitude"),
        text("date_time"),
        text("alert"),
        int("tsunami"),
        int("sig"),
        text("net"),
        int("nst"),
        float("dmin"),
        float("gap"),
        text("magType"),
        float("depth"),
        float("latitude"),
        float("longitude"),
        text("location"),
        text("continent"),
        text("country"),
    ]));

    let strings = |v: &[String]| -> ArrayRef {
        Arc::new(StringArray::from(v.iter().map(String::as_str).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        strings(&cols.title),
        Arc::new(Float64Array::from(cols.magnitude.clone())),
        strings(&cols.date_time),
        Arc::new(StringArray::from(cols.alert.clone())),
        Arc::new(Int64Array::from(cols.tsunami.clone())),
        Arc::new(Int64Array::from(cols.sig.clone())),
        Arc::new(StringArray::from(cols.net.clone())),
        Arc::new(Int64Array::from(cols.nst.clone())),
        Arc::new(Float64Array::from(cols.dmin.clone())),
        Arc::new(Float64Array::from(cols.gap.clone())),
        Arc::new(StringArray::from(cols.mag_type.clone())),
        Arc::new(Float64Array::from(cols.depth.clone())),
        Arc::new(Float64Array::from(cols.latitude.clone())),
        Arc::new(Float64Array::from(cols.longitude.clone())),
        strings(&cols.location),
        Arc::new(StringArray::from(cols.continent.clone())),
        Arc::new(StringArray::from(cols.country.clone())),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(PARQUET_PATH).with_context(|| format!("creating {PARQUET_PATH}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let cols = generate(&mut rng)?;

    write_csv(&cols)?;
    write_parquet(&cols)?;

    println!("Wrote {} earthquakes to {CSV_PATH} and {PARQUET_PATH}", cols.title.len());
    Ok(())
}
