use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            to_color32(Hsl::new(hue, 0.75, 0.55).into_color())
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Continuous scale: numeric value → Color32
// ---------------------------------------------------------------------------

/// Position of `value` within `[lo, hi]` on a yellow → red scale.
pub fn scale_color(value: f64, lo: f64, hi: f64) -> Color32 {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0) as f32
    } else {
        0.5
    };
    let low: Hsl = Hsl::new(55.0, 0.95, 0.6);
    let high: Hsl = Hsl::new(0.0, 0.85, 0.42);
    to_color32(low.mix(high, t).into_color())
}

/// Splits `[lo, hi]` into `n` equal bands so points can be drawn as a few
/// coloured series instead of one series per point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueBands {
    pub lo: f64,
    pub hi: f64,
    pub n: usize,
}

impl ValueBands {
    pub fn new(lo: f64, hi: f64, n: usize) -> Self {
        Self { lo, hi, n: n.max(1) }
    }

    pub fn band_of(&self, value: f64) -> usize {
        if self.hi <= self.lo {
            return 0;
        }
        let t = ((value - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0);
        ((t * self.n as f64) as usize).min(self.n - 1)
    }

    /// `(low, high)` bounds of band `i`.
    pub fn bounds(&self, i: usize) -> (f64, f64) {
        let width = (self.hi - self.lo) / self.n as f64;
        (self.lo + i as f64 * width, self.lo + (i + 1) as f64 * width)
    }

    pub fn color(&self, i: usize) -> Color32 {
        let (a, b) = self.bounds(i);
        scale_color((a + b) / 2.0, self.lo, self.hi)
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Maps unique values of a categorical column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the unique values of a column.
    pub fn new(unique_values: &BTreeSet<String>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping: BTreeMap<String, Color32> = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a category label; unknown and missing values are grey.
    pub fn color_for(&self, value: &str) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}
