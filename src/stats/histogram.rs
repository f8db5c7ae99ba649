//! Fixed-bin histograms

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::finite_values;
use crate::error::{TelemetryError, TelemetryResult};

/// Number of decimal places the histogram edges are rounded to
pub const HISTOGRAM_ROUNDING: i32 = 6;

/// Equal-width histogram over `[min, max]`, the exact range of the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub n_bins: usize,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Total number of values counted across all bins
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Lower and upper edge of every bin, in order, rounded to
    /// [`HISTOGRAM_ROUNDING`] decimals for display.
    pub fn bin_edges(&self) -> Vec<(f64, f64)> {
        let width = self.bin_width();
        (0..self.n_bins)
            .map(|i| {
                let lower = self.min + width * i as f64;
                let upper = if i + 1 == self.n_bins { self.max } else { lower + width };
                (round_edge(lower), round_edge(upper))
            })
            .collect()
    }
}

fn round_edge(value: f64) -> f64 {
    let scale = 10f64.powi(HISTOGRAM_ROUNDING);
    (value * scale).round() / scale
}

/// Builds a histogram of the finite values of `values`.
///
/// The interval between the smallest and largest value is split into
/// `n_bins` equal bins. Bins are half-open `[lo, hi)` except the last, which
/// is closed so the maximum is counted. When all values are equal they all
/// land in the first bin.
pub fn histogram(values: &[f32], n_bins: usize) -> TelemetryResult<Histogram> {
    if n_bins == 0 {
        return Err(TelemetryError::InvalidInput("histogram bin count must be at least 1".to_string()));
    }

    let mut counts = vec![0u64; n_bins];
    let (lo, hi) = finite_values(values).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if lo > hi {
        // no finite values
        return Ok(Histogram { min: 0.0, max: 0.0, n_bins, counts });
    }

    if lo == hi {
        counts[0] = finite_values(values).count() as u64;
        return Ok(Histogram { min: lo, max: hi, n_bins, counts });
    }

    let width = (hi - lo) / n_bins as f64;
    for v in finite_values(values) {
        let index = ((v - lo) / width).floor() as usize;
        counts[index.min(n_bins - 1)] += 1;
    }

    Ok(Histogram { min: lo, max: hi, n_bins, counts })
}

/// Histograms for every named array, keyed by name.
pub fn histograms(arrays: &[(String, &[f32])], n_bins: usize) -> TelemetryResult<BTreeMap<String, Histogram>> {
    arrays
        .iter()
        .map(|(name, values)| Ok((name.clone(), histogram(values, n_bins)?)))
        .collect()
}
