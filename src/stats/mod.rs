//! Summary statistics and histograms over named parameter arrays
//!
//! Everything in here is a pure function of its inputs: no state is kept
//! between calls, so separate collectors can summarize disjoint arrays
//! concurrently.

pub mod histogram;
pub mod summary;

pub use histogram::{histogram, histograms, Histogram, HISTOGRAM_ROUNDING};
pub use summary::{mean, mean_magnitude, stdev, summarize, SummaryType};

use serde::{Deserialize, Serialize};

/// The three families of arrays a report can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatsType {
    Parameters,
    Updates,
    Activations,
}

impl StatsType {
    pub const ALL: [StatsType; 3] = [StatsType::Parameters, StatsType::Updates, StatsType::Activations];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsType::Parameters => "parameters",
            StatsType::Updates => "updates",
            StatsType::Activations => "activations",
        }
    }
}

/// Iterator over the finite values of a slice, widened to `f64`.
pub(crate) fn finite_values(values: &[f32]) -> impl Iterator<Item = f64> + '_ {
    values.iter().map(|&v| v as f64).filter(|v| v.is_finite())
}
