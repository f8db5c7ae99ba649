//! Mean, standard deviation and mean magnitude

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::finite_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryType {
    Mean,
    Stdev,
    MeanMagnitude,
}

/// Arithmetic mean of the finite values, 0 for an empty array.
pub fn mean(values: &[f32]) -> f64 {
    let (count, sum) = finite_values(values).fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + v));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sample standard deviation (n - 1 denominator).
///
/// Uses Welford's update so large arrays of similar values don't lose
/// precision. Fewer than two finite values yield 0.
pub fn stdev(values: &[f32]) -> f64 {
    let mut count = 0usize;
    let mut running_mean = 0.0f64;
    let mut m2 = 0.0f64;

    for v in finite_values(values) {
        count += 1;
        let delta = v - running_mean;
        running_mean += delta / count as f64;
        m2 += delta * (v - running_mean);
    }

    if count < 2 {
        0.0
    } else {
        (m2 / (count - 1) as f64).sqrt()
    }
}

/// Mean absolute value: sum(|x|) / count.
pub fn mean_magnitude(values: &[f32]) -> f64 {
    let (count, sum) = finite_values(values).fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + v.abs()));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Computes one summary statistic for every named array.
pub fn summarize(arrays: &[(String, &[f32])], summary: SummaryType) -> BTreeMap<String, f64> {
    let stat: fn(&[f32]) -> f64 = match summary {
        SummaryType::Mean => mean,
        SummaryType::Stdev => stdev,
        SummaryType::MeanMagnitude => mean_magnitude,
    };

    arrays
        .iter()
        .map(|(name, values)| (name.clone(), stat(values)))
        .collect()
}
