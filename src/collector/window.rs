//! Counters, rates and reclamation deltas between two reports

use std::collections::HashMap;

use crate::report::{GcStats, PerformanceStats};
use crate::system::GcSample;

/// Examples and minibatches seen since the previous update report.
///
/// A window is replaced wholesale when a report is emitted, so the
/// counters and the time they were counted from always move together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportingWindow {
    /// Timestamp of the report that opened this window; `None` before the first report
    pub start_ms: Option<i64>,
    /// Iteration of the report that opened this window
    pub start_iteration: Option<u64>,
    pub examples: u64,
    pub minibatches: u64,
}

impl ReportingWindow {
    pub fn starting_at(timestamp_ms: i64, iteration: u64) -> Self {
        Self {
            start_ms: Some(timestamp_ms),
            start_iteration: Some(iteration),
            examples: 0,
            minibatches: 0,
        }
    }

    pub fn record_minibatch(&mut self, examples: usize) {
        self.examples += examples as u64;
        self.minibatches += 1;
    }

    /// Milliseconds since the window opened
    pub fn elapsed_ms(&self, now_ms: i64) -> Option<i64> {
        self.start_ms.map(|start| now_ms - start)
    }

    /// Examples and minibatches per second over this window.
    ///
    /// Zero when no window is open yet (first report) or when no time has
    /// passed, so the division never sees an empty interval.
    pub fn rates(&self, now_ms: i64) -> Rates {
        match self.elapsed_ms(now_ms) {
            Some(elapsed) if elapsed > 0 => Rates {
                examples_per_second: 1000.0 * self.examples as f64 / elapsed as f64,
                minibatches_per_second: 1000.0 * self.minibatches as f64 / elapsed as f64,
            },
            _ => Rates::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub examples_per_second: f64,
    pub minibatches_per_second: f64,
}

/// Counters that are never reset during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub init_ms: Option<i64>,
    pub examples: u64,
    pub minibatches: u64,
}

impl RunTotals {
    pub fn record_minibatch(&mut self, examples: usize) {
        self.examples += examples as u64;
        self.minibatches += 1;
    }

    pub fn performance(&self, now_ms: i64, rates: Rates) -> PerformanceStats {
        PerformanceStats {
            total_runtime_ms: self.init_ms.map(|init| now_ms - init).unwrap_or(0),
            total_examples: self.examples,
            total_minibatches: self.minibatches,
            examples_per_second: rates.examples_per_second,
            minibatches_per_second: rates.minibatches_per_second,
        }
    }
}

/// Turns cumulative reclamation counters into per-report deltas
#[derive(Debug, Clone, Default)]
pub struct GcTracker {
    last: Option<HashMap<String, (u64, u64)>>,
}

impl GcTracker {
    pub fn has_baseline(&self) -> bool {
        self.last.is_some()
    }

    /// Returns the delta of every source seen at the previous call as well.
    ///
    /// The first call only records a baseline. Sources that appear later
    /// start their own baseline, sources that disappear are forgotten, and a
    /// source whose counters went backwards is re-baselined instead of
    /// reporting a negative delta.
    pub fn observe(&mut self, samples: &[GcSample]) -> Vec<GcStats> {
        let mut deltas = Vec::new();

        if let Some(last) = &self.last {
            for sample in samples {
                match last.get(&sample.name) {
                    Some(&(count, time_ms)) if sample.count >= count && sample.time_ms >= time_ms => {
                        deltas.push(GcStats {
                            name: sample.name.clone(),
                            delta_count: sample.count - count,
                            delta_time_ms: sample.time_ms - time_ms,
                        });
                    }
                    Some(_) => {
                        tracing::debug!(source = %sample.name, "reclamation counters went backwards, re-baselining");
                    }
                    None => {
                        tracing::debug!(source = %sample.name, "new reclamation source");
                    }
                }
            }
        }

        self.last = Some(
            samples
                .iter()
                .map(|s| (s.name.clone(), (s.count, s.time_ms)))
                .collect(),
        );
        deltas
    }
}
