//! Point statistics over bucketed load-test measurements.
//!
//! Histograms are consumed through [`ReadonlyHistogram`]; nothing here mutates them,
//! so concurrent calls over the same frozen histogram always agree.

use serde::{Deserialize, Serialize};
use volley_common::{ReadonlyHistogram, Results};

pub mod engine;
pub mod percentiles;

pub use engine::{compute_stats, compute_stats_with};
pub use percentiles::Percentiles;

/// Percentiles a report asks for when the caller has no preference.
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.9, 0.95, 0.99];

/// Summary statistics of one histogram, in the histogram's native unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats<V> {
    pub mean: f64,
    pub stddev: f64,
    pub max: f64,
    pub percentiles: Percentiles<V>,
}

/// Latency statistics in microseconds.
pub type LatenciesStats = Stats<u64>;

/// Request-rate statistics in requests per second.
pub type RequestsStats = Stats<f64>;

/// Statistics derived from a finished run's histograms.
pub trait ResultsStats {
    fn latencies_stats(&self, percentiles: &[f64]) -> Option<LatenciesStats>;

    /// Non-finite rate samples are left out.
    fn requests_stats(&self, percentiles: &[f64]) -> Option<RequestsStats>;
}

impl<L, R> ResultsStats for Results<L, R>
where
    L: ReadonlyHistogram<Key = u64>,
    R: ReadonlyHistogram<Key = f64>,
{
    fn latencies_stats(&self, percentiles: &[f64]) -> Option<LatenciesStats> {
        compute_stats(&self.latencies, percentiles)
    }

    fn requests_stats(&self, percentiles: &[f64]) -> Option<RequestsStats> {
        compute_stats(&self.requests, percentiles)
    }
}
