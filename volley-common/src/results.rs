use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::histogram::FrequencyTable;
use crate::spec::Spec;

/// One distinct error message and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorWithCount {
    pub error: String,
    pub count: u64,
}

impl ErrorWithCount {
    pub fn new(error: impl Into<String>, count: u64) -> Self {
        Self { error: error.into(), count }
    }
}

/// Response counters bucketed by status class.
///
/// | Outcome                  | Counters incremented          |
/// |--------------------------|-------------------------------|
/// | 1xx .. 4xx               | class counter, `by_code`      |
/// | 502                      | `req5xx`, `req502`, `by_code` |
/// | other 5xx                | `req5xx`, `by_code`           |
/// | code outside 100..=599   | `others`, `by_code`           |
/// | no HTTP status obtained  | `others`                      |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub req1xx: u64,
    pub req2xx: u64,
    pub req3xx: u64,
    pub req4xx: u64,
    pub req5xx: u64,
    pub req502: u64,
    pub others: u64,
    pub by_code: BTreeMap<u16, u64>,
}

impl StatusCounts {
    /// Count a response that carried status `code`.
    pub fn record(&mut self, code: u16) {
        *self.by_code.entry(code).or_default() += 1;
        match code / 100 {
            1 => self.req1xx += 1,
            2 => self.req2xx += 1,
            3 => self.req3xx += 1,
            4 => self.req4xx += 1,
            5 => {
                self.req5xx += 1;
                if code == 502 {
                    self.req502 += 1;
                }
            }
            _ => self.others += 1,
        }
    }

    /// Count an outcome that produced no HTTP status at all.
    pub fn record_non_conformant(&mut self) {
        self.others += 1;
    }

    /// Every counted outcome; 502s are already inside `req5xx`.
    pub fn total(&self) -> u64 {
        self.req1xx + self.req2xx + self.req3xx + self.req4xx + self.req5xx + self.others
    }
}

/// What a finished run measured. Only meaningful once the run has terminated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results<L = FrequencyTable<u64>, R = FrequencyTable<f64>> {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub time_taken: Duration,

    pub statuses: StatusCounts,
    /// Not sorted; see [`Results::errors_by_frequency`].
    pub errors: Vec<ErrorWithCount>,

    /// Request latencies in microseconds.
    pub latencies: L,
    /// Requests per second, one sample per measurement window.
    pub requests: R,
}

impl<L, R> Results<L, R> {
    /// Total throughput (read + write) in bytes per second.
    ///
    /// A zero `time_taken` yields a non-finite value.
    pub fn throughput(&self) -> f64 {
        self.bytes_read.saturating_add(self.bytes_written) as f64 / self.time_taken.as_secs_f64()
    }

    /// Errors with the most frequent first, ties broken by message.
    pub fn errors_by_frequency(&self) -> Vec<&ErrorWithCount> {
        let mut errors: Vec<&ErrorWithCount> = self.errors.iter().collect();
        errors.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
        errors
    }
}

/// The spec a test ran with alongside what it measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInfo<L = FrequencyTable<u64>, R = FrequencyTable<f64>> {
    pub spec: Spec,
    pub result: Results<L, R>,
}
