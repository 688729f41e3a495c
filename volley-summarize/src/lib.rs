use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use volley_common::{
    ClientType, ErrorWithCount, ReadonlyHistogram, Result, StatusCounts, TestInfo, TestType,
    VolleyError,
};
use volley_stats::{LatenciesStats, RequestsStats, ResultsStats, DEFAULT_PERCENTILES};

pub mod config;
use config::PERCENTILE_SEPARATOR;

/// Machine-readable statistics of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub url: String,
    pub method: String,
    pub connections: u64,
    pub client: ClientType,
    pub test_type: TestType,
    pub rate: Option<u64>,

    pub time_taken: Duration,
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Bytes per second; `None` when the run took no measurable time.
    pub throughput: Option<f64>,

    pub statuses: StatusCounts,
    /// Most frequent first.
    pub errors: Vec<ErrorWithCount>,

    /// `None` until at least one latency sample exists.
    pub latency: Option<LatenciesStats>,
    pub requests: Option<RequestsStats>,
}

/// Read a JSON snapshot of a finished run.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<TestInfo> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| VolleyError::SnapshotRead(format!("{}: {e}", path.display())))?;
    let snapshot: TestInfo =
        serde_json::from_str(&contents).map_err(|e| VolleyError::SnapshotDecode(e.to_string()))?;
    info!(
        path = %path.display(),
        url = %snapshot.spec.url,
        latency_buckets = snapshot.result.latencies.len(),
        request_buckets = snapshot.result.requests.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Parse a comma-separated list of fractions such as `"0.5, 0.9,0.99"`.
///
/// Empty items are skipped. Values outside `[0, 1]` are kept; the statistics engine
/// drops them.
pub fn parse_percentiles(list: &str) -> Result<Vec<f64>> {
    list.split(PERCENTILE_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| VolleyError::InvalidPercentile(item.to_string()))
        })
        .collect()
}

/// The percentiles to report: `list` when given, otherwise [`DEFAULT_PERCENTILES`].
pub fn requested_percentiles(list: Option<&str>) -> Result<Vec<f64>> {
    match list {
        Some(list) => parse_percentiles(list),
        None => Ok(DEFAULT_PERCENTILES.to_vec()),
    }
}

/// Derive the summary of `info` for the requested percentiles.
pub fn summarize<L, R>(info: &TestInfo<L, R>, percentiles: &[f64]) -> Summary
where
    L: ReadonlyHistogram<Key = u64>,
    R: ReadonlyHistogram<Key = f64>,
{
    let spec = &info.spec;
    let result = &info.result;

    let throughput = Some(result.throughput()).filter(|t| t.is_finite());
    if throughput.is_none() {
        debug!(time_taken = ?result.time_taken, "throughput is not finite, leaving it out");
    }

    Summary {
        url: spec.url.clone(),
        method: spec.method.clone(),
        connections: spec.number_of_connections,
        client: spec.client_type,
        test_type: spec.test_type,
        rate: spec.rate,
        time_taken: result.time_taken,
        bytes_read: result.bytes_read,
        bytes_written: result.bytes_written,
        throughput,
        statuses: result.statuses.clone(),
        errors: result.errors_by_frequency().into_iter().cloned().collect(),
        latency: result.latencies_stats(percentiles),
        requests: result.requests_stats(percentiles),
    }
}

/// Write `summary` as one JSON document followed by a newline.
pub fn write_summary<W: Write>(mut writer: W, summary: &Summary, pretty: bool) -> Result<()> {
    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, summary)
    } else {
        serde_json::to_writer(&mut writer, summary)
    };
    written.map_err(|e| VolleyError::SummaryWrite(e.to_string()))?;
    writeln!(writer).map_err(|e| VolleyError::SummaryWrite(e.to_string()))?;
    writer.flush().map_err(|e| VolleyError::SummaryWrite(e.to_string()))
}
