use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod histogram;
pub mod results;
pub mod spec;

pub use histogram::{FrequencyTable, HistogramKey, ReadonlyHistogram};
pub use results::{ErrorWithCount, Results, StatusCounts, TestInfo};
pub use spec::{ClientType, Header, Spec, TestType};

pub const DEFAULT_CONNECTIONS: u64 = 125;
pub const DEFAULT_TEST_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_METHOD: &str = "GET";

/// Error types for Volley operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolleyError {
    #[error("Number of connections must be at least 1")]
    NoConnections,

    #[error("Number of requests must be at least 1")]
    ZeroRequests,

    #[error("Test duration must be greater than zero")]
    ZeroDuration,

    #[error("Request rate must be at least 1 request per second")]
    ZeroRate,

    #[error("Target URL must not be empty")]
    EmptyUrl,

    #[error("Client certificate and key must be provided together")]
    IncompleteClientCertificate,

    #[error("Invalid percentile: {0}")]
    InvalidPercentile(String),

    #[error("Failed to read snapshot: {0}")]
    SnapshotRead(String),

    #[error("Failed to decode snapshot: {0}")]
    SnapshotDecode(String),

    #[error("Failed to write summary: {0}")]
    SummaryWrite(String),
}

/// Result type for Volley operations
pub type Result<T> = std::result::Result<T, VolleyError>;
