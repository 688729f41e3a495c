use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    Result, VolleyError, DEFAULT_CONNECTIONS, DEFAULT_METHOD, DEFAULT_TEST_DURATION,
    DEFAULT_TIMEOUT,
};

/// HTTP header sent with every request. A spec may repeat a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// How a test run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    /// Stop once the wall-clock duration has elapsed.
    ByDuration(Duration),
    /// Stop once this many requests have completed.
    ByRequestCount(u64),
}

/// HTTP client implementation that executed the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientType {
    /// Embedded fast HTTP/1.1 client.
    #[default]
    FastHttp,
    /// Standard client with HTTP/1.x forced.
    NetHttp1,
    /// Standard client, HTTP/2 negotiated when the server offers it.
    NetHttp2,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientType::FastHttp => "fasthttp",
            ClientType::NetHttp1 => "net/http v1.x",
            ClientType::NetHttp2 => "net/http v2.0",
        };
        f.write_str(name)
    }
}

/// Configuration of one load-test run. Built before the run starts and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub number_of_connections: u64,
    pub test_type: TestType,

    pub method: String,
    pub url: String,
    /// Sent in this order.
    pub headers: Vec<Header>,

    pub body: Option<String>,
    pub body_file_path: Option<PathBuf>,

    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,

    pub stream: bool,
    pub timeout: Duration,
    pub client_type: ClientType,

    /// Requests per second; `None` means as fast as possible.
    pub rate: Option<u64>,
}

impl Spec {
    /// Spec for `url` with the default connection count, duration, method and timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            number_of_connections: DEFAULT_CONNECTIONS,
            test_type: TestType::ByDuration(DEFAULT_TEST_DURATION),
            method: DEFAULT_METHOD.to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            body_file_path: None,
            cert_path: None,
            key_path: None,
            stream: false,
            timeout: DEFAULT_TIMEOUT,
            client_type: ClientType::default(),
            rate: None,
        }
    }

    /// Returns `true` if the test was limited by time.
    pub fn is_timed_test(&self) -> bool {
        matches!(self.test_type, TestType::ByDuration(_))
    }

    /// Returns `true` if the test was limited by the number of requests.
    pub fn is_test_with_number_of_reqs(&self) -> bool {
        matches!(self.test_type, TestType::ByRequestCount(_))
    }

    pub fn is_fast_http(&self) -> bool {
        self.client_type == ClientType::FastHttp
    }

    pub fn is_net_http_v1(&self) -> bool {
        self.client_type == ClientType::NetHttp1
    }

    pub fn is_net_http_v2(&self) -> bool {
        self.client_type == ClientType::NetHttp2
    }

    pub fn number_of_requests(&self) -> Option<u64> {
        match self.test_type {
            TestType::ByRequestCount(n) => Some(n),
            TestType::ByDuration(_) => None,
        }
    }

    pub fn test_duration(&self) -> Option<Duration> {
        match self.test_type {
            TestType::ByDuration(d) => Some(d),
            TestType::ByRequestCount(_) => None,
        }
    }

    /// Reject specs no run could satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_connections == 0 {
            return Err(VolleyError::NoConnections);
        }
        match self.test_type {
            TestType::ByRequestCount(0) => return Err(VolleyError::ZeroRequests),
            TestType::ByDuration(d) if d.is_zero() => return Err(VolleyError::ZeroDuration),
            _ => {}
        }
        if self.rate == Some(0) {
            return Err(VolleyError::ZeroRate);
        }
        if self.url.trim().is_empty() {
            return Err(VolleyError::EmptyUrl);
        }
        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(VolleyError::IncompleteClientCertificate);
        }
        Ok(())
    }
}
