//! ND client request accounting.

use std::fmt::{self, Write as _};

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Outcome of one ND request, as exported in the `status` label.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    NotFound,
    Timeout,
    RateLimited,
    SendRequestError,
    ReadResponseError,
    InvalidResponse,
}

impl RequestStatus {
    pub const ALL: [Self; 7] = [
        Self::Success,
        Self::NotFound,
        Self::Timeout,
        Self::RateLimited,
        Self::SendRequestError,
        Self::ReadResponseError,
        Self::InvalidResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::SendRequestError => "send_request_error",
            Self::ReadResponseError => "read_response_error",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EncodeLabelValue for RequestStatus {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> Result<(), fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabel {
    pub status: RequestStatus,
}

/// Where the client reports outcomes. Implementations must be cheap and
/// safe to call from many tasks at once.
pub trait MetricsSink: Send + Sync + 'static {
    fn observe_requests(&self, count: u64, status: RequestStatus);
}

/// Prometheus-backed sink.
#[derive(Clone, Debug, Default)]
pub struct NdMetrics {
    requests: Family<StatusLabel, Counter>,
}

impl NdMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the sink and register its counters in `registry`.
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::new();
        registry.register(
            "nd_client_requests",
            "Namespaced-data requests by outcome",
            metrics.requests.clone(),
        );
        metrics
    }

    /// Current value of the counter for `status`.
    pub fn requests(&self, status: RequestStatus) -> u64 {
        self.requests.get_or_create(&StatusLabel { status }).get()
    }

    pub fn total(&self) -> u64 {
        RequestStatus::ALL.iter().map(|s| self.requests(*s)).sum()
    }
}

impl MetricsSink for NdMetrics {
    fn observe_requests(&self, count: u64, status: RequestStatus) {
        self.requests.get_or_create(&StatusLabel { status }).inc_by(count);
    }
}

/// Discards every observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn observe_requests(&self, _count: u64, _status: RequestStatus) {}
}

/* --------------------------------- Tests -------------------------------- */
