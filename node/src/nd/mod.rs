//! ND ("namespaced data") request/response protocol.
//!
//! A client asks a peer for every share of one namespace in a block,
//! identified by its DA header hash. The peer answers with a status and then
//! one proven row per row root whose namespace window covers the query.
//!
//! - [`client::Client::request_nd`]: fetch and classify one request
//! - [`server::Server`]: answer requests from an [`server::EdsStore`]
//! - [`shares::NamespacedShares::verify`]: check an answer against a header

pub mod client;
pub mod metrics;
pub mod server;
pub mod shares;
pub mod transport;
pub mod wire;

use std::time::Duration;

use dasquare_native::namespace::NamespaceError;
use serde::{Deserialize, Serialize};

pub use client::Client;
pub use metrics::{MetricsSink, NdMetrics, NoopMetrics, RequestStatus};
pub use server::{EdsStore, MemoryStore, Server};
pub use shares::{NamespacedRow, NamespacedShares};
pub use transport::{Host, PeerId, ProtocolId, Stream};

/// Protocol suffix; the full id is `/{network}/nd/v0.0.1`.
pub const PROTOCOL_STRING: &str = "/nd/v0.0.1";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nd: data not found")]
    NotFound,
    #[error("nd: request rate limited by peer")]
    RateLimited,
    #[error("nd: invalid response")]
    InvalidResponse,
    #[error("nd: deadline exceeded")]
    DeadlineExceeded,
    #[error("nd: writing request: {0}")]
    SendRequest(#[source] wire::WireError),
    #[error("nd: reading response: {0}")]
    ReadResponse(#[source] wire::WireError),
    #[error("nd: opening stream: {0}")]
    OpenStream(#[source] std::io::Error),
    #[error("nd: row proof: {0}")]
    Codec(String),
    #[error("nd: {0}")]
    InvalidNamespace(#[from] NamespaceError),
    #[error("nd: invalid parameters: {0}")]
    InvalidParameters(&'static str),
}

/* ------------------------------ Parameters ------------------------------ */

/// Timeouts and limits shared by both sides of the protocol. Durations are
/// millisecond integers in configuration files; zero disables a timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// How long the server waits for a request.
    #[serde(rename = "server_read_timeout_ms", with = "duration_ms")]
    pub server_read_timeout: Duration,
    /// How long the server may spend writing its response.
    #[serde(rename = "server_write_timeout_ms", with = "duration_ms")]
    pub server_write_timeout: Duration,
    /// Budget for the server-side store lookup.
    #[serde(rename = "handle_request_timeout_ms", with = "duration_ms")]
    pub handle_request_timeout: Duration,
    /// Requests served at once; further streams are closed unanswered.
    pub concurrency_limit: usize,
    /// Network name used to build the protocol id.
    #[serde(skip)]
    network_id: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            server_read_timeout: Duration::from_secs(5),
            server_write_timeout: Duration::from_secs(60),
            handle_request_timeout: Duration::from_secs(60),
            concurrency_limit: 10,
            network_id: String::new(),
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if self.handle_request_timeout.is_zero() {
            return Err(Error::InvalidParameters("handle_request_timeout must be positive"));
        }
        if self.concurrency_limit == 0 {
            return Err(Error::InvalidParameters("concurrency_limit must be positive"));
        }
        Ok(())
    }

    pub fn with_network_id(mut self, network: impl Into<String>) -> Self {
        self.network_id = network.into();
        self
    }

    pub fn set_network_id(&mut self, network: impl Into<String>) {
        self.network_id = network.into();
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn protocol_id(&self) -> ProtocolId {
        ProtocolId::new(&self.network_id, PROTOCOL_STRING)
    }
}

/// `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/* --------------------------------- Tests -------------------------------- */
