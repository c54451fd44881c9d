//! Client side of the ND protocol.

use std::sync::Arc;

use dasquare_native::{DataAvailabilityHeader, Namespace};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::metrics::{MetricsSink, NoopMetrics, RequestStatus};
use super::shares::{NamespacedRow, NamespacedShares};
use super::transport::{Host, PeerId, ProtocolId, Stream};
use super::wire::{
    read_msg_limited, row_frame_limit, write_msg, Request, Row, StatusCode, StatusResponse, WireError,
};
use super::{Error, Parameters, Result};

const STATUS_FRAME_LIMIT: usize = 64;

/// Fetches namespaced shares from peers. Answers are returned unverified;
/// see [`NamespacedShares::verify`].
pub struct Client<H> {
    params: Parameters,
    protocol_id: ProtocolId,
    host: H,
    metrics: Arc<dyn MetricsSink>,
}

impl<H: Host> Client<H> {
    pub fn new(params: Parameters, host: H) -> Result<Self> {
        params.validate()?;
        Ok(Self { protocol_id: params.protocol_id(), params, host, metrics: Arc::new(NoopMetrics) })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn protocol_id(&self) -> &ProtocolId {
        &self.protocol_id
    }

    /// Request every share of `namespace` in the block committed to by `root`.
    ///
    /// With a `deadline`, the whole exchange is bounded by it and an expiry is
    /// reported as [`Error::DeadlineExceeded`]. Dropping the future tears the
    /// stream down. Every completed call records exactly one outcome, a
    /// rejected namespace included.
    pub async fn request_nd(
        &self,
        root: &DataAvailabilityHeader,
        namespace: Namespace,
        peer: &PeerId,
        deadline: Option<Instant>,
    ) -> Result<NamespacedShares> {
        let res = match namespace.validate_for_data() {
            Err(e) => Err(Error::from(e)),
            Ok(()) => {
                let exchange = self.do_request(root, namespace, peer, deadline);
                match deadline {
                    Some(at) => tokio::time::timeout_at(at, exchange).await.unwrap_or(Err(Error::DeadlineExceeded)),
                    None => exchange.await,
                }
            }
        };

        let res = res.map_err(|err| reclassify_timeout(err, deadline));
        self.metrics.observe_requests(1, outcome(&res));

        if let Err(err) = &res {
            let quiet = matches!(
                err,
                Error::NotFound | Error::RateLimited | Error::DeadlineExceeded | Error::InvalidNamespace(_)
            );
            if !quiet {
                warn!(%peer, error = %err, "nd client: peer returned error");
            }
        }
        res
    }

    async fn do_request(
        &self,
        root: &DataAvailabilityHeader,
        namespace: Namespace,
        peer: &PeerId,
        deadline: Option<Instant>,
    ) -> Result<NamespacedShares> {
        let mut stream = self.host.open_stream(peer, &self.protocol_id).await.map_err(Error::OpenStream)?;
        self.set_stream_deadlines(&mut stream, deadline);

        let req = Request { root_hash: root.hash(), namespace };
        if let Err(e) = write_msg(&mut stream, &req).await {
            stream.reset();
            return Err(Error::SendRequest(e));
        }

        if let Err(e) = stream.close_write().await {
            debug!(error = %e, "nd client: closing write side of the stream");
        }

        read_status(&mut stream).await?;
        let expected = root.rows_for_namespace(namespace).len();
        read_rows(&mut stream, expected, row_frame_limit(root.row_roots().len())).await
    }

    fn set_stream_deadlines<S: Stream>(&self, stream: &mut S, deadline: Option<Instant>) {
        if let Some(at) = deadline {
            match stream.set_read_deadline(Some(at)).and_then(|_| stream.set_write_deadline(Some(at))) {
                Ok(()) => return,
                Err(e) => debug!(error = %e, "nd client: set stream deadline"),
            }
        }

        // Without a caller deadline, reads wait as long as the server may
        // write, and writes as long as the server may read.
        let now = Instant::now();
        if !self.params.server_write_timeout.is_zero() {
            if let Err(e) = stream.set_read_deadline(Some(now + self.params.server_write_timeout)) {
                debug!(error = %e, "nd client: set read deadline");
            }
        }
        if !self.params.server_read_timeout.is_zero() {
            if let Err(e) = stream.set_write_deadline(Some(now + self.params.server_read_timeout)) {
                debug!(error = %e, "nd client: set write deadline");
            }
        }
    }
}

async fn read_status<S: Stream>(stream: &mut S) -> Result<()> {
    let resp: StatusResponse = match read_msg_limited(stream, STATUS_FRAME_LIMIT).await {
        Ok(Some(resp)) => resp,
        // The server closes without a status when it is overloaded.
        Ok(None) => return Err(Error::RateLimited),
        Err(e) => {
            stream.reset();
            return Err(Error::ReadResponse(e));
        }
    };

    match StatusCode::from_u8(resp.status) {
        Some(StatusCode::Ok) => Ok(()),
        Some(StatusCode::NotFound) => Err(Error::NotFound),
        Some(StatusCode::Invalid) => {
            warn!("nd client: server rejected request as invalid");
            Err(Error::InvalidResponse)
        }
        Some(StatusCode::Internal) | None => Err(Error::InvalidResponse),
    }
}

/// Read rows until the server closes. The header fixes how many rows and
/// how large each may be; a peer sending more is misbehaving.
async fn read_rows<S: Stream>(stream: &mut S, expected: usize, max_frame: usize) -> Result<NamespacedShares> {
    let mut rows = Vec::with_capacity(expected);
    loop {
        match read_msg_limited::<_, Row>(stream, max_frame).await {
            Ok(Some(_)) if rows.len() == expected => {
                warn!(expected, "nd client: peer sent more rows than the header allows");
                stream.reset();
                return Err(Error::InvalidResponse);
            }
            Ok(Some(row)) => rows.push(NamespacedRow::from_wire(row)?),
            Ok(None) => return Ok(NamespacedShares(rows)),
            Err(WireError::FrameTooLarge(len)) => {
                warn!(len, max_frame, "nd client: oversized row");
                stream.reset();
                return Err(Error::InvalidResponse);
            }
            Err(e) => return Err(Error::ReadResponse(e)),
        }
    }
}

/// Transport timeouts count as a deadline expiry only once the caller's
/// deadline has actually passed.
fn reclassify_timeout(err: Error, deadline: Option<Instant>) -> Error {
    let timed_out = match &err {
        Error::SendRequest(e) | Error::ReadResponse(e) => e.is_timeout(),
        Error::OpenStream(e) => e.kind() == std::io::ErrorKind::TimedOut,
        _ => false,
    };
    match deadline {
        Some(at) if timed_out && at <= Instant::now() => Error::DeadlineExceeded,
        _ => err,
    }
}

fn outcome(res: &Result<NamespacedShares>) -> RequestStatus {
    match res {
        Ok(_) => RequestStatus::Success,
        Err(Error::NotFound) => RequestStatus::NotFound,
        Err(Error::RateLimited) => RequestStatus::RateLimited,
        Err(Error::DeadlineExceeded) => RequestStatus::Timeout,
        Err(Error::SendRequest(_) | Error::OpenStream(_)) => RequestStatus::SendRequestError,
        Err(Error::ReadResponse(_)) => RequestStatus::ReadResponseError,
        Err(Error::InvalidResponse | Error::Codec(_) | Error::InvalidNamespace(_) | Error::InvalidParameters(_)) => {
            RequestStatus::InvalidResponse
        }
    }
}

/* --------------------------------- Tests -------------------------------- */
