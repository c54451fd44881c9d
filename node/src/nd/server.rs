//! Server side of the ND protocol.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use dasquare_native::dah::axis_tree;
use dasquare_native::hash::Digest32;
use dasquare_native::nmt::NamespaceRangeProof;
use dasquare_native::{DataAvailabilityHeader, ExtendedDataSquare, Namespace, NativeError};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::shares::NamespacedRow;
use super::transport::Stream;
use super::wire::{read_msg, write_msg, Request, StatusCode, StatusResponse, WireError};
use super::{Parameters, Result};

/// An extended square together with its header.
#[derive(Clone, Debug)]
pub struct StoredSquare {
    pub eds: ExtendedDataSquare,
    pub dah: DataAvailabilityHeader,
}

#[derive(Debug, thiserror::Error)]
#[error("eds store: {0}")]
pub struct StoreError(pub String);

/// Lookup of extended squares by header hash.
pub trait EdsStore: Send + Sync + 'static {
    fn get(&self, root_hash: &Digest32) -> impl Future<Output = Result<Option<Arc<StoredSquare>>, StoreError>> + Send;
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    squares: RwLock<HashMap<Digest32, Arc<StoredSquare>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit to `eds` and store it; returns the header hash.
    pub fn put(&self, eds: ExtendedDataSquare) -> Result<Digest32, NativeError> {
        let dah = DataAvailabilityHeader::compute(&eds)?;
        let hash = dah.hash();
        self.squares
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hash, Arc::new(StoredSquare { eds, dah }));
        Ok(hash)
    }
}

impl EdsStore for MemoryStore {
    async fn get(&self, root_hash: &Digest32) -> Result<Option<Arc<StoredSquare>>, StoreError> {
        Ok(self.squares.read().unwrap_or_else(|e| e.into_inner()).get(root_hash).cloned())
    }
}

/// Why a request ended without rows. Logged, never sent.
#[derive(Debug, thiserror::Error)]
enum Fault {
    #[error("reading request: {0}")]
    Read(WireError),
    #[error("peer closed before sending a request")]
    NoRequest,
    #[error("writing response: {0}")]
    Write(WireError),
}

/// Answers ND requests from an [`EdsStore`].
pub struct Server<S> {
    params: Parameters,
    store: Arc<S>,
    limiter: Arc<Semaphore>,
}

impl<S: EdsStore> Server<S> {
    pub fn new(params: Parameters, store: Arc<S>) -> Result<Self> {
        params.validate()?;
        let limiter = Arc::new(Semaphore::new(params.concurrency_limit));
        Ok(Self { params, store, limiter })
    }

    /// Serve every stream yielded by `incoming`, one task per stream.
    pub async fn serve<T, I>(self: Arc<Self>, incoming: I)
    where
        T: Stream,
        I: futures::Stream<Item = T> + Send,
    {
        let mut incoming = std::pin::pin!(incoming);
        while let Some(stream) = incoming.next().await {
            let this = Arc::clone(&self);
            tokio::spawn(async move { this.handle_stream(stream).await });
        }
    }

    /// Handle a single stream to completion.
    pub async fn handle_stream<T: Stream>(&self, mut stream: T) {
        let Ok(_permit) = Arc::clone(&self.limiter).try_acquire_owned() else {
            // Closing without a status tells the client it was rate limited.
            debug!("nd server: concurrency limit reached, dropping stream");
            self.set_read_deadline(&mut stream);
            if let Err(e) = read_msg::<_, Request>(&mut stream).await {
                debug!(error = %e, "nd server: draining request of a dropped stream");
            }
            if let Err(e) = stream.close_write().await {
                debug!(error = %e, "nd server: closing write side");
            }
            return;
        };

        if let Err(fault) = self.respond(&mut stream).await {
            debug!(error = %fault, "nd server: request failed");
            stream.reset();
            return;
        }
        if let Err(e) = stream.close_write().await {
            debug!(error = %e, "nd server: closing write side");
        }
    }

    async fn respond<T: Stream>(&self, stream: &mut T) -> Result<(), Fault> {
        self.set_read_deadline(stream);
        let req: Request = read_msg(stream).await.map_err(Fault::Read)?.ok_or(Fault::NoRequest)?;

        if !self.params.server_write_timeout.is_zero() {
            if let Err(e) = stream.set_write_deadline(Some(Instant::now() + self.params.server_write_timeout)) {
                debug!(error = %e, "nd server: set write deadline");
            }
        }

        if let Err(e) = req.namespace.validate_for_data() {
            warn!(namespace = %req.namespace, error = %e, "nd server: invalid request");
            return send_status(stream, StatusCode::Invalid).await;
        }

        let lookup = tokio::time::timeout(self.params.handle_request_timeout, self.store.get(&req.root_hash)).await;
        let stored = match lookup {
            Ok(Ok(Some(stored))) => stored,
            Ok(Ok(None)) => {
                debug!(root = %hex::encode(req.root_hash), "nd server: square not found");
                return send_status(stream, StatusCode::NotFound).await;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "nd server: store lookup failed");
                return send_status(stream, StatusCode::Internal).await;
            }
            Err(_) => {
                warn!("nd server: store lookup timed out");
                return send_status(stream, StatusCode::Internal).await;
            }
        };

        let rows = match namespace_rows(&stored, req.namespace) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "nd server: building row proofs");
                return send_status(stream, StatusCode::Internal).await;
            }
        };

        send_status(stream, StatusCode::Ok).await?;
        for row in &rows {
            write_msg(stream, &row.to_wire()).await.map_err(Fault::Write)?;
        }
        debug!(namespace = %req.namespace, rows = rows.len(), "nd server: response sent");
        Ok(())
    }
}

impl<S> Server<S> {
    fn set_read_deadline<T: Stream>(&self, stream: &mut T) {
        if self.params.server_read_timeout.is_zero() {
            return;
        }
        if let Err(e) = stream.set_read_deadline(Some(Instant::now() + self.params.server_read_timeout)) {
            debug!(error = %e, "nd server: set read deadline");
        }
    }
}

async fn send_status<T: Stream>(stream: &mut T, code: StatusCode) -> Result<(), Fault> {
    write_msg(stream, &StatusResponse::from(code)).await.map_err(Fault::Write)
}

/// One proven row per row root whose window covers `ns`.
pub fn namespace_rows(stored: &StoredSquare, ns: Namespace) -> Result<Vec<NamespacedRow>, NativeError> {
    let k = stored.eds.original_width();
    let mut out = Vec::new();
    for r in stored.dah.rows_for_namespace(ns) {
        let Some(row) = stored.eds.row(r) else {
            continue;
        };
        let proof = axis_tree(r, &row, k)?.prove_namespace(ns);
        let shares = match &proof {
            NamespaceRangeProof::Inclusion(_) => row[proof.range()].iter().map(|s| s.to_vec()).collect(),
            _ => Vec::new(),
        };
        out.push(NamespacedRow { shares, proof });
    }
    Ok(out)
}

/* --------------------------------- Tests -------------------------------- */
