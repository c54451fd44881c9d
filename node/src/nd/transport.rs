//! Peer transport abstraction consumed by the ND client and server.
//!
//! Real deployments plug their p2p host in behind [`Host`]; [`memory`]
//! provides an in-process implementation over `tokio::io::duplex` pipes.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Remote peer identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stream protocol identifier, e.g. `/mainnet/nd/v0.0.1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(network: &str, protocol: &str) -> Self {
        Self(format!("/{network}{protocol}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bidirectional, half-closable stream to a peer.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Reads past `deadline` fail with [`io::ErrorKind::TimedOut`]. `None` clears it.
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;
    /// Writes past `deadline` fail with [`io::ErrorKind::TimedOut`]. `None` clears it.
    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;
    /// Close the write half; the peer reads end of stream.
    fn close_write(&mut self) -> impl Future<Output = io::Result<()>> + Send;
    /// Abort the stream in both directions.
    fn reset(&mut self);
}

/// Opens streams to peers.
pub trait Host: Send + Sync + 'static {
    type Stream: Stream;

    fn open_stream(&self, peer: &PeerId, protocol: &ProtocolId) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/* --------------------------- Deadline wrapper ---------------------------- */

/// Adds deadlines, half-close and reset to any async byte pipe.
#[derive(Debug)]
pub struct DeadlineStream<S> {
    inner: S,
    read_timer: Option<Pin<Box<Sleep>>>,
    write_timer: Option<Pin<Box<Sleep>>>,
    reset: bool,
}

impl<S> DeadlineStream<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, read_timer: None, write_timer: None, reset: false }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn timer(deadline: Option<Instant>) -> Option<Pin<Box<Sleep>>> {
    deadline.map(|d| Box::pin(tokio::time::sleep_until(d)))
}

fn expired(timer: &mut Option<Pin<Box<Sleep>>>, cx: &mut Context<'_>) -> bool {
    timer.as_mut().is_some_and(|t| t.as_mut().poll(cx).is_ready())
}

fn reset_err() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionReset, "stream reset")
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.reset {
            return Poll::Ready(Err(reset_err()));
        }
        if expired(&mut this.read_timer, cx) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline exceeded")));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.reset {
            return Poll::Ready(Err(reset_err()));
        }
        if expired(&mut this.write_timer, cx) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "write deadline exceeded")));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl<S> Stream for DeadlineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.read_timer = timer(deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.write_timer = timer(deadline);
        Ok(())
    }

    async fn close_write(&mut self) -> io::Result<()> {
        if self.reset {
            return Err(reset_err());
        }
        self.inner.shutdown().await
    }

    fn reset(&mut self) {
        self.reset = true;
    }
}

/* --------------------------- In-process host ----------------------------- */

pub mod memory {
    //! Connects peers inside one process. Each registered peer receives the
    //! server half of every stream opened to it on an mpsc channel.

    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use tokio::io::DuplexStream;
    use tokio::sync::mpsc;

    use super::*;

    pub type MemoryStream = DeadlineStream<DuplexStream>;

    const PIPE_CAPACITY: usize = 64 * 1024;

    #[derive(Clone, Default)]
    pub struct MemoryNetwork {
        peers: Arc<RwLock<HashMap<(PeerId, ProtocolId), mpsc::Sender<MemoryStream>>>>,
    }

    impl MemoryNetwork {
        /// Register `peer` as a listener for `protocol`.
        pub fn listen(&self, peer: PeerId, protocol: ProtocolId, backlog: usize) -> mpsc::Receiver<MemoryStream> {
            let (tx, rx) = mpsc::channel(backlog.max(1));
            self.peers.write().unwrap_or_else(|e| e.into_inner()).insert((peer, protocol), tx);
            rx
        }

        pub fn host(&self) -> MemoryHost {
            MemoryHost { net: self.clone() }
        }
    }

    /// Adapt a listener channel into the stream of incoming connections a
    /// server consumes.
    pub fn incoming(rx: mpsc::Receiver<MemoryStream>) -> impl futures::Stream<Item = MemoryStream> {
        futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|s| (s, rx)) })
    }

    #[derive(Clone)]
    pub struct MemoryHost {
        net: MemoryNetwork,
    }

    impl Host for MemoryHost {
        type Stream = MemoryStream;

        async fn open_stream(&self, peer: &PeerId, protocol: &ProtocolId) -> io::Result<MemoryStream> {
            let tx = self
                .net
                .peers
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(&(peer.clone(), protocol.clone()))
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, format!("no route to {peer}")))?;
            let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
            tx.send(DeadlineStream::new(server))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, format!("{peer} stopped listening")))?;
            Ok(DeadlineStream::new(client))
        }
    }
}

/* --------------------------------- Tests -------------------------------- */
