//! ND wire format.
//!
//! Every message is a CBOR document behind a 4-byte big-endian length:
//!
//! ```text
//! FRAME := LEN(u32, BE) || CBOR[LEN]        LEN <= MAX_FRAME_SIZE
//! ```
//!
//! A conversation is `Request` (client → server), then `StatusResponse`, then
//! zero or more `Row`s until the server closes its write side.

use bytes::{BufMut, BytesMut};
use dasquare_native::hash::Digest32;
use dasquare_native::nmt::Node;
use dasquare_native::{Namespace, SHARE_SIZE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame body.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Generous CBOR size of one proof node (two namespaces and a digest).
const NODE_FRAME_BUDGET: usize = 256;

/// Upper bound on the frame of a [`Row`] taken from an extended square of
/// `width` shares per row: every share, a full proof path and two
/// bracketing leaves.
pub fn row_frame_limit(width: usize) -> usize {
    let width = width.max(1);
    let path = 2 * (usize::BITS - width.leading_zeros()) as usize + 2;
    width * (SHARE_SIZE + 16) + path * NODE_FRAME_BUDGET + 1024
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
    #[error("cbor encode: {0}")]
    Encode(String),
    #[error("cbor decode: {0}")]
    Decode(String),
}

impl WireError {
    /// Whether the underlying transport reported a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}

/// Status codes carried by [`StatusResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Invalid = 0,
    Ok = 1,
    NotFound = 2,
    Internal = 3,
}

impl StatusCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Invalid),
            1 => Some(Self::Ok),
            2 => Some(Self::NotFound),
            3 => Some(Self::Internal),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(with = "serde_bytes")]
    pub root_hash: Digest32,
    pub namespace: Namespace,
}

/// Raw status byte; unknown values are kept so the client can reject them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: u8,
}

impl From<StatusCode> for StatusResponse {
    fn from(code: StatusCode) -> Self {
        Self { status: code as u8 }
    }
}

/// Full range proof as transmitted. `leaf_hashes` is empty for inclusion
/// proofs and holds the two bracketing leaves for absence proofs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProof {
    pub start: u32,
    pub end: u32,
    pub leaf_count: u32,
    pub nodes: Vec<Node>,
    pub leaf_hashes: Vec<Node>,
}

/// One row's answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub shares: Vec<serde_bytes::ByteBuf>,
    pub proof: Option<WireProof>,
}

/* ------------------------------- Framing -------------------------------- */

/// Encode `msg` into a single length-prefixed frame.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<BytesMut, WireError> {
    let mut body = Vec::new();
    ciborium::into_writer(msg, &mut body).map_err(|e| WireError::Encode(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(body.len()));
    }
    let mut frame = BytesMut::with_capacity(LEN_PREFIX + body.len());
    frame.put_u32(body.len() as u32);
    frame.put_slice(&body);
    Ok(frame)
}

pub async fn write_msg<W, T>(w: &mut W, msg: &T) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(msg)?;
    w.write_all(&frame).await?;
    w.flush().await?;
    Ok(())
}

/// Read one frame body. `Ok(None)` on a clean end of stream before the first
/// byte of the length prefix.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Option<Vec<u8>>, WireError> {
    read_frame_limited(r, MAX_FRAME_SIZE).await
}

/// [`read_frame`] with a tighter bound on the body length.
pub async fn read_frame_limited<R: AsyncRead + Unpin>(r: &mut R, max: usize) -> Result<Option<Vec<u8>>, WireError> {
    let mut len = [0u8; LEN_PREFIX];
    let mut got = 0;
    while got < LEN_PREFIX {
        let n = r.read(&mut len[got..]).await?;
        if n == 0 {
            if got == 0 {
                return Ok(None);
            }
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        got += n;
    }
    let len = u32::from_be_bytes(len) as usize;
    if len > max.min(MAX_FRAME_SIZE) {
        return Err(WireError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    r.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub async fn read_msg<R, T>(r: &mut R) -> Result<Option<T>, WireError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    read_msg_limited(r, MAX_FRAME_SIZE).await
}

/// [`read_msg`] rejecting frames longer than `max`.
pub async fn read_msg_limited<R, T>(r: &mut R, max: usize) -> Result<Option<T>, WireError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame_limited(r, max).await? {
        Some(body) => ciborium::from_reader(body.as_slice())
            .map(Some)
            .map_err(|e| WireError::Decode(e.to_string())),
        None => Ok(None),
    }
}

/* --------------------------------- Tests -------------------------------- */
