//! Shares: the fixed-size, namespace-prefixed unit of a data square.
//!
//! ```text
//! first share of a sequence:  NS(8) | INFO(1) | SEQ_LEN(4, BE) | payload[499]
//! continuation share:         NS(8) | INFO(1) |                  payload[503]
//! INFO = share_version << 1 | sequence_start
//! ```
//!
//! A *sequence* is one logical byte string (a blob, or the concatenation of
//! length-prefixed transactions) split over consecutive shares of the same
//! namespace. Unused payload bytes are zero.

use crate::namespace::{Namespace, NAMESPACE_SIZE};
use crate::utils::ceil_div;
use super::SquareError;

/// Size of every share in bytes.
pub const SHARE_SIZE: usize = 512;
/// Size of the info byte.
pub const SHARE_INFO_BYTES: usize = 1;
/// Size of the sequence length prefix carried by first shares.
pub const SEQUENCE_LEN_BYTES: usize = 4;
/// Only share version defined so far.
pub const SHARE_VERSION_ZERO: u8 = 0;
/// Largest version representable in the info byte.
pub const MAX_SHARE_VERSION: u8 = 127;

/// Payload capacity of the first share of a sequence.
pub const FIRST_SHARE_CAPACITY: usize = SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SEQUENCE_LEN_BYTES;
/// Payload capacity of every following share.
pub const CONTINUATION_SHARE_CAPACITY: usize = SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES;

/// Length prefix of one transaction inside a compact sequence.
const UNIT_LEN_BYTES: usize = 4;

/// A single share. Always exactly [`SHARE_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Share(Vec<u8>);

impl Share {
    /// Wrap raw bytes, checking the length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SquareError> {
        if bytes.len() != SHARE_SIZE {
            return Err(SquareError::InvalidShareSize(bytes.len()));
        }
        Ok(Self(bytes))
    }

    fn new(ns: Namespace, version: u8, start: bool, seq_len: Option<u32>, payload: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(SHARE_SIZE);
        buf.extend_from_slice(ns.as_bytes());
        buf.push((version << 1) | u8::from(start));
        if let Some(len) = seq_len {
            buf.extend_from_slice(&len.to_be_bytes());
        }
        buf.extend_from_slice(payload);
        buf.resize(SHARE_SIZE, 0);
        Self(buf)
    }

    /// Tail padding share used to fill the square.
    pub fn tail_padding() -> Self {
        Self::new(Namespace::TAIL_PADDING, SHARE_VERSION_ZERO, true, Some(0), &[])
    }

    pub fn namespace(&self) -> Namespace {
        let mut ns = [0u8; NAMESPACE_SIZE];
        ns.copy_from_slice(&self.0[..NAMESPACE_SIZE]);
        Namespace::from_bytes(ns)
    }

    #[inline]
    fn info(&self) -> u8 {
        self.0[NAMESPACE_SIZE]
    }

    pub fn version(&self) -> u8 {
        self.info() >> 1
    }

    pub fn is_sequence_start(&self) -> bool {
        self.info() & 1 == 1
    }

    /// Declared sequence length (first shares only).
    pub fn sequence_len(&self) -> Option<u32> {
        if !self.is_sequence_start() {
            return None;
        }
        let at = NAMESPACE_SIZE + SHARE_INFO_BYTES;
        let mut len = [0u8; SEQUENCE_LEN_BYTES];
        len.copy_from_slice(&self.0[at..at + SEQUENCE_LEN_BYTES]);
        Some(u32::from_be_bytes(len))
    }

    /// Payload bytes after the header.
    pub fn payload(&self) -> &[u8] {
        let mut at = NAMESPACE_SIZE + SHARE_INFO_BYTES;
        if self.is_sequence_start() {
            at += SEQUENCE_LEN_BYTES;
        }
        &self.0[at..]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Share {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for Share {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Share")
            .field("namespace", &self.namespace())
            .field("start", &self.is_sequence_start())
            .field("sequence_len", &self.sequence_len())
            .finish()
    }
}

/* ------------------------------ Splitting -------------------------------- */

/// Number of shares a sequence of `len` bytes occupies.
#[inline]
pub fn shares_needed(len: usize) -> usize {
    if len <= FIRST_SHARE_CAPACITY {
        1
    } else {
        1 + ceil_div(len - FIRST_SHARE_CAPACITY, CONTINUATION_SHARE_CAPACITY)
    }
}

/// Split one sequence into shares of namespace `ns`.
pub fn split_sequence(ns: Namespace, version: u8, data: &[u8]) -> Result<Vec<Share>, SquareError> {
    if version > MAX_SHARE_VERSION {
        return Err(SquareError::UnsupportedShareVersion(version));
    }
    let seq_len = u32::try_from(data.len()).map_err(|_| SquareError::SequenceTooLong(data.len()))?;

    let mut out = Vec::with_capacity(shares_needed(data.len()));
    let first = data.len().min(FIRST_SHARE_CAPACITY);
    out.push(Share::new(ns, version, true, Some(seq_len), &data[..first]));
    for chunk in data[first..].chunks(CONTINUATION_SHARE_CAPACITY) {
        out.push(Share::new(ns, version, false, None, chunk));
    }
    Ok(out)
}

/// Sparse shares of one blob.
#[inline]
pub fn split_sparse(ns: Namespace, version: u8, data: &[u8]) -> Result<Vec<Share>, SquareError> {
    split_sequence(ns, version, data)
}

/// Shares a blob of `len` bytes occupies.
#[inline]
pub fn blob_shares_needed(len: usize) -> usize {
    shares_needed(len)
}

/// Bytes a transaction occupies inside a compact sequence.
#[inline]
pub fn compact_unit_len(tx: &[u8]) -> usize {
    UNIT_LEN_BYTES + tx.len()
}

/// Split length-prefixed transactions into compact shares (none if `txs` is empty).
pub fn split_compact<T: AsRef<[u8]>>(ns: Namespace, txs: &[T]) -> Result<Vec<Share>, SquareError> {
    if txs.is_empty() {
        return Ok(Vec::new());
    }
    let mut seq = Vec::with_capacity(txs.iter().map(|t| compact_unit_len(t.as_ref())).sum());
    for tx in txs {
        let tx = tx.as_ref();
        let len = u32::try_from(tx.len()).map_err(|_| SquareError::SequenceTooLong(tx.len()))?;
        seq.extend_from_slice(&len.to_be_bytes());
        seq.extend_from_slice(tx);
    }
    split_sequence(ns, SHARE_VERSION_ZERO, &seq)
}

/// Reassemble one sequence from its shares.
pub fn parse_sequence(shares: &[Share]) -> Result<Vec<u8>, SquareError> {
    let (first, rest) = shares.split_first().ok_or(SquareError::MalformedSequence("no shares"))?;
    let len = first.sequence_len().ok_or(SquareError::MalformedSequence("missing sequence start"))? as usize;
    if shares_needed(len) != shares.len() {
        return Err(SquareError::MalformedSequence("share count does not match sequence length"));
    }
    let mut data = Vec::with_capacity(len);
    data.extend_from_slice(first.payload());
    for s in rest {
        if s.is_sequence_start() || s.namespace() != first.namespace() {
            return Err(SquareError::MalformedSequence("sequence interrupted"));
        }
        data.extend_from_slice(s.payload());
    }
    data.truncate(len);
    Ok(data)
}

/// Inverse of [`split_compact`].
pub fn parse_compact_txs(shares: &[Share]) -> Result<Vec<Vec<u8>>, SquareError> {
    let seq = parse_sequence(shares)?;
    let mut txs = Vec::new();
    let mut rest = seq.as_slice();
    while !rest.is_empty() {
        if rest.len() < UNIT_LEN_BYTES {
            return Err(SquareError::MalformedSequence("truncated unit length"));
        }
        let (len, tail) = rest.split_at(UNIT_LEN_BYTES);
        let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        if tail.len() < len {
            return Err(SquareError::MalformedSequence("truncated unit"));
        }
        let (tx, tail) = tail.split_at(len);
        txs.push(tx.to_vec());
        rest = tail;
    }
    Ok(txs)
}

/* --------------------------------- Tests ----------------------------------- */
