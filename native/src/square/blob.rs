//! Blobs and the blob-transaction envelope.
//!
//! A blob transaction wraps an ordinary SDK transaction (which carries the
//! pay-for-blob message) together with the blobs it pays for:
//!
//! ```text
//! BLOB_TX := MAGIC("BLOB") || LEN(4) || TX[LEN] || COUNT(4) || BLOB*COUNT
//! BLOB    := NS(8) || VERSION(1) || LEN(4) || DATA[LEN]
//! ```
//!
//! All integers are big-endian. Decoding is strict: trailing bytes or a
//! blob-less envelope make the input "not a blob transaction".

use crate::hash::{hash_ds, Digest32, DsTag};
use crate::namespace::{Namespace, NAMESPACE_SIZE};
use crate::nmt::{Leaf, Nmt};
use super::share::{split_sparse, Share};
use super::SquareError;

const MAGIC: &[u8; 4] = b"BLOB";

/// Namespaced payload paid for by a blob transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub namespace: Namespace,
    pub share_version: u8,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(namespace: Namespace, data: Vec<u8>) -> Self {
        Self { namespace, share_version: super::share::SHARE_VERSION_ZERO, data }
    }

    /// The blob's sparse shares.
    pub fn to_shares(&self) -> Result<Vec<Share>, SquareError> {
        split_sparse(self.namespace, self.share_version, &self.data)
    }
}

/// Envelope pairing a transaction with the blobs it pays for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobTx {
    pub tx: Vec<u8>,
    pub blobs: Vec<Blob>,
}

/// Why bytes are not a blob transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobTxDecodeError {
    #[error("missing blob tx magic")]
    NotBlobTx,
    #[error("truncated blob tx")]
    Truncated,
    #[error("blob tx carries no blobs")]
    NoBlobs,
    #[error("trailing bytes after blob tx")]
    TrailingBytes,
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], BlobTxDecodeError> {
        if self.0.len() < n {
            return Err(BlobTxDecodeError::Truncated);
        }
        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        Ok(head)
    }

    fn u32(&mut self) -> Result<usize, BlobTxDecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    // Lengths are bounded by share capacity long before u32::MAX.
    out.extend_from_slice(&(len as u32).to_be_bytes());
}

impl BlobTx {
    pub fn new(tx: Vec<u8>, blobs: Vec<Blob>) -> Self {
        Self { tx, blobs }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            MAGIC.len() + 8 + self.tx.len() + self.blobs.iter().map(|b| 13 + b.data.len()).sum::<usize>(),
        );
        out.extend_from_slice(MAGIC);
        put_len(&mut out, self.tx.len());
        out.extend_from_slice(&self.tx);
        put_len(&mut out, self.blobs.len());
        for b in &self.blobs {
            out.extend_from_slice(b.namespace.as_bytes());
            out.push(b.share_version);
            put_len(&mut out, b.data.len());
            out.extend_from_slice(&b.data);
        }
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self, BlobTxDecodeError> {
        let mut r = Reader(raw);
        if r.take(MAGIC.len()).map_err(|_| BlobTxDecodeError::NotBlobTx)? != MAGIC {
            return Err(BlobTxDecodeError::NotBlobTx);
        }
        let tx_len = r.u32()?;
        let tx = r.take(tx_len)?.to_vec();
        let count = r.u32()?;
        if count == 0 {
            return Err(BlobTxDecodeError::NoBlobs);
        }
        let mut blobs = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let mut ns = [0u8; NAMESPACE_SIZE];
            ns.copy_from_slice(r.take(NAMESPACE_SIZE)?);
            let share_version = r.take(1)?[0];
            let len = r.u32()?;
            let data = r.take(len)?.to_vec();
            blobs.push(Blob { namespace: Namespace::from_bytes(ns), share_version, data });
        }
        if !r.0.is_empty() {
            return Err(BlobTxDecodeError::TrailingBytes);
        }
        Ok(Self { tx, blobs })
    }
}

/// Share commitment of a blob: the NMT root over its shares, hashed into the
/// share-commitment domain.
pub fn create_commitment(blob: &Blob) -> Result<Digest32, SquareError> {
    let shares = blob.to_shares()?;
    let leaves: Vec<Leaf<'_>> = shares.iter().map(|s| Leaf::new(blob.namespace, s.as_bytes())).collect();
    let root = Nmt::build(&leaves)?.root();
    Ok(hash_ds(DsTag::ShareCommitment, &root.to_bytes()))
}

/* --------------------------------- Tests ----------------------------------- */
