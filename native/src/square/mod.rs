//! Share codec: lays ordered transactions out as a `k × k` square of shares.
//!
//! ## Layout
//! Shares are written row-major in namespace order, so every row and column
//! of the square is namespace-sorted:
//!
//! ```text
//! | ordinary txs (TRANSACTION) | PFB txs (PAY_FOR_BLOB) | blobs (by namespace) | tail padding |
//! ```
//!
//! Ordinary transactions and the inner transactions of blob transactions are
//! packed as length-prefixed units into *compact* sequences; each blob is its
//! own *sparse* sequence. Blobs are stable-sorted by namespace.
//!
//! ## Sizing
//! The side `k` is the smallest power of two with `k * k` at least the number
//! of shares, bounded by `min(max_square_size, square_size_upper_bound(v))`.
//!
//! - [`build`] (proposer): admits transactions greedily in input order,
//!   ordinary ones first, and drops whatever would overflow the bound.
//! - [`construct`] (validator): lays out exactly the given transactions and
//!   fails with [`SquareError::SquareOverflow`] if they do not fit.

pub mod blob;
pub mod share;

use crate::namespace::{Namespace, NamespaceError};
use crate::nmt::NmtError;
use crate::utils::{is_pow2, next_pow2};
pub use blob::{create_commitment, Blob, BlobTx, BlobTxDecodeError};
pub use share::{Share, SHARE_SIZE};
use share::{compact_unit_len, shares_needed, split_compact};

/// Hard cap on the square side (GF(2^8) allows at most 256 shards per axis).
pub const MAX_SQUARE_SIZE_UPPER_BOUND: usize = 128;
/// Newest application version understood by this crate.
pub const LATEST_APP_VERSION: u64 = 2;

/// Errors raised by the share codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SquareError {
    #[error("square overflow: {required} shares need side {side}, max side is {max}")]
    SquareOverflow { required: usize, side: usize, max: usize },
    #[error("max square size {0} must be a power of two in 1..=128")]
    InvalidMaxSquareSize(usize),
    #[error("unsupported app version {0}")]
    UnsupportedAppVersion(u64),
    #[error("share must be {SHARE_SIZE} bytes, got {0}")]
    InvalidShareSize(usize),
    #[error("unsupported share version {0}")]
    UnsupportedShareVersion(u8),
    #[error("sequence of {0} bytes is too long")]
    SequenceTooLong(usize),
    #[error("malformed sequence: {0}")]
    MalformedSequence(&'static str),
    #[error("invalid blob namespace: {0}")]
    InvalidBlobNamespace(#[from] NamespaceError),
    #[error(transparent)]
    Nmt(#[from] NmtError),
}

/// Square side cap for an application version.
pub fn square_size_upper_bound(app_version: u64) -> Result<usize, SquareError> {
    match app_version {
        1 => Ok(64),
        2 => Ok(MAX_SQUARE_SIZE_UPPER_BOUND),
        v => Err(SquareError::UnsupportedAppVersion(v)),
    }
}

fn effective_max(app_version: u64, max_square_size: usize) -> Result<usize, SquareError> {
    if !is_pow2(max_square_size) || max_square_size > MAX_SQUARE_SIZE_UPPER_BOUND {
        return Err(SquareError::InvalidMaxSquareSize(max_square_size));
    }
    Ok(max_square_size.min(square_size_upper_bound(app_version)?))
}

/// Smallest power-of-two side holding `shares` shares.
#[inline]
pub fn min_square_size(shares: usize) -> usize {
    let mut k = next_pow2((shares as f64).sqrt() as usize);
    while k * k < shares {
        k *= 2;
    }
    k
}

/// An original (non-extended) data square.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Square {
    size: usize,
    shares: Vec<Share>,
}

impl Square {
    /// Square of an empty block: a single tail padding share.
    pub fn empty() -> Self {
        Self { size: 1, shares: vec![Share::tail_padding()] }
    }

    /// Side length `k`.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major shares.
    #[inline]
    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    pub fn row(&self, i: usize) -> Option<&[Share]> {
        self.shares.get(i * self.size..(i + 1) * self.size)
    }

    /// Raw share bytes, the input of erasure extension.
    pub fn to_bytes(&self) -> Vec<Vec<u8>> {
        self.shares.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    /// Transactions recovered from the compact sequences (ordinary, then PFB).
    pub fn transactions(&self) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), SquareError> {
        let of = |ns: Namespace| -> Result<Vec<Vec<u8>>, SquareError> {
            let run: Vec<Share> = self.shares.iter().filter(|s| s.namespace() == ns).cloned().collect();
            if run.is_empty() {
                Ok(Vec::new())
            } else {
                share::parse_compact_txs(&run)
            }
        };
        Ok((of(Namespace::TRANSACTION)?, of(Namespace::PAY_FOR_BLOB)?))
    }
}

/* ------------------------------- Builder -------------------------------- */

#[derive(Default)]
struct Builder {
    max: usize,
    txs: Vec<Vec<u8>>,
    pfb_txs: Vec<Vec<u8>>,
    blobs: Vec<Blob>,
    tx_bytes: usize,
    pfb_bytes: usize,
    blob_shares: usize,
}

#[inline]
fn compact_shares(bytes: usize) -> usize {
    if bytes == 0 {
        0
    } else {
        shares_needed(bytes)
    }
}

impl Builder {
    fn new(max: usize) -> Self {
        Self { max, ..Default::default() }
    }

    fn shares_for(tx_bytes: usize, pfb_bytes: usize, blob_shares: usize) -> usize {
        compact_shares(tx_bytes) + compact_shares(pfb_bytes) + blob_shares
    }

    fn fits(&self, shares: usize) -> bool {
        min_square_size(shares) <= self.max
    }

    fn append_tx(&mut self, tx: Vec<u8>) -> bool {
        let tx_bytes = self.tx_bytes + compact_unit_len(&tx);
        if !self.fits(Self::shares_for(tx_bytes, self.pfb_bytes, self.blob_shares)) {
            return false;
        }
        self.tx_bytes = tx_bytes;
        self.txs.push(tx);
        true
    }

    fn append_blob_tx(&mut self, btx: BlobTx) -> Result<bool, SquareError> {
        for b in &btx.blobs {
            b.namespace.validate_for_data()?;
            if b.share_version > share::MAX_SHARE_VERSION {
                return Err(SquareError::UnsupportedShareVersion(b.share_version));
            }
        }
        let pfb_bytes = self.pfb_bytes + compact_unit_len(&btx.tx);
        let blob_shares = self.blob_shares + btx.blobs.iter().map(|b| share::blob_shares_needed(b.data.len())).sum::<usize>();
        if !self.fits(Self::shares_for(self.tx_bytes, pfb_bytes, blob_shares)) {
            return Ok(false);
        }
        self.pfb_bytes = pfb_bytes;
        self.blob_shares = blob_shares;
        self.pfb_txs.push(btx.tx);
        self.blobs.extend(btx.blobs);
        Ok(true)
    }

    fn export(mut self) -> Result<Square, SquareError> {
        let total = Self::shares_for(self.tx_bytes, self.pfb_bytes, self.blob_shares);
        if total == 0 {
            return Ok(Square::empty());
        }
        let size = min_square_size(total);

        let mut shares = Vec::with_capacity(size * size);
        shares.extend(split_compact(Namespace::TRANSACTION, &self.txs)?);
        shares.extend(split_compact(Namespace::PAY_FOR_BLOB, &self.pfb_txs)?);
        self.blobs.sort_by_key(|b| b.namespace);
        for b in &self.blobs {
            shares.extend(b.to_shares()?);
        }
        debug_assert_eq!(shares.len(), total);
        shares.resize(size * size, Share::tail_padding());
        Ok(Square { size, shares })
    }
}

enum Classified {
    Plain(Vec<u8>),
    Blob(BlobTx, Vec<u8>),
}

fn classify(raw: &[u8]) -> Classified {
    match BlobTx::decode(raw) {
        Ok(btx) => Classified::Blob(btx, raw.to_vec()),
        Err(_) => Classified::Plain(raw.to_vec()),
    }
}

/// Proposer-side layout. Returns the square and the transactions it holds,
/// ordinary transactions first, in input order.
///
/// Admission is greedy: a transaction that would overflow is skipped and
/// later, smaller ones are still tried. Callers that need per-sender
/// ordering must filter the result themselves.
pub fn build<T: AsRef<[u8]>>(
    txs: &[T],
    app_version: u64,
    max_square_size: usize,
) -> Result<(Square, Vec<Vec<u8>>), SquareError> {
    let mut builder = Builder::new(effective_max(app_version, max_square_size)?);
    let (plain, blobs): (Vec<_>, Vec<_>) =
        txs.iter().map(|t| classify(t.as_ref())).partition(|c| matches!(c, Classified::Plain(_)));

    let mut used = Vec::with_capacity(txs.len());
    for c in plain {
        if let Classified::Plain(tx) = c {
            if builder.append_tx(tx.clone()) {
                used.push(tx);
            }
        }
    }
    for c in blobs {
        if let Classified::Blob(btx, raw) = c {
            // Invalid blob txs are dropped here; validators would reject them.
            if let Ok(true) = builder.append_blob_tx(btx) {
                used.push(raw);
            }
        }
    }
    Ok((builder.export()?, used))
}

/// Validator-side layout of exactly `txs`.
pub fn construct<T: AsRef<[u8]>>(txs: &[T], app_version: u64, max_square_size: usize) -> Result<Square, SquareError> {
    let max = effective_max(app_version, max_square_size)?;
    // Admit everything so an overflow reports the size the whole block needs.
    let mut builder = Builder::new(usize::MAX);
    let mut blob_txs = Vec::new();
    for raw in txs {
        match classify(raw.as_ref()) {
            Classified::Plain(tx) => {
                builder.append_tx(tx);
            }
            Classified::Blob(btx, _) => blob_txs.push(btx),
        }
    }
    for btx in blob_txs {
        builder.append_blob_tx(btx)?;
    }

    let required = Builder::shares_for(builder.tx_bytes, builder.pfb_bytes, builder.blob_shares);
    let side = min_square_size(required);
    if side > max {
        return Err(SquareError::SquareOverflow { required, side, max });
    }
    builder.export()
}

/* --------------------------------- Tests ----------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_tx(ns: u64, len: usize) -> Vec<u8> {
        BlobTx::new(format!("pfb-{ns}").into_bytes(), vec![Blob::new(Namespace::from_u64(ns), vec![0xAB; len])]).encode()
    }

    #[test]
    fn empty_input_is_one_padding_share() {
        let (sq, used) = build::<Vec<u8>>(&[], LATEST_APP_VERSION, 64).unwrap();
        assert_eq!(sq, Square::empty());
        assert!(used.is_empty());
        assert_eq!(construct::<Vec<u8>>(&[], LATEST_APP_VERSION, 64).unwrap(), Square::empty());
    }

    #[test]
    fn min_square_sizes() {
        assert_eq!(min_square_size(0), 1);
        assert_eq!(min_square_size(1), 1);
        assert_eq!(min_square_size(2), 2);
        assert_eq!(min_square_size(4), 2);
        assert_eq!(min_square_size(5), 4);
        assert_eq!(min_square_size(17), 8);
    }

    #[test]
    fn layout_is_namespace_sorted() {
        let txs = vec![blob_tx(0x3000, 900), b"plain-1".to_vec(), blob_tx(0x2000, 10), b"plain-2".to_vec()];
        let (sq, used) = build(&txs, LATEST_APP_VERSION, 64).unwrap();
        assert_eq!(used.len(), 4);
        assert_eq!(used[0], b"plain-1".to_vec());
        assert_eq!(used[1], b"plain-2".to_vec());
        let ns: Vec<Namespace> = sq.shares().iter().map(|s| s.namespace()).collect();
        assert!(ns.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ns[0], Namespace::TRANSACTION);
        assert_eq!(*ns.last().unwrap(), Namespace::TAIL_PADDING);

        let (plain, pfbs) = sq.transactions().unwrap();
        assert_eq!(plain, vec![b"plain-1".to_vec(), b"plain-2".to_vec()]);
        assert_eq!(pfbs.len(), 2);
    }

    #[test]
    fn construct_matches_build() {
        let txs = vec![b"a".to_vec(), blob_tx(0x5000, 2000), b"b".to_vec()];
        let (sq, used) = build(&txs, LATEST_APP_VERSION, 64).unwrap();
        assert_eq!(construct(&used, LATEST_APP_VERSION, 64).unwrap(), sq);
    }

    #[test]
    fn build_drops_what_does_not_fit() {
        // Each blob needs 9 shares; a 4x4 square holds one, plus the PFB share.
        let txs: Vec<Vec<u8>> = (0..4).map(|i| blob_tx(0x1000 + i, 499 + 8 * 503)).collect();
        let (sq, used) = build(&txs, LATEST_APP_VERSION, 4).unwrap();
        assert!(sq.size() <= 4);
        assert_eq!(used.len(), 1);
    }

    #[test]
    fn build_keeps_trying_after_a_drop() {
        let big = blob_tx(0x1000, 499 + 20 * 503);
        let small = blob_tx(0x1001, 10);
        let (sq, used) = build(&[big, small.clone()], LATEST_APP_VERSION, 4).unwrap();
        assert_eq!(used, vec![small]);
        assert_eq!(sq.size(), 2);
    }

    #[test]
    fn construct_overflow() {
        let txs: Vec<Vec<u8>> = (0..4).map(|i| blob_tx(0x1000 + i, 499 + 8 * 503)).collect();
        match construct(&txs, LATEST_APP_VERSION, 4) {
            Err(SquareError::SquareOverflow { side, max, .. }) => {
                assert_eq!(max, 4);
                assert!(side > 4);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn construct_overflow_counts_every_tx() {
        // Needs more shares than even the largest square holds.
        let huge = vec![0x5A; MAX_SQUARE_SIZE_UPPER_BOUND * MAX_SQUARE_SIZE_UPPER_BOUND * SHARE_SIZE];
        match construct(&[huge], LATEST_APP_VERSION, 64) {
            Err(SquareError::SquareOverflow { required, side, max }) => {
                assert!(required > MAX_SQUARE_SIZE_UPPER_BOUND * MAX_SQUARE_SIZE_UPPER_BOUND);
                assert_eq!(side, 2 * MAX_SQUARE_SIZE_UPPER_BOUND);
                assert_eq!(max, 64);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn bounds_validation() {
        assert_eq!(build::<Vec<u8>>(&[], 1, 3).unwrap_err(), SquareError::InvalidMaxSquareSize(3));
        assert_eq!(build::<Vec<u8>>(&[], 9, 64).unwrap_err(), SquareError::UnsupportedAppVersion(9));
        // App version 1 caps the side at 64 even under a larger governance bound.
        assert_eq!(effective_max(1, 128).unwrap(), 64);
    }

    #[test]
    fn reserved_blob_namespace_rejected_by_construct() {
        let bad = blob_tx(Namespace::TRANSACTION.to_u64(), 10);
        assert!(matches!(
            construct(&[bad.clone()], LATEST_APP_VERSION, 64),
            Err(SquareError::InvalidBlobNamespace(_))
        ));
        let (_, used) = build(&[bad], LATEST_APP_VERSION, 64).unwrap();
        assert!(used.is_empty());
    }
}
