//! Data availability header (DAH): the NMT roots of every row and column of
//! an extended square, and the block data commitment derived from them.
//!
//! Leaves of an axis tree are whole shares. A share keeps its own namespace
//! only inside Q0; every share of Q1, Q2 and Q3 is a leaf of the parity
//! namespace, so each axis stays namespace-sorted and parity sits at its
//! right edge.

use crate::erasure::{extend, Axis, ErasureError, ExtendedDataSquare};
use crate::hash::{hash_many, Digest32, DsTag};
use crate::namespace::{Namespace, NamespaceError, NAMESPACE_SIZE};
use crate::nmt::{Leaf, Nmt, NmtError, Root};
use crate::square::{Square, MAX_SQUARE_SIZE_UPPER_BOUND};
use crate::utils::{is_pow2, par_map_indexed};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DahError {
    #[error("invalid header: {0}")]
    InvalidShape(&'static str),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error(transparent)]
    Nmt(#[from] NmtError),
    #[error(transparent)]
    Erasure(#[from] ErasureError),
}

/// Namespace under which the share at (`axis_index`, `position`) enters its
/// axis tree, for an original square of side `k`.
pub fn leaf_namespace(axis_index: usize, position: usize, share: &[u8], k: usize) -> Result<Namespace, DahError> {
    if axis_index < k && position < k {
        Ok(Namespace::try_from_slice(share.get(..NAMESPACE_SIZE).unwrap_or(share))?)
    } else {
        Ok(Namespace::PARITY_SHARE)
    }
}

/// Leaves of one axis.
pub fn axis_leaves<'a>(axis_index: usize, shares: &[&'a [u8]], k: usize) -> Result<Vec<Leaf<'a>>, DahError> {
    shares
        .iter()
        .enumerate()
        .map(|(pos, s)| Ok(Leaf::new(leaf_namespace(axis_index, pos, s, k)?, *s)))
        .collect()
}

/// Tree of one axis, kept for proof generation.
pub fn axis_tree(axis_index: usize, shares: &[&[u8]], k: usize) -> Result<Nmt, DahError> {
    Ok(Nmt::build(&axis_leaves(axis_index, shares, k)?)?)
}

/// Root of one axis.
pub fn axis_root(axis_index: usize, shares: &[&[u8]], k: usize) -> Result<Root, DahError> {
    Ok(axis_tree(axis_index, shares, k)?.root())
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataAvailabilityHeader {
    row_roots: Vec<Root>,
    column_roots: Vec<Root>,
}

impl DataAvailabilityHeader {
    /// Header of `eds`; all `4k` axis trees are built in parallel.
    pub fn compute(eds: &ExtendedDataSquare) -> Result<Self, DahError> {
        let w = eds.width();
        let k = eds.original_width();
        let mut roots = par_map_indexed(2 * w, |n| {
            let (axis, i) = if n < w { (Axis::Row, n) } else { (Axis::Col, n - w) };
            axis_root(i, &eds.axis(axis, i), k)
        })?;
        let column_roots = roots.split_off(w);
        Ok(Self { row_roots: roots, column_roots })
    }

    /// Assemble a header from known roots (e.g. received from a peer).
    pub fn from_roots(row_roots: Vec<Root>, column_roots: Vec<Root>) -> Result<Self, DahError> {
        let dah = Self { row_roots, column_roots };
        dah.validate_basic()?;
        Ok(dah)
    }

    /// Header of a block without transactions.
    pub fn min_data_availability_header() -> Result<Self, DahError> {
        Self::compute(&extend(&Square::empty())?)
    }

    #[inline]
    pub fn row_roots(&self) -> &[Root] {
        &self.row_roots
    }

    #[inline]
    pub fn column_roots(&self) -> &[Root] {
        &self.column_roots
    }

    /// Width of the extended square this header commits to.
    #[inline]
    pub fn square_width(&self) -> usize {
        self.row_roots.len()
    }

    /// Block data commitment: serialized row roots, then column roots.
    pub fn hash(&self) -> Digest32 {
        let encoded: Vec<[u8; crate::nmt::Node::SERIALIZED_LEN]> =
            self.row_roots.iter().chain(self.column_roots.iter()).map(|r| r.to_bytes()).collect();
        hash_many(DsTag::DataRoot, encoded.iter().map(|b| b.as_slice()))
    }

    pub fn validate_basic(&self) -> Result<(), DahError> {
        let w = self.row_roots.len();
        if w != self.column_roots.len() {
            return Err(DahError::InvalidShape("row and column root counts differ"));
        }
        if w < 2 || !is_pow2(w) {
            return Err(DahError::InvalidShape("root count must be 2k with k a power of two"));
        }
        if w > 2 * MAX_SQUARE_SIZE_UPPER_BOUND {
            return Err(DahError::InvalidShape("square too large"));
        }
        Ok(())
    }

    /// Rows whose namespace window may hold `ns`.
    pub fn rows_for_namespace(&self, ns: Namespace) -> Vec<usize> {
        self.row_roots
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contains(ns))
            .map(|(i, _)| i)
            .collect()
    }
}

/* --------------------------------- Tests ----------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::{build, Blob, BlobTx, LATEST_APP_VERSION};

    fn block() -> (Square, ExtendedDataSquare) {
        let txs = vec![
            b"transfer".to_vec(),
            BlobTx::new(b"pfb".to_vec(), vec![Blob::new(Namespace::from_u64(0x4000), vec![9; 1500])]).encode(),
        ];
        let (sq, _) = build(&txs, LATEST_APP_VERSION, 64).unwrap();
        let eds = extend(&sq).unwrap();
        (sq, eds)
    }

    #[test]
    fn deterministic_commitment() {
        let (_, eds) = block();
        let a = DataAvailabilityHeader::compute(&eds).unwrap();
        let b = DataAvailabilityHeader::compute(&eds.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.square_width(), eds.width());
        a.validate_basic().unwrap();
    }

    #[test]
    fn parity_rows_are_parity_only() {
        let (sq, eds) = block();
        let dah = DataAvailabilityHeader::compute(&eds).unwrap();
        let k = sq.size();
        for r in &dah.row_roots()[k..] {
            assert_eq!(r.min, Namespace::PARITY_SHARE);
            assert_eq!(r.max, Namespace::PARITY_SHARE);
        }
        // Data rows keep their data window despite parity leaves.
        assert_eq!(dah.row_roots()[0].min, Namespace::TRANSACTION);
        assert_ne!(dah.row_roots()[0].max, Namespace::PARITY_SHARE);
    }

    #[test]
    fn namespace_row_filter() {
        let (_, eds) = block();
        let dah = DataAvailabilityHeader::compute(&eds).unwrap();
        let rows = dah.rows_for_namespace(Namespace::from_u64(0x4000));
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|&r| r < eds.original_width()));
        assert!(dah.rows_for_namespace(Namespace::from_u64(0x2000)).iter().all(|r| rows.contains(r)));
    }

    #[test]
    fn min_header_is_stable() {
        let a = DataAvailabilityHeader::min_data_availability_header().unwrap();
        assert_eq!(a.square_width(), 2);
        assert_eq!(a, DataAvailabilityHeader::min_data_availability_header().unwrap());
    }

    #[test]
    fn shape_validation() {
        let (_, eds) = block();
        let dah = DataAvailabilityHeader::compute(&eds).unwrap();
        let mut rows = dah.row_roots().to_vec();
        rows.pop();
        assert!(DataAvailabilityHeader::from_roots(rows, dah.column_roots().to_vec()).is_err());
        assert!(DataAvailabilityHeader::from_roots(vec![], vec![]).is_err());
    }
}
