//! Rows returned by an ND request, and their verification.

use dasquare_native::nmt::{NamespaceRangeProof, ProofError, RangeProof};
use dasquare_native::{DataAvailabilityHeader, Namespace};
use serde_bytes::ByteBuf;

use super::wire::{Row, WireProof};
use super::Error;

/// Shares of one namespace within one row, plus the proof tying them to the
/// row root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespacedRow {
    pub shares: Vec<Vec<u8>>,
    pub proof: NamespaceRangeProof,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("expected {expected} rows for namespace, got {got}")]
    RowCount { expected: usize, got: usize },
    #[error("row {row}: {source}")]
    Proof {
        row: usize,
        #[source]
        source: ProofError,
    },
}

impl NamespacedRow {
    /// Rebuild a row from the wire. Non-empty shares make an inclusion
    /// proof; an empty row must carry both bracketing leaf hashes.
    pub fn from_wire(row: Row) -> Result<Self, Error> {
        let shares: Vec<Vec<u8>> = row.shares.into_iter().map(ByteBuf::into_vec).collect();
        let proof = match row.proof {
            None => NamespaceRangeProof::Empty,
            Some(p) => {
                let range = RangeProof {
                    start: p.start as usize,
                    end: p.end as usize,
                    nodes: p.nodes,
                    leaf_count: p.leaf_count as usize,
                };
                if !shares.is_empty() {
                    if !p.leaf_hashes.is_empty() {
                        return Err(Error::Codec("inclusion proof with leaf hashes".into()));
                    }
                    NamespaceRangeProof::Inclusion(range)
                } else {
                    let leaf_hashes = <[_; 2]>::try_from(p.leaf_hashes)
                        .map_err(|v| Error::Codec(format!("absence proof with {} leaf hashes", v.len())))?;
                    NamespaceRangeProof::Absence { proof: range, leaf_hashes }
                }
            }
        };
        Ok(Self { shares, proof })
    }

    pub fn to_wire(&self) -> Row {
        let proof = match &self.proof {
            NamespaceRangeProof::Empty => None,
            NamespaceRangeProof::Inclusion(p) => Some(wire_proof(p, Vec::new())),
            NamespaceRangeProof::Absence { proof, leaf_hashes } => Some(wire_proof(proof, leaf_hashes.to_vec())),
        };
        Row { shares: self.shares.iter().cloned().map(ByteBuf::from).collect(), proof }
    }
}

fn wire_proof(p: &RangeProof, leaf_hashes: Vec<dasquare_native::nmt::Node>) -> WireProof {
    // Axes hold at most 256 leaves.
    WireProof {
        start: p.start as u32,
        end: p.end as u32,
        leaf_count: p.leaf_count as u32,
        nodes: p.nodes.clone(),
        leaf_hashes,
    }
}

/// Answer to one ND request: one entry per row root covering the namespace,
/// in row order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespacedShares(pub Vec<NamespacedRow>);

impl NamespacedShares {
    pub fn rows(&self) -> &[NamespacedRow] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All shares of the namespace, in square order.
    pub fn flatten(&self) -> Vec<Vec<u8>> {
        self.0.iter().flat_map(|r| r.shares.iter().cloned()).collect()
    }

    /// Check every row against the matching row root of `dah`.
    pub fn verify(&self, dah: &DataAvailabilityHeader, ns: Namespace) -> Result<(), VerifyError> {
        let rows = dah.rows_for_namespace(ns);
        if rows.len() != self.0.len() {
            return Err(VerifyError::RowCount { expected: rows.len(), got: self.0.len() });
        }
        for (row, answer) in rows.into_iter().zip(&self.0) {
            answer
                .proof
                .verify_namespace(&dah.row_roots()[row], ns, &answer.shares)
                .map_err(|source| VerifyError::Proof { row, source })?;
        }
        Ok(())
    }
}

impl From<Vec<NamespacedRow>> for NamespacedShares {
    fn from(rows: Vec<NamespacedRow>) -> Self {
        Self(rows)
    }
}

/* --------------------------------- Tests -------------------------------- */
