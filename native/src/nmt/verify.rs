//! Namespace range proofs and their verification.
//!
//! ## Model
//! A [`RangeProof`] opens the contiguous leaves `[start, end)` of a tree with
//! `leaf_count` leaves. `nodes` are the roots of the maximal subtrees outside
//! the range, left to right. The verifier walks the same left-balanced shape
//! as the builder, consuming a proof node for every subtree disjoint from the
//! range and a leaf for every position inside it.
//!
//! A [`NamespaceRangeProof`] ties a range proof to a namespace query:
//! - `Inclusion`: the opened leaves are *all* leaves of the namespace.
//! - `Absence`: the opened leaves are the two neighbours around the gap
//!   where the namespace would sit; only their hashes travel.
//! - `Empty`: the namespace lies outside the root's window.
//!
//! ### Completeness
//! For namespace proofs, every proof node left of the range must end below
//! the namespace and every node right of it must start above. Otherwise the
//! proof could be hiding leaves of the namespace. Such proofs, and proofs
//! whose claimed leaves do not exactly cover `[start, end)`, fail with
//! [`ProofError::FailedCompletenessCheck`], which is deliberately distinct
//! from a plain [`ProofError::RootMismatch`].

use crate::namespace::Namespace;
use crate::utils::split_point;
use super::hashers;
use super::tree::EMPTY_ROOT;
use super::types::{Node, Root};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Proof for the contiguous leaves `[start, end)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeProof {
    pub start: usize,
    pub end: usize,
    pub nodes: Vec<Node>,
    pub leaf_count: usize,
}

/// Proof answering "which leaves carry namespace `ns`?".
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceRangeProof {
    Inclusion(RangeProof),
    Absence { proof: RangeProof, leaf_hashes: [Node; 2] },
    Empty,
}

/// Errors returned by verifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("failed completeness check")]
    FailedCompletenessCheck,
    #[error("root hash mismatch")]
    RootMismatch,
    #[error("malformed proof: {0}")]
    WrongProofShape(&'static str),
    #[error("proof siblings out of namespace order")]
    UnorderedSiblings,
}

/* ------------------------------ Recompute ------------------------------- */

/// Walks the left-balanced tree shape, pulling leaves and proof nodes in order.
struct Recompute<'a> {
    start: usize,
    end: usize,
    leaves: &'a [Node],
    nodes: &'a [Node],
    leaf_pos: usize,
    node_pos: usize,
    ns: Option<Namespace>,
    ignore_max_ns: bool,
}

impl Recompute<'_> {
    fn subtree(&mut self, lo: usize, hi: usize) -> Result<Node, ProofError> {
        if hi <= self.start || lo >= self.end {
            let node = *self
                .nodes
                .get(self.node_pos)
                .ok_or(ProofError::WrongProofShape("too few proof nodes"))?;
            self.node_pos += 1;
            if let Some(ns) = self.ns {
                let hides_left = hi <= self.start && node.max >= ns;
                let hides_right = lo >= self.end && node.min <= ns;
                if hides_left || hides_right {
                    return Err(ProofError::FailedCompletenessCheck);
                }
            }
            return Ok(node);
        }
        if hi - lo == 1 {
            let leaf = *self
                .leaves
                .get(self.leaf_pos)
                .ok_or(ProofError::FailedCompletenessCheck)?;
            self.leaf_pos += 1;
            return Ok(leaf);
        }
        let k = split_point(hi - lo);
        let left = self.subtree(lo, lo + k)?;
        let right = self.subtree(lo + k, hi)?;
        if !hashers::ordered(&left, &right) {
            return Err(ProofError::UnorderedSiblings);
        }
        Ok(hashers::parent(&left, &right, self.ignore_max_ns))
    }
}

impl RangeProof {
    fn check_bounds(&self) -> Result<(), ProofError> {
        if self.start >= self.end || self.end > self.leaf_count {
            return Err(ProofError::WrongProofShape("range outside tree"));
        }
        Ok(())
    }

    fn recompute(&self, leaves: &[Node], ns: Option<Namespace>, ignore_max_ns: bool) -> Result<Node, ProofError> {
        self.check_bounds()?;
        if leaves.len() != self.end - self.start {
            return Err(ProofError::FailedCompletenessCheck);
        }
        let mut walk = Recompute {
            start: self.start,
            end: self.end,
            leaves,
            nodes: &self.nodes,
            leaf_pos: 0,
            node_pos: 0,
            ns,
            ignore_max_ns,
        };
        let root = walk.subtree(0, self.leaf_count)?;
        if walk.node_pos != self.nodes.len() {
            return Err(ProofError::WrongProofShape("unused proof nodes"));
        }
        Ok(root)
    }

    /// Verify hashed leaves against `root` without any namespace semantics.
    pub fn verify_leaf_hashes(&self, root: &Root, leaves: &[Node], ignore_max_ns: bool) -> Result<(), ProofError> {
        let got = self.recompute(leaves, None, ignore_max_ns)?;
        if &got != root {
            return Err(ProofError::RootMismatch);
        }
        Ok(())
    }
}

impl NamespaceRangeProof {
    #[inline]
    pub fn is_of_absence(&self) -> bool {
        matches!(self, Self::Absence { .. })
    }

    #[inline]
    pub fn is_empty_proof(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Opened index range (`0..0` for `Empty`).
    pub fn range(&self) -> core::ops::Range<usize> {
        match self {
            Self::Inclusion(p) | Self::Absence { proof: p, .. } => p.start..p.end,
            Self::Empty => 0..0,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.range().start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.range().end
    }

    /// Verify that `leaves` are exactly the data of namespace `ns` under `root`.
    ///
    /// `leaves` must be empty for absence and empty proofs.
    pub fn verify_namespace<T: AsRef<[u8]>>(&self, root: &Root, ns: Namespace, leaves: &[T]) -> Result<(), ProofError> {
        let hashed: Vec<Node> = leaves.iter().map(|d| hashers::leaf(ns, d.as_ref())).collect();
        self.verify_leaf_hashes(root, ns, &hashed)
    }

    /// Same as [`Self::verify_namespace`] for callers holding leaf hashes.
    pub fn verify_leaf_hashes(&self, root: &Root, ns: Namespace, leaves: &[Node]) -> Result<(), ProofError> {
        self.verify_with(root, ns, leaves, true)
    }

    /// Full verification with an explicit max-namespace rule.
    pub fn verify_with(&self, root: &Root, ns: Namespace, leaves: &[Node], ignore_max_ns: bool) -> Result<(), ProofError> {
        match self {
            Self::Empty => {
                if !leaves.is_empty() {
                    return Err(ProofError::WrongProofShape("empty proof with leaves"));
                }
                if root == &*EMPTY_ROOT || !root.contains(ns) {
                    Ok(())
                } else {
                    Err(ProofError::WrongProofShape("empty proof for namespace inside root range"))
                }
            }
            Self::Inclusion(proof) => {
                if leaves.is_empty() {
                    return Err(ProofError::FailedCompletenessCheck);
                }
                if leaves.iter().any(|l| l.min != ns || l.max != ns) {
                    return Err(ProofError::WrongProofShape("leaf outside queried namespace"));
                }
                let got = proof.recompute(leaves, Some(ns), ignore_max_ns)?;
                if &got != root {
                    return Err(ProofError::RootMismatch);
                }
                Ok(())
            }
            Self::Absence { proof, leaf_hashes } => {
                if !leaves.is_empty() {
                    return Err(ProofError::WrongProofShape("absence proof with leaves"));
                }
                if proof.end != proof.start + 2 {
                    return Err(ProofError::WrongProofShape("absence proof must open two leaves"));
                }
                let [before, after] = leaf_hashes;
                if !(before.max < ns && ns < after.min) {
                    return Err(ProofError::FailedCompletenessCheck);
                }
                let got = proof.recompute(leaf_hashes, Some(ns), ignore_max_ns)?;
                if &got != root {
                    return Err(ProofError::RootMismatch);
                }
                Ok(())
            }
        }
    }

    /// Boolean convenience over [`Self::verify_namespace`].
    pub fn verify<T: AsRef<[u8]>>(&self, root: &Root, ns: Namespace, leaves: &[T]) -> bool {
        self.verify_namespace(root, ns, leaves).is_ok()
    }
}

/* --------------------------------- Tests -------------------------------- */
