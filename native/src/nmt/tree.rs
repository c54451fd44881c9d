//! Iterative, bottom-up Namespaced Merkle Tree (NMT) construction and proof
//! generation.
//!
//! - **Leaves** are hashed (namespace-aware) possibly in parallel (feature `rayon`).
//! - The tree is built bottom-up in *layers*; for odd-width layers the last
//!   node is **carried up** unchanged. The result is the left-balanced tree in
//!   which a range `[lo, hi)` splits at the largest power of two below its
//!   width, which is what proof generation and verification walk.
//! - Node `i` of layer `h` covers leaves `[i << h, min((i + 1) << h, n))`.

use once_cell::sync::Lazy;

use crate::hash::{hash_ds, DsTag};
use crate::namespace::Namespace;
use crate::utils::{ceil_log2, split_point};
use super::hashers;
use super::types::{Leaf, Node, Root};
use super::verify::{NamespaceRangeProof, RangeProof};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Root of a tree without leaves.
pub static EMPTY_ROOT: Lazy<Root> =
    Lazy::new(|| Node::new(Namespace::default(), Namespace::default(), hash_ds(DsTag::EmptyRoot, b"")));

/// Errors raised while building trees or proofs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NmtError {
    #[error("leaf {index} has namespace {ns} below its predecessor {prev}")]
    UnorderedLeaves { index: usize, prev: Namespace, ns: Namespace },
    #[error("invalid range [{start}, {end}) for a tree of {len} leaves")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// Build options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NmtOptions {
    /// Keep parity namespaces out of parent max windows (see `hashers::parent`).
    pub ignore_max_ns: bool,
}

impl Default for NmtOptions {
    fn default() -> Self {
        Self { ignore_max_ns: true }
    }
}

/// An in-memory NMT retaining every layer, ready to serve proofs.
#[derive(Clone, Debug)]
pub struct Nmt {
    namespaces: Vec<Namespace>,
    layers: Vec<Vec<Node>>,
    opts: NmtOptions,
}

/* ----------------------------- Leaf hashing ------------------------------ */

#[inline]
fn hash_leaves(leaves: &[Leaf<'_>]) -> Vec<Node> {
    #[cfg(feature = "rayon")]
    {
        leaves.par_iter().map(|lf| hashers::leaf(lf.ns, lf.data)).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        leaves.iter().map(|lf| hashers::leaf(lf.ns, lf.data)).collect()
    }
}

/* --------------------------- Iterative build ----------------------------- */

/// Build the *next* layer from a slice of nodes. Odd tail is carried up.
#[inline]
fn next_layer(curr: &[Node], ignore_max_ns: bool) -> Vec<Node> {
    let mut out = Vec::with_capacity((curr.len() + 1) / 2);
    let mut pairs = curr.chunks_exact(2);
    for pair in &mut pairs {
        out.push(hashers::parent(&pair[0], &pair[1], ignore_max_ns));
    }
    out.extend_from_slice(pairs.remainder());
    out
}

impl Nmt {
    /// Build with default options (parity-aware max namespace).
    pub fn build(leaves: &[Leaf<'_>]) -> Result<Self, NmtError> {
        Self::with_options(leaves, NmtOptions::default())
    }

    /// Build from leaves sorted non-decreasing by namespace.
    pub fn with_options(leaves: &[Leaf<'_>], opts: NmtOptions) -> Result<Self, NmtError> {
        for (i, w) in leaves.windows(2).enumerate() {
            if w[1].ns < w[0].ns {
                return Err(NmtError::UnorderedLeaves { index: i + 1, prev: w[0].ns, ns: w[1].ns });
            }
        }

        let namespaces = leaves.iter().map(|l| l.ns).collect();
        let mut layers = Vec::new();
        let mut curr = hash_leaves(leaves);
        if !curr.is_empty() {
            while curr.len() > 1 {
                let next = next_layer(&curr, opts.ignore_max_ns);
                layers.push(curr);
                curr = next;
            }
            layers.push(curr);
        }
        Ok(Self { namespaces, layers, opts })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    #[inline]
    pub fn options(&self) -> NmtOptions {
        self.opts
    }

    pub fn root(&self) -> Root {
        self.layers
            .last()
            .and_then(|top| top.first().copied())
            .unwrap_or(*EMPTY_ROOT)
    }

    /// Hashed leaf at `index`.
    pub fn leaf_node(&self, index: usize) -> Option<Node> {
        self.layers.first().and_then(|l| l.get(index).copied())
    }

    /// Node covering the left-balanced subtree `[lo, hi)`.
    fn subtree_node(&self, lo: usize, hi: usize) -> Node {
        let h = ceil_log2(hi - lo);
        self.layers[h][lo >> h]
    }

    fn collect_outer(&self, lo: usize, hi: usize, start: usize, end: usize, out: &mut Vec<Node>) {
        if hi <= start || lo >= end {
            out.push(self.subtree_node(lo, hi));
            return;
        }
        if start <= lo && hi <= end {
            return;
        }
        let k = split_point(hi - lo);
        self.collect_outer(lo, lo + k, start, end, out);
        self.collect_outer(lo + k, hi, start, end, out);
    }

    /// Prove the contiguous leaves `[start, end)`.
    ///
    /// The proof lists, left to right, the roots of the maximal subtrees that
    /// lie entirely outside the range.
    pub fn prove_range(&self, start: usize, end: usize) -> Result<RangeProof, NmtError> {
        if start >= end || end > self.len() {
            return Err(NmtError::InvalidRange { start, end, len: self.len() });
        }
        let mut nodes = Vec::new();
        self.collect_outer(0, self.len(), start, end, &mut nodes);
        Ok(RangeProof { start, end, nodes, leaf_count: self.len() })
    }

    /// Prove presence or absence of `ns`.
    pub fn prove_namespace(&self, ns: Namespace) -> NamespaceRangeProof {
        let root = self.root();
        if self.is_empty() || !root.contains(ns) {
            return NamespaceRangeProof::Empty;
        }

        let start = self.namespaces.partition_point(|n| *n < ns);
        let end = self.namespaces.partition_point(|n| *n <= ns);

        if start < end {
            return match self.prove_range(start, end) {
                Ok(proof) => NamespaceRangeProof::Inclusion(proof),
                Err(_) => NamespaceRangeProof::Empty,
            };
        }

        // Within the window but absent: open the two leaves around the gap.
        // `root.contains(ns)` guarantees a leaf on each side.
        if start == 0 || start >= self.len() {
            return NamespaceRangeProof::Empty;
        }
        match (self.prove_range(start - 1, start + 1), self.leaf_node(start - 1), self.leaf_node(start)) {
            (Ok(proof), Some(before), Some(after)) => {
                NamespaceRangeProof::Absence { proof, leaf_hashes: [before, after] }
            }
            _ => NamespaceRangeProof::Empty,
        }
    }

    /// Leaf index range holding `ns` (empty when absent).
    pub fn namespace_range(&self, ns: Namespace) -> core::ops::Range<usize> {
        let start = self.namespaces.partition_point(|n| *n < ns);
        let end = self.namespaces.partition_point(|n| *n <= ns);
        start..end
    }
}

/* --------------------------------- Tests ----------------------------------- */
