//! Namespaced Merkle Tree (NMT).
//!
//! Every node carries the namespace window `[min, max]` of its subtree, so a
//! root alone tells a verifier whether a namespace can be present at all, and
//! a range proof can show that it has returned *every* leaf of a namespace.
//!
//! - [`Nmt::build`]: tree from namespace-sorted leaves
//! - [`Nmt::prove_namespace`]: `Inclusion`, `Absence` or `Empty` proof
//! - [`Nmt::prove_range`]: proof for an arbitrary contiguous leaf range
//! - [`NamespaceRangeProof::verify_namespace`]: check a proof against a root
//!
//! ### Design
//! * **Namespace width:** 8 bytes ([`Namespace`]), lexicographically ordered.
//! * **Digest:** 32-byte BLAKE3 with one-byte leaf/node domain separators
//!   (see [`hashers`]).
//! * **Shape:** left-balanced; odd layer tails are carried up unchanged.
//! * **Parity:** [`NmtOptions::ignore_max_ns`] keeps the parity namespace out
//!   of parent max windows. It is on by default, since every tree the DA
//!   layer builds has parity leaves on its right edge.

pub mod hashers;
pub mod tree;
pub mod types;
pub mod verify;

pub use crate::namespace::Namespace;
pub use tree::{Nmt, NmtError, NmtOptions, EMPTY_ROOT};
pub use types::{Leaf, Node, Root};
pub use verify::{NamespaceRangeProof, ProofError, RangeProof};

/// Compute the root of `leaves` without retaining the tree.
pub fn nmt_root(leaves: &[Leaf<'_>]) -> Result<Root, NmtError> {
    Ok(Nmt::build(leaves)?.root())
}

/* --------------------------------- Tests ----------------------------------- */
