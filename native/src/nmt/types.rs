//! NMT core types: [`Node`] (a.k.a. [`Root`]) and [`Leaf`].
//!
//! - **Node**: `(min, max, hash)`: a digest plus the namespace window its
//!   subtree covers. Roots are nodes, so a verifier can tell whether a
//!   namespace can possibly be present without touching the tree.
//! - **Leaf**: a single `(namespace, payload)` pair.

use crate::hash::Digest32;
use crate::namespace::{Namespace, NAMESPACE_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A namespaced digest: subtree hash plus its namespace window.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    pub min: Namespace,
    pub max: Namespace,
    pub hash: Digest32,
}

/// Roots are plain nodes.
pub type Root = Node;

impl Node {
    /// Serialized width: `min || max || hash`.
    pub const SERIALIZED_LEN: usize = 2 * NAMESPACE_SIZE + 32;

    #[inline]
    pub const fn new(min: Namespace, max: Namespace, hash: Digest32) -> Self {
        Self { min, max, hash }
    }

    /// Canonical `min || max || hash` encoding.
    pub fn to_bytes(&self) -> [u8; Self::SERIALIZED_LEN] {
        let mut out = [0u8; Self::SERIALIZED_LEN];
        out[..NAMESPACE_SIZE].copy_from_slice(self.min.as_bytes());
        out[NAMESPACE_SIZE..2 * NAMESPACE_SIZE].copy_from_slice(self.max.as_bytes());
        out[2 * NAMESPACE_SIZE..].copy_from_slice(&self.hash);
        out
    }

    /// Whether `ns` falls inside `[min, max]`.
    #[inline]
    pub fn contains(&self, ns: Namespace) -> bool {
        self.min <= ns && ns <= self.max
    }
}

/// A single NMT leaf containing a namespace and its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaf<'a> {
    pub ns: Namespace,
    pub data: &'a [u8],
}

impl<'a> Leaf<'a> {
    #[inline]
    pub fn new(ns: Namespace, data: &'a [u8]) -> Self {
        Self { ns, data }
    }
}

/* --------------------------------- Tests ----------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_bytes_layout() {
        let n = Node::new(Namespace::from_u64(1), Namespace::from_u64(2), [7u8; 32]);
        let b = n.to_bytes();
        assert_eq!(b.len(), 48);
        assert_eq!(&b[..8], Namespace::from_u64(1).as_bytes());
        assert_eq!(&b[8..16], Namespace::from_u64(2).as_bytes());
        assert!(b[16..].iter().all(|&x| x == 7));
    }

    #[test]
    fn contains_is_inclusive() {
        let n = Node::new(Namespace::from_u64(3), Namespace::from_u64(9), [0u8; 32]);
        assert!(n.contains(Namespace::from_u64(3)));
        assert!(n.contains(Namespace::from_u64(9)));
        assert!(!n.contains(Namespace::from_u64(10)));
    }
}
