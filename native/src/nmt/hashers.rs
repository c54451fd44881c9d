//! Namespace-aware hash combiners for Namespaced Merkle Trees (NMT).
//!
//! - **Leaves** commit to the leaf's namespace and payload:
//!   `DS_LEAF || ns || data`
//! - **Inner nodes** commit to *both* children's namespace ranges and hashes:
//!   `DS_NODE || l.min || l.max || l.hash || r.min || r.max || r.hash`
//!
//! The parent window is `[min(l.min, r.min), max(l.max, r.max)]`, except under
//! the *ignore max namespace* rule: parity shares always sit at the right end
//! of an extended row, and letting their namespace leak into every root would
//! make "namespace above this row" unprovable. So when the right child starts
//! with [`Namespace::PARITY_SHARE`], the parent max is the left child's max.

use crate::hash::Digest32;
use crate::namespace::Namespace;
use super::types::Node;

/// Domain separation tags.
const DS_LEAF: u8 = 0x00;
const DS_NODE: u8 = 0x01;

#[inline]
fn hash_with_domain(domain: u8, parts: &[&[u8]]) -> Digest32 {
    let mut h = blake3::Hasher::new();
    h.update(&[domain]);
    for p in parts {
        h.update(p);
    }
    *h.finalize().as_bytes()
}

/// Leaf node: `min == max == ns`.
#[inline]
pub fn leaf(ns: Namespace, data: &[u8]) -> Node {
    let digest = hash_with_domain(DS_LEAF, &[ns.as_bytes(), data]);
    Node::new(ns, ns, digest)
}

/// Combine two children into their parent. Order is significant.
#[inline]
pub fn parent(left: &Node, right: &Node, ignore_max_ns: bool) -> Node {
    let min = left.min.min(right.min);
    let max = if ignore_max_ns && left.min.is_parity() {
        Namespace::PARITY_SHARE
    } else if ignore_max_ns && right.min.is_parity() {
        left.max
    } else {
        left.max.max(right.max)
    };

    let digest = hash_with_domain(
        DS_NODE,
        &[
            left.min.as_bytes(),
            left.max.as_bytes(),
            &left.hash,
            right.min.as_bytes(),
            right.max.as_bytes(),
            &right.hash,
        ],
    );
    Node::new(min, max, digest)
}

/// Siblings of an untrusted proof must not overlap: `left.max <= right.min`.
#[inline]
pub fn ordered(left: &Node, right: &Node) -> bool {
    left.max <= right.min
}

/* --------------------------------- Tests ----------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(v: u64) -> Namespace {
        Namespace::from_u64(v)
    }

    #[test]
    fn leaf_commit_includes_namespace() {
        assert_ne!(leaf(ns(1), b"payload").hash, leaf(ns(2), b"payload").hash);
    }

    #[test]
    fn parent_commits_children_bounds_and_order() {
        let a = leaf(ns(1), b"a");
        let b = leaf(ns(9), b"b");

        let p1 = parent(&a, &b, false);
        let p2 = parent(&b, &a, false);

        assert_eq!((p1.min, p1.max), (ns(1), ns(9)));
        assert_ne!(p1.hash, p2.hash, "left/right order must affect the parent digest");
        assert_eq!((p2.min, p2.max), (ns(1), ns(9)));
    }

    #[test]
    fn ignore_max_ns_hides_parity() {
        let data = leaf(ns(5), b"d");
        let par = leaf(Namespace::PARITY_SHARE, b"p");

        assert_eq!(parent(&data, &par, true).max, ns(5));
        assert_eq!(parent(&data, &par, false).max, Namespace::PARITY_SHARE);
        let both = parent(&par, &par, true);
        assert_eq!((both.min, both.max), (Namespace::PARITY_SHARE, Namespace::PARITY_SHARE));
    }

    #[test]
    fn sibling_ordering() {
        let a = leaf(ns(1), b"a");
        let b = leaf(ns(2), b"b");
        assert!(ordered(&a, &b));
        assert!(!ordered(&b, &a));
    }
}
