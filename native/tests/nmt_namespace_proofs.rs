mod common;

use common::*;
use dasquare_native::nmt::{hashers, Leaf, NamespaceRangeProof, Nmt, ProofError, EMPTY_ROOT};
use dasquare_native::Namespace;

fn ns(n: u64) -> Namespace {
    Namespace::from_u64(n)
}

/// Sorted leaves: namespaces 2, 2, 5, 5, 5, 9, 12 with random payloads.
fn fixture(rng: &mut XorShift64) -> (Vec<(Namespace, Vec<u8>)>, Nmt) {
    let spec = [2u64, 2, 5, 5, 5, 9, 12];
    let data: Vec<(Namespace, Vec<u8>)> = spec.iter().map(|&n| (ns(n), random_bytes(33, rng))).collect();
    let leaves: Vec<Leaf<'_>> = data.iter().map(|(n, d)| Leaf::new(*n, d)).collect();
    let tree = Nmt::build(&leaves).unwrap();
    (data, tree)
}

fn payloads(data: &[(Namespace, Vec<u8>)], ns: Namespace) -> Vec<Vec<u8>> {
    data.iter().filter(|(n, _)| *n == ns).map(|(_, d)| d.clone()).collect()
}

#[test]
fn present_namespace_yields_verifying_inclusion() {
    let mut rng = rng_from_env();
    let (data, tree) = fixture(&mut rng);
    let root = tree.root();
    for n in [2u64, 5, 9, 12] {
        let proof = tree.prove_namespace(ns(n));
        assert!(matches!(proof, NamespaceRangeProof::Inclusion(_)), "ns {n}");
        proof.verify_namespace(&root, ns(n), &payloads(&data, ns(n))).unwrap();
    }
}

#[test]
fn gap_namespace_yields_verifying_absence() {
    let mut rng = rng_from_env();
    let (_, tree) = fixture(&mut rng);
    let root = tree.root();
    for n in [3u64, 4, 7, 10] {
        let proof = tree.prove_namespace(ns(n));
        assert!(proof.is_of_absence(), "ns {n}");
        assert_eq!(proof.end() - proof.start(), 2);
        proof.verify_namespace::<Vec<u8>>(&root, ns(n), &[]).unwrap();
    }
}

#[test]
fn outside_namespace_yields_empty() {
    let mut rng = rng_from_env();
    let (_, tree) = fixture(&mut rng);
    let root = tree.root();
    for n in [1u64, 13, u64::MAX - 5] {
        let proof = tree.prove_namespace(ns(n));
        assert!(proof.is_empty_proof());
        assert!(proof.verify::<Vec<u8>>(&root, ns(n), &[]));
    }
    // An empty proof cannot hide a namespace that is inside the root window.
    assert!(!NamespaceRangeProof::Empty.verify::<Vec<u8>>(&root, ns(5), &[]));
    assert!(NamespaceRangeProof::Empty.verify::<Vec<u8>>(&EMPTY_ROOT, ns(5), &[]));
}

#[test]
fn dropping_a_leaf_fails_completeness() {
    let mut rng = rng_from_env();
    let (data, tree) = fixture(&mut rng);
    let root = tree.root();
    let proof = tree.prove_namespace(ns(5));
    let mut leaves = payloads(&data, ns(5));
    leaves.pop();
    assert_eq!(proof.verify_namespace(&root, ns(5), &leaves).unwrap_err(), ProofError::FailedCompletenessCheck);
}

#[test]
fn shrunk_range_is_caught_as_incomplete() {
    let mut rng = rng_from_env();
    let (data, tree) = fixture(&mut rng);
    let root = tree.root();

    // A range proof over only the middle leaf of namespace 5 is a valid
    // range proof, but its neighbours could hold more of namespace 5.
    let partial = NamespaceRangeProof::Inclusion(tree.prove_range(3, 4).unwrap());
    let leaf = data[3].1.clone();
    assert_eq!(
        partial.verify_namespace(&root, ns(5), &[leaf]).unwrap_err(),
        ProofError::FailedCompletenessCheck
    );
}

#[test]
fn tampered_payload_is_root_mismatch() {
    let mut rng = rng_from_env();
    let (data, tree) = fixture(&mut rng);
    let root = tree.root();
    let proof = tree.prove_namespace(ns(9));
    let mut leaf = payloads(&data, ns(9));
    leaf[0][0] ^= 1;
    assert_eq!(proof.verify_namespace(&root, ns(9), &leaf).unwrap_err(), ProofError::RootMismatch);
}

#[test]
fn leaf_hash_verification_matches_payload_verification() {
    let mut rng = rng_from_env();
    let (data, tree) = fixture(&mut rng);
    let root = tree.root();
    let proof = tree.prove_namespace(ns(2));
    let hashed: Vec<_> = payloads(&data, ns(2)).iter().map(|d| hashers::leaf(ns(2), d)).collect();
    proof.verify_leaf_hashes(&root, ns(2), &hashed).unwrap();
}

#[test]
fn parity_leaves_stay_out_of_the_max_window() {
    let leaves = [
        Leaf::new(ns(7), b"a".as_ref()),
        Leaf::new(ns(8), b"b".as_ref()),
        Leaf::new(Namespace::PARITY_SHARE, b"p".as_ref()),
        Leaf::new(Namespace::PARITY_SHARE, b"q".as_ref()),
    ];
    let tree = Nmt::build(&leaves).unwrap();
    assert_eq!(tree.root().max, ns(8));
    // Namespaces between the data and parity are provably absent.
    assert!(tree.prove_namespace(ns(100)).is_empty_proof());
}
