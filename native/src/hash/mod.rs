//! Hash abstraction and domain-separated helpers.
//!
//! This module provides:
//! - `HashFn`: a simple trait for 256-bit hash functions with streaming update.
//! - A default `Blake3Hash` implementation.
//! - Domain-separation tags (`DsTag`) for the commitments this crate produces.
//!
//! ### Domain separation
//! Each commitment family (data roots, share commitments, the empty NMT root)
//! gets its own BLAKE3 derive-key context so that no two families share a
//! preimage space. NMT node hashing uses its own one-byte prefixes instead
//! (see `nmt::hashers`), because those digests are consensus-critical and
//! must stay cheap to recompute inside proof verification.

use core::fmt;

/// A 256-bit digest used across the codebase.
pub type Digest32 = [u8; 32];

/// Domain separation tags.
///
/// The BLAKE3 context carries a versioned prefix (`"dasquare:v1:"`). Never
/// change the string of a tag that already commits to on-chain data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DsTag {
    /// Generic, internal usage (tests, fixtures).
    Generic,
    /// Data availability header commitment (the block data hash).
    DataRoot,
    /// Blob share commitment carried by pay-for-blob messages.
    ShareCommitment,
    /// Sentinel root of an NMT with no leaves.
    EmptyRoot,
}

impl DsTag {
    /// Return the canonical BLAKE3 context string for this tag.
    #[inline]
    pub fn context(self) -> &'static str {
        match self {
            DsTag::Generic         => "dasquare:v1:generic",
            DsTag::DataRoot        => "dasquare:v1:data_root",
            DsTag::ShareCommitment => "dasquare:v1:share_commitment",
            DsTag::EmptyRoot       => "dasquare:v1:empty_root",
        }
    }
}

/// Minimal interface for a streaming 256-bit hash.
pub trait HashFn: Sized + fmt::Debug {
    /// Create a new hasher prepped for a given domain.
    fn new_ds(tag: DsTag) -> Self;

    /// Feed additional bytes.
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the 32-byte digest. Consumes `self`.
    fn finalize(self) -> Digest32;

    /// One-shot convenience over `new_ds` + `update` + `finalize`.
    #[inline]
    fn hash_ds(tag: DsTag, data: &[u8]) -> Digest32 {
        let mut h = Self::new_ds(tag);
        h.update(data);
        h.finalize()
    }

    /// Hash several chunks as if concatenated, under `tag`.
    #[inline]
    fn hash_many<'a, I>(tag: DsTag, parts: I) -> Digest32
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut h = Self::new_ds(tag);
        for p in parts {
            h.update(p);
        }
        h.finalize()
    }
}

/* ---------------------------- Blake3 (default) ---------------------------- */

#[derive(Debug)]
pub struct Blake3Hash(::blake3::Hasher);

impl HashFn for Blake3Hash {
    #[inline]
    fn new_ds(tag: DsTag) -> Self {
        Self(::blake3::Hasher::new_derive_key(tag.context()))
    }

    #[inline]
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    #[inline]
    fn finalize(self) -> Digest32 {
        *self.0.finalize().as_bytes()
    }
}

/// Hash bytes in a given domain, using the default hash implementation.
#[inline]
pub fn hash_ds(tag: DsTag, data: &[u8]) -> Digest32 {
    Blake3Hash::hash_ds(tag, data)
}

/// Hash concatenated chunks in a given domain, using the default hash impl.
#[inline]
pub fn hash_many<'a, I>(tag: DsTag, parts: I) -> Digest32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    Blake3Hash::hash_many(tag, parts)
}

/* ----------------------------------- Tests ----------------------------------- */
