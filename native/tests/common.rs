//! Test helpers and deterministic random data for `dasquare_native`.
//!
//! Shared by the `native/tests/*` suites:
//! - a tiny, dependency-free PRNG (XorShift64) seeded from `TEST_SEED`
//! - fixture builders for blob transactions, blocks and erasure patterns
//!
//! ```ignore
//! mod common;
//! use common::*;
//!
//! let mut rng = rng_from_env(); // honors TEST_SEED if set
//! let txs = random_block(&mut rng, 3, 5);
//! ```

use std::env;

use dasquare_native::square::{Blob, BlobTx};
use dasquare_native::Namespace;

#[allow(dead_code)]
pub const DEFAULT_TEST_SEED: u64 = 0xDA5A_17E0_C0FF_EE42;

/// Minimal, fast, deterministic PRNG (XorShift64).
/// Not cryptographically secure, only for tests.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    #[inline]
    pub fn new(seed: u64) -> Self {
        // Avoid the all-zero lockup state.
        let s = if seed == 0 { DEFAULT_TEST_SEED } else { seed };
        Self { state: s }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish value in `lo..hi`.
    #[inline]
    pub fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next_u64() as usize) % (hi - lo)
    }

    #[inline]
    pub fn fill_bytes(&mut self, buf: &mut [u8]) {
        let mut i = 0;
        while i + 8 <= buf.len() {
            buf[i..i + 8].copy_from_slice(&self.next_u64().to_le_bytes());
            i += 8;
        }
        if i < buf.len() {
            let tail = self.next_u64().to_le_bytes();
            let n = buf.len() - i;
            buf[i..].copy_from_slice(&tail[..n]);
        }
    }
}

/// Seed from env (`TEST_SEED`, decimal or `0x` hex), or the default.
#[allow(dead_code)]
pub fn seed_from_env() -> u64 {
    match env::var("TEST_SEED") {
        Ok(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).unwrap_or(DEFAULT_TEST_SEED),
                None => s.parse::<u64>().unwrap_or(DEFAULT_TEST_SEED),
            }
        }
        Err(_) => DEFAULT_TEST_SEED,
    }
}

#[allow(dead_code)]
pub fn rng_from_env() -> XorShift64 {
    XorShift64::new(seed_from_env())
}

#[allow(dead_code)]
pub fn random_bytes(len: usize, rng: &mut XorShift64) -> Vec<u8> {
    let mut v = vec![0u8; len];
    rng.fill_bytes(&mut v);
    v
}

/// Namespace in the user range.
#[allow(dead_code)]
pub fn user_ns(n: u64) -> Namespace {
    Namespace::from_u64(0x0100_0000 + n)
}

/// A blob transaction paying for one blob of `len` bytes.
#[allow(dead_code)]
pub fn blob_tx(ns: Namespace, len: usize, rng: &mut XorShift64) -> Vec<u8> {
    let inner = random_bytes(rng.range(40, 120), rng);
    BlobTx::new(inner, vec![Blob::new(ns, random_bytes(len, rng))]).encode()
}

/// `plain` ordinary txs followed by `blobs` blob txs with distinct namespaces.
#[allow(dead_code)]
pub fn random_block(rng: &mut XorShift64, plain: usize, blobs: usize) -> Vec<Vec<u8>> {
    let mut txs: Vec<Vec<u8>> = (0..plain)
        .map(|_| {
            let len = rng.range(60, 300);
            random_bytes(len, rng)
        })
        .collect();
    for i in 0..blobs {
        let len = rng.range(1, 3000);
        txs.push(blob_tx(user_ns(i as u64 * 3 + 1), len, rng));
    }
    txs
}

/// Choose `k` unique sorted indices in `[0, n)` (Floyd's algorithm).
#[allow(dead_code)]
pub fn choose_k_of_n(n: usize, k: usize, rng: &mut XorShift64) -> Vec<usize> {
    assert!(k <= n, "k must be <= n");
    use std::collections::HashSet;
    let mut chosen = HashSet::with_capacity(k);
    for i in (n - k)..n {
        let t = (rng.next_u64() as usize) % (i + 1);
        if !chosen.insert(t) {
            chosen.insert(i);
        }
    }
    let mut v: Vec<_> = chosen.into_iter().collect();
    v.sort_unstable();
    v
}
