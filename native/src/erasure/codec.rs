//! Reed–Solomon codec wrapper (GF(2^8)).
//!
//! Every axis of an extended square is an RS(2k, k) codeword, so a single
//! parameter `k` identifies a codec. Codecs are built once per `k` and shared
//! through a process-wide cache; building the encoding matrix dominates the
//! cost of encoding a single small axis.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use reed_solomon_erasure::galois_8::ReedSolomon;

use super::ErasureError;

/// RS(2k, k) codec for one square side `k`.
#[derive(Debug)]
pub struct Codec {
    k: usize,
    inner: ReedSolomon,
}

static CODECS: Lazy<Mutex<HashMap<usize, Arc<Codec>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

impl Codec {
    /// Build an uncached codec with `k` data and `k` parity shards.
    pub fn new(k: usize) -> Result<Self, ErasureError> {
        if k == 0 {
            return Err(ErasureError::InvalidDimension("axis must hold at least one data shard"));
        }
        let inner = ReedSolomon::new(k, k).map_err(|e| ErasureError::Codec(e.to_string()))?;
        Ok(Self { k, inner })
    }

    /// Shared codec for side `k`.
    pub fn cached(k: usize) -> Result<Arc<Self>, ErasureError> {
        // A poisoned lock only means another thread panicked mid-insert; the
        // map itself is still consistent.
        let mut map = CODECS.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(c) = map.get(&k) {
            return Ok(Arc::clone(c));
        }
        let codec = Arc::new(Self::new(k)?);
        map.insert(k, Arc::clone(&codec));
        Ok(codec)
    }

    #[inline]
    pub fn data_shards(&self) -> usize {
        self.k
    }

    /// Compute the `k` parity shards of `data` (`k` equal-length shards).
    pub fn encode<T: AsRef<[u8]>>(&self, data: &[T]) -> Result<Vec<Vec<u8>>, ErasureError> {
        if data.len() != self.k {
            return Err(ErasureError::InvalidDimension("encode needs exactly k data shards"));
        }
        let len = ensure_equal_len(data)?;
        let mut parity = vec![vec![0u8; len]; self.k];
        self.inner
            .encode_sep(data, &mut parity)
            .map_err(|e| ErasureError::Codec(e.to_string()))?;
        Ok(parity)
    }

    /// Fill every `None` in a `2k` axis from any `k` present shards.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<(), ErasureError> {
        if shards.len() != 2 * self.k {
            return Err(ErasureError::InvalidDimension("axis must hold 2k shards"));
        }
        let present = shards.iter().flatten().count();
        if present < self.k {
            return Err(ErasureError::NotEnoughShards { present, needed: self.k });
        }
        ensure_equal_len(shards.iter().flatten())?;
        self.inner.reconstruct(shards).map_err(|e| ErasureError::Codec(e.to_string()))
    }

    /// Whether a complete `2k` axis is a valid codeword.
    pub fn verify<T: AsRef<[u8]>>(&self, shards: &[T]) -> Result<bool, ErasureError> {
        if shards.len() != 2 * self.k {
            return Err(ErasureError::InvalidDimension("axis must hold 2k shards"));
        }
        ensure_equal_len(shards)?;
        self.inner.verify(shards).map_err(|e| ErasureError::Codec(e.to_string()))
    }
}

/* ------------------------------- Utilities ------------------------------ */

#[inline]
pub(crate) fn ensure_equal_len<I>(shards: I) -> Result<usize, ErasureError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut it = shards.into_iter();
    let Some(first) = it.next() else { return Ok(0) };
    let len0 = first.as_ref().len();
    if it.any(|s| s.as_ref().len() != len0) {
        return Err(ErasureError::InvalidDimension("shares must have identical length"));
    }
    Ok(len0)
}

/* --------------------------------- Tests -------------------------------- */
