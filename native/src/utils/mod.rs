//! Misc low-level helpers used across `dasquare_native`.
//!
//! - power-of-two arithmetic for square sides and tree shapes
//! - a parallel indexed map that falls back to sequential execution when the
//!   `rayon` feature is disabled

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Return `true` iff `v` is a power-of-two.
#[inline]
pub const fn is_pow2(v: usize) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// Smallest power of two `>= v` (returns 1 for 0).
#[inline]
pub fn next_pow2(v: usize) -> usize {
    v.max(1).next_power_of_two()
}

/// `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
pub const fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    (usize::BITS - (n - 1).leading_zeros()) as usize
}

/// Largest power of two strictly less than `n` (`n >= 2`).
///
/// This is the split point of a left-balanced binary tree over `n` leaves.
#[inline]
pub const fn split_point(n: usize) -> usize {
    debug_assert!(n >= 2);
    1usize << (usize::BITS - 1 - (n - 1).leading_zeros())
}

/// Integer ceil-div (`b` > 0).
#[inline]
pub const fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Integer square root for exact squares; `None` when `n` is not a square.
#[inline]
pub fn exact_sqrt(n: usize) -> Option<usize> {
    let r = (n as f64).sqrt() as usize;
    // Guard against float rounding on either side.
    (r.saturating_sub(1)..=r + 1).find(|c| c * c == n)
}

/// Map `f` over `0..n`, in parallel when `rayon` is enabled, stopping at the
/// first error.
pub(crate) fn par_map_indexed<T, E, F>(n: usize, f: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(usize) -> Result<T, E> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).map(f).collect()
    }
}

/* --------------------------------- Tests ----------------------------------- */
