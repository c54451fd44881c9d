//! Two-dimensional Reed–Solomon extension of data squares.
//!
//! ```text
//!        k      k
//!    +------+------+
//!  k |  Q0  |  Q1  |   Q1 = RS(rows of Q0)
//!    +------+------+   Q2 = RS(columns of Q0)
//!  k |  Q2  |  Q3  |   Q3 = RS(rows of Q2)
//!    +------+------+
//! ```
//!
//! Every row and column of the extended square is an RS(2k, k) codeword, so
//! any `k` of its `2k` shares recover the rest ([`decode_axis`]), and a
//! partially withheld square can be repaired axis by axis
//! ([`ExtendedDataSquare::repair`]).

pub mod codec;
pub mod eds;

pub use codec::Codec;
pub use eds::{extend, extend_shares, Axis, ExtendedDataSquare};

use crate::utils::is_pow2;

/// Errors raised by the erasure engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErasureError {
    #[error("invalid dimension: {0}")]
    InvalidDimension(&'static str),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("not enough shards: {present} present, {needed} needed")]
    NotEnoughShards { present: usize, needed: usize },
    #[error("square is unrepairable: {missing} shares still missing")]
    Unrepairable { missing: usize },
    #[error("byzantine {axis:?} {index}: recomputed root does not match header")]
    ByzantineAxis { axis: Axis, index: usize },
}

/// Reconstruct a full `2k` axis from any `k` present shares.
pub fn decode_axis(shards: &[Option<Vec<u8>>]) -> Result<Vec<Vec<u8>>, ErasureError> {
    let width = shards.len();
    if width < 2 || width % 2 != 0 || !is_pow2(width / 2) {
        return Err(ErasureError::InvalidDimension("axis width must be 2k with k a power of two"));
    }
    let mut axis = shards.to_vec();
    if axis.iter().all(Option::is_some) {
        return Ok(axis.into_iter().flatten().collect());
    }
    Codec::cached(width / 2)?.reconstruct(&mut axis)?;
    let out: Vec<Vec<u8>> = axis.into_iter().flatten().collect();
    if out.len() != width {
        return Err(ErasureError::Codec("codec left shards missing".into()));
    }
    Ok(out)
}

/* --------------------------------- Tests -------------------------------- */
