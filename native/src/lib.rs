//! dasquare_native: the encode/commit/prove engine of the DA layer.
//!
//! Pipeline for one block:
//!
//! ```text
//! txs ──square::build──▶ Square ──erasure::extend──▶ ExtendedDataSquare
//!                                                        │
//!                           DataAvailabilityHeader ◀─────┘ (one NMT per row/column)
//!                                   │
//!                                   └─ hash() = block data commitment
//! ```
//!
//! Modules:
//! - [`namespace`]: 8-byte namespaces and the reserved ranges
//! - [`square`]: shares, blob transactions, square layout
//! - [`erasure`]: 2D Reed–Solomon extension and repair
//! - [`nmt`]: namespaced Merkle trees and range proofs
//! - [`dah`]: data availability header
//! - [`hash`]: domain-separated BLAKE3
//!
//! Features:
//! - `rayon` (default): rows, columns and leaf hashing run in parallel
//! - `serde`: `Serialize`/`Deserialize` on namespaces, nodes, proofs, headers

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod dah;
pub mod erasure;
pub mod error;
pub mod hash;
pub mod namespace;
pub mod nmt;
pub mod square;
pub mod utils;

pub use dah::{DahError, DataAvailabilityHeader};
pub use erasure::{extend, ErasureError, ExtendedDataSquare};
pub use error::{NativeError, NativeResult};
pub use namespace::{Namespace, NAMESPACE_SIZE};
pub use nmt::{NamespaceRangeProof, Nmt, ProofError, Root};
pub use square::{build, construct, Share, Square, SquareError, SHARE_SIZE};

/// Lay out, extend and commit to `txs` in one call.
///
/// Returns the square, its extension, the header and the transactions that
/// made it into the square.
pub fn encode_block<T: AsRef<[u8]>>(
    txs: &[T],
    app_version: u64,
    max_square_size: usize,
) -> NativeResult<(Square, ExtendedDataSquare, DataAvailabilityHeader, Vec<Vec<u8>>)> {
    let (square, used) = build(txs, app_version, max_square_size)?;
    let eds = extend(&square)?;
    let dah = DataAvailabilityHeader::compute(&eds)?;
    Ok((square, eds, dah, used))
}
