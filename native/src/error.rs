//! Crate-wide error type for `dasquare_native`.
//!
//! Every module keeps its own precise error enum; [`NativeError`] folds them
//! together for callers that drive the whole encode/commit pipeline and only
//! need to know which stage failed.

use crate::dah::DahError;
use crate::erasure::ErasureError;
use crate::namespace::NamespaceError;
use crate::nmt::{NmtError, ProofError};
use crate::square::{BlobTxDecodeError, SquareError};

/// Canonical error for the native crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum NativeError {
    #[error("namespace: {0}")]
    Namespace(#[from] NamespaceError),
    #[error("square: {0}")]
    Square(#[from] SquareError),
    #[error("blob tx: {0}")]
    BlobTx(#[from] BlobTxDecodeError),
    #[error("erasure: {0}")]
    Erasure(#[from] ErasureError),
    #[error("nmt: {0}")]
    Nmt(#[from] NmtError),
    #[error("proof: {0}")]
    Proof(#[from] ProofError),
    #[error("header: {0}")]
    Dah(#[from] DahError),
}

/// Convenient result alias.
pub type NativeResult<T> = Result<T, NativeError>;

/* --------------------------------- Tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> NativeResult<()> {
        Err(SquareError::UnsupportedAppVersion(7))?;
        Ok(())
    }

    #[test]
    fn stage_is_kept_in_message() {
        let e = fails().unwrap_err();
        assert_eq!(e, NativeError::Square(SquareError::UnsupportedAppVersion(7)));
        assert_eq!(e.to_string(), "square: unsupported app version 7");
    }
}
