//! Namespaces: fixed-width, lexicographically ordered identifiers that
//! partition the data of a block.
//!
//! ### Layout
//! A namespace is 8 bytes, compared big-endian. Two ranges at the ends of the
//! space are reserved for protocol use:
//!
//! ```text
//! 0x0000000000000000 ..= 0x00000000000000FF   primary reserved (txs, PFBs, padding)
//! 0xFFFFFFFFFFFFFFFE ..= 0xFFFFFFFFFFFFFFFF   tail padding, parity shares
//! ```
//!
//! Everything strictly between the two ranges is available for blobs.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width (in bytes) of a namespace identifier.
pub const NAMESPACE_SIZE: usize = 8;

/// 8-byte namespace identifier (lexicographic order; big-endian).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace([u8; NAMESPACE_SIZE]);

/// Errors raised when parsing or validating a namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("namespace must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("namespace {0} is reserved and cannot carry user data")]
    Reserved(Namespace),
}

impl Namespace {
    /// Ordinary (non blob-paying) transactions.
    pub const TRANSACTION: Self = Self::from_u64(1);
    /// Transactions that pay for blobs.
    pub const PAY_FOR_BLOB: Self = Self::from_u64(4);
    /// Upper bound of the primary reserved range.
    pub const PRIMARY_RESERVED_PADDING: Self = Self::from_u64(0xFF);
    /// Pads the original square up to its full size.
    pub const TAIL_PADDING: Self = Self::from_u64(u64::MAX - 1);
    /// Assigned to every erasure-coded parity share.
    pub const PARITY_SHARE: Self = Self::from_u64(u64::MAX);

    /// Construct from a `u64` (big-endian).
    #[inline]
    pub const fn from_u64(x: u64) -> Self {
        Self(x.to_be_bytes())
    }

    #[inline]
    pub const fn from_bytes(bytes: [u8; NAMESPACE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice of exactly [`NAMESPACE_SIZE`] bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, NamespaceError> {
        let arr: [u8; NAMESPACE_SIZE] = bytes.try_into().map_err(|_| NamespaceError::InvalidLength {
            expected: NAMESPACE_SIZE,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; NAMESPACE_SIZE] {
        &self.0
    }

    #[inline]
    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// True for every namespace in either reserved range.
    #[inline]
    pub fn is_reserved(&self) -> bool {
        *self <= Self::PRIMARY_RESERVED_PADDING || *self >= Self::TAIL_PADDING
    }

    #[inline]
    pub fn is_parity(&self) -> bool {
        *self == Self::PARITY_SHARE
    }

    /// Reject namespaces that user data (blobs, ND queries) may not use.
    pub fn validate_for_data(&self) -> Result<(), NamespaceError> {
        if self.is_reserved() {
            return Err(NamespaceError::Reserved(*self));
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Namespace {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({self})")
    }
}

/* --------------------------------- Tests ----------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_big_endian() {
        assert!(Namespace::from_u64(1) < Namespace::from_u64(256));
        assert!(Namespace::TRANSACTION < Namespace::PAY_FOR_BLOB);
        assert!(Namespace::TAIL_PADDING < Namespace::PARITY_SHARE);
    }

    #[test]
    fn reserved_ranges() {
        for ns in [
            Namespace::default(),
            Namespace::TRANSACTION,
            Namespace::PAY_FOR_BLOB,
            Namespace::PRIMARY_RESERVED_PADDING,
            Namespace::TAIL_PADDING,
            Namespace::PARITY_SHARE,
        ] {
            assert_eq!(ns.validate_for_data(), Err(NamespaceError::Reserved(ns)));
        }
        assert!(Namespace::from_u64(0x100).validate_for_data().is_ok());
        assert!(Namespace::from_u64(u64::MAX - 2).validate_for_data().is_ok());
    }

    #[test]
    fn slice_parsing() {
        let ns = Namespace::try_from_slice(&[0, 0, 0, 0, 0, 0, 1, 0]).unwrap();
        assert_eq!(ns.to_u64(), 0x100);
        assert_eq!(
            Namespace::try_from_slice(&[1, 2, 3]),
            Err(NamespaceError::InvalidLength { expected: 8, got: 3 })
        );
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Namespace::from_u64(0xabcd).to_string(), "000000000000abcd");
    }
}
