//! Block data, decisions and the collaborator seams of the proposal validator.

use std::fmt;

use dasquare_native::hash::Digest32;
use dasquare_native::square::BlobTx;
use dasquare_native::{Namespace, NativeError, SquareError};
use serde::{Deserialize, Serialize};

/// Data section of a proposed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockData {
    /// Transactions in square order.
    pub txs: Vec<Vec<u8>>,
    /// Side `k` of the original (unextended) square.
    pub square_size: u64,
    /// DA header hash of the block data.
    pub hash: Digest32,
}

/// The header fields the validator looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub chain_id: String,
    pub height: u64,
    pub proposer_address: Vec<u8>,
    pub data_hash: Digest32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareRequest {
    pub chain_id: String,
    pub height: u64,
    pub txs: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRequest {
    pub header: Header,
    pub block_data: BlockData,
    /// Set while the node is catching up.
    pub is_sync: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Accept,
    Reject,
}

/* -------------------------------- Messages ------------------------------- */

/// Pay-for-blobs message: one entry per blob, in blob order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPayForBlobs {
    pub signer: String,
    pub namespaces: Vec<Namespace>,
    pub blob_sizes: Vec<u32>,
    pub share_commitments: Vec<Digest32>,
    pub share_versions: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    PayForBlobs(MsgPayForBlobs),
    /// Any other message, identified by its type URL.
    Other(String),
}

impl Msg {
    pub fn as_pfb(&self) -> Option<&MsgPayForBlobs> {
        match self {
            Self::PayForBlobs(m) => Some(m),
            Self::Other(_) => None,
        }
    }
}

/* ------------------------------ Collaborators ---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tx decode: {0}")]
pub struct TxDecodeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ante: {0}")]
pub struct AnteError(pub String);

/// A decoded SDK transaction.
pub trait DecodedTx {
    fn msgs(&self) -> &[Msg];

    fn has_pfb(&self) -> bool {
        self.msgs().iter().any(|m| m.as_pfb().is_some())
    }
}

pub trait TxDecoder {
    type Tx: DecodedTx;

    fn decode(&self, raw: &[u8]) -> Result<Self::Tx, TxDecodeError>;
}

/// Stateful transaction checks (signatures, sequences, fees). Each call
/// consumes the state the previous call returned.
pub trait AnteHandler<Tx, S> {
    fn handle(&self, state: S, tx: &Tx, is_recheck: bool) -> Result<S, AnteError>;
}

/// Checks a blob transaction's pay-for-blobs message against its blobs.
pub trait BlobTxValidator<Tx> {
    fn validate(&self, tx: &Tx, blob_tx: &BlobTx) -> Result<(), BlobTxError>;
}

/// Read access to committed chain state.
pub trait ChainState {
    /// Branch of state handed to the ante handler for one proposal.
    type AnteState;

    fn last_block_height(&self) -> u64;
    fn app_version(&self) -> u64;
    /// Governance bound on the square side.
    fn gov_square_size_upper_bound(&self) -> usize;
    fn proposal_state(&self, header: &Header) -> Self::AnteState;
}

/* --------------------------------- Errors -------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobTxError {
    #[error("blob tx must carry exactly one message, got {0}")]
    MessageCount(usize),
    #[error("blob tx message is not a pay-for-blobs")]
    NoPfb,
    #[error("pfb lists {declared} blobs, tx carries {actual}")]
    BlobCount { declared: usize, actual: usize },
    #[error("pfb fields have inconsistent lengths")]
    MalformedPfb,
    #[error("blob {index}: {source}")]
    Namespace {
        index: usize,
        #[source]
        source: dasquare_native::namespace::NamespaceError,
    },
    #[error("blob {index}: namespace differs from pfb")]
    NamespaceMismatch { index: usize },
    #[error("blob {index}: size {actual} differs from pfb size {declared}")]
    SizeMismatch { index: usize, declared: u32, actual: usize },
    #[error("blob {index}: share version differs from pfb")]
    ShareVersionMismatch { index: usize },
    #[error("blob {index}: share commitment mismatch")]
    CommitmentMismatch { index: usize },
    #[error("blob {index}: {source}")]
    Commitment {
        index: usize,
        #[source]
        source: SquareError,
    },
}

/// Why a proposal was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("tx {index} has PFB but is not a blob tx")]
    PfbInNonBlobTx { index: usize },
    #[error("invalid blob tx {index}: {source}")]
    InvalidBlobTx {
        index: usize,
        #[source]
        source: BlobTxError,
    },
    #[error("tx {index} failed stateful checks: {source}")]
    Ante {
        index: usize,
        #[source]
        source: AnteError,
    },
    #[error("failure to compute data square from transactions: {0}")]
    Square(#[source] SquareError),
    #[error("proposed square size {declared} differs from calculated square size {computed}")]
    SquareSizeMismatch { declared: u64, computed: u64 },
    #[error("failure to extend or commit to the data square: {0}")]
    Encoding(#[source] NativeError),
    #[error("proposed data root {} differs from calculated data root {}", HexHash(.declared), HexHash(.computed))]
    DataRootMismatch { declared: Digest32, computed: Digest32 },
}

/// Fault while preparing a block from locally trusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrepareError {
    #[error("failure to build the data square: {0}")]
    Square(#[from] SquareError),
    #[error("failure to extend or commit to the data square: {0}")]
    Encoding(#[from] NativeError),
}

/// Upper-case hex rendering of a digest.
pub struct HexHash<'a>(pub &'a Digest32);

impl fmt::Display for HexHash<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/* --------------------------------- Tests -------------------------------- */
