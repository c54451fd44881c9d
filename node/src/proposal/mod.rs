//! Consensus-time block data validation.
//!
//! The proposer runs [`ProposalValidator::prepare_proposal`] to pick the
//! transactions of a block and commit to their square. Every validator runs
//! [`ProposalValidator::process_proposal`] on the result and votes to accept
//! it only if rebuilding the square from the block's transactions yields the
//! declared size and data root.
//!
//! Chain-specific pieces stay behind traits: [`TxDecoder`], [`AnteHandler`],
//! [`BlobTxValidator`] and [`ChainState`].

pub mod blob_validator;
pub mod prepare;
pub mod process;
pub mod types;

use serde::{Deserialize, Serialize};

pub use blob_validator::PfbBlobValidator;
pub use types::{
    AnteError, AnteHandler, BlobTxError, BlobTxValidator, BlockData, ChainState, DecodedTx, Header, Msg,
    MsgPayForBlobs, PrepareError, PrepareRequest, ProcessRequest, ProcessResult, RejectReason, TxDecodeError,
    TxDecoder,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Exclude the first transaction of a block from per-transaction checks.
    /// It still takes part in the square rebuild.
    pub skip_reserved_first_tx: bool,
}

/// Prepares and checks block data at each height.
pub struct ProposalValidator<D, A, B, C> {
    decoder: D,
    ante: A,
    blob_validator: B,
    chain: C,
    config: ValidatorConfig,
}

impl<D, A, B, C> ProposalValidator<D, A, B, C>
where
    D: TxDecoder,
    C: ChainState,
    C::AnteState: Clone,
    A: AnteHandler<D::Tx, C::AnteState>,
    B: BlobTxValidator<D::Tx>,
{
    pub fn new(decoder: D, ante: A, blob_validator: B, chain: C, config: ValidatorConfig) -> Self {
        Self { decoder, ante, blob_validator, chain, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }
}
