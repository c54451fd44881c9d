//! Validator side: accept or reject a proposed block.

use dasquare_native::square::{construct, BlobTx};
use dasquare_native::{extend, DataAvailabilityHeader, NativeError};
use tracing::{debug, error, info};

use super::types::{
    AnteHandler, BlobTxValidator, ChainState, DecodedTx, HexHash, ProcessRequest, ProcessResult, RejectReason,
    TxDecoder,
};
use super::ProposalValidator;

impl<D, A, B, C> ProposalValidator<D, A, B, C>
where
    D: TxDecoder,
    C: ChainState,
    C::AnteState: Clone,
    A: AnteHandler<D::Tx, C::AnteState>,
    B: BlobTxValidator<D::Tx>,
{
    /// Vote on a proposal. Every failure, including encoding faults caused by
    /// adversarial input, ends in `Reject`.
    pub fn process_proposal(&self, req: &ProcessRequest) -> ProcessResult {
        let proposer = hex::encode_upper(&req.header.proposer_address);
        info!(height = req.header.height, %proposer, "start process proposal");

        match self.check_proposal(req) {
            Ok(()) => ProcessResult::Accept,
            Err(reason) => {
                error!(%reason, %proposer, "rejected proposal block");
                ProcessResult::Reject
            }
        }
    }

    /// The checks behind [`Self::process_proposal`], returning why a block
    /// is rejected.
    pub fn check_proposal(&self, req: &ProcessRequest) -> Result<(), RejectReason> {
        let txs = &req.block_data.txs;
        let mut state = self.chain.proposal_state(&req.header);

        let skip = usize::from(self.config.skip_reserved_first_tx && !txs.is_empty());
        for (index, raw) in txs.iter().enumerate().skip(skip) {
            let blob_tx = BlobTx::decode(raw).ok();
            let inner = blob_tx.as_ref().map_or(raw.as_slice(), |b| b.tx.as_slice());

            // Undecodable transactions are not a block validity rule.
            let Ok(tx) = self.decoder.decode(inner) else {
                continue;
            };

            match &blob_tx {
                None if tx.has_pfb() => return Err(RejectReason::PfbInNonBlobTx { index }),
                None => {}
                Some(btx) => self
                    .blob_validator
                    .validate(&tx, btx)
                    .map_err(|source| RejectReason::InvalidBlobTx { index, source })?,
            }

            // Runs for every transaction so sequence numbers advance.
            state = self
                .ante
                .handle(state, &tx, false)
                .map_err(|source| RejectReason::Ante { index, source })?;
        }

        let square = construct(txs, self.chain.app_version(), self.chain.gov_square_size_upper_bound())
            .map_err(RejectReason::Square)?;

        let computed = square.size() as u64;
        if computed != req.block_data.square_size {
            return Err(RejectReason::SquareSizeMismatch { declared: req.block_data.square_size, computed });
        }

        let eds = extend(&square).map_err(|e| RejectReason::Encoding(NativeError::from(e)))?;
        let dah = DataAvailabilityHeader::compute(&eds).map_err(|e| RejectReason::Encoding(NativeError::from(e)))?;
        let computed = dah.hash();
        if computed != req.header.data_hash {
            return Err(RejectReason::DataRootMismatch { declared: req.header.data_hash, computed });
        }

        debug!(
            height = req.header.height,
            data_root = %HexHash(&computed),
            num_txs = txs.len(),
            "process proposal"
        );
        if req.is_sync {
            debug!(height = req.header.height, "accepting proposal while syncing");
        }
        Ok(())
    }
}
