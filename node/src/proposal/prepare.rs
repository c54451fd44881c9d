//! Proposer side: choose the block's transactions and commit to them.

use dasquare_native::square::BlobTx;
use dasquare_native::{build, extend, DataAvailabilityHeader, NativeError};
use tracing::{debug, error, info};

use super::types::{
    AnteHandler, BlobTxValidator, BlockData, ChainState, Header, PrepareError, PrepareRequest, TxDecoder,
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
    /// Build the data section of a new block.
    ///
    /// Input comes from the local mempool, so any failure here is a bug in
    /// this node; callers may halt on `Err`.
    pub fn prepare_proposal(&self, req: &PrepareRequest) -> Result<BlockData, PrepareError> {
        info!(height = req.height, num_txs = req.txs.len(), "start prepare proposal");

        // Nothing can have entered the mempool before the first block commits.
        let txs = if self.chain.last_block_height() == 0 {
            if !req.txs.is_empty() {
                info!(num_txs = req.txs.len(), "non-empty txs received from consensus for the first block");
            }
            Vec::new()
        } else {
            let header = Header { chain_id: req.chain_id.clone(), height: req.height, ..Header::default() };
            self.filter_txs(self.chain.proposal_state(&header), &req.txs)
        };

        let (square, used) = build(&txs, self.chain.app_version(), self.chain.gov_square_size_upper_bound())
            .inspect_err(|e| error!(error = %e, "failure to build the data square while creating a proposal block"))?;

        let eds = extend(&square)
            .map_err(NativeError::from)
            .inspect_err(|e| error!(error = %e, "failure to extend the data square while creating a proposal block"))?;

        let dah = DataAvailabilityHeader::compute(&eds)
            .map_err(NativeError::from)
            .inspect_err(|e| error!(error = %e, "failure to create the data availability header"))?;

        Ok(BlockData { txs: used, square_size: square.size() as u64, hash: dah.hash() })
    }

    /// Drop transactions that do not decode or fail stateful checks.
    /// Ordinary transactions come first, then blob transactions, each in
    /// input order.
    pub fn filter_txs(&self, mut state: C::AnteState, txs: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let (plain, blob): (Vec<_>, Vec<_>) = txs
            .iter()
            .map(|raw| (raw, BlobTx::decode(raw).ok()))
            .partition(|(_, btx)| btx.is_none());

        let mut kept = Vec::with_capacity(txs.len());
        for (raw, btx) in plain.into_iter().chain(blob) {
            let inner = btx.as_ref().map_or(raw.as_slice(), |b| b.tx.as_slice());
            let tx = match self.decoder.decode(inner) {
                Ok(tx) => tx,
                Err(e) => {
                    debug!(error = %e, "dropping undecodable tx");
                    continue;
                }
            };
            match self.ante.handle(state.clone(), &tx, false) {
                Ok(next) => {
                    state = next;
                    kept.push(raw.clone());
                }
                Err(e) => debug!(error = %e, blob = btx.is_some(), "dropping tx that failed stateful checks"),
            }
        }
        kept
    }
}
