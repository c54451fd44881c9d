#![allow(dead_code)]

use std::collections::BTreeMap;

use dasquare_native::square::{create_commitment, Blob, BlobTx};
use dasquare_native::Namespace;
use dasquare_node::proposal::{
    AnteError, AnteHandler, ChainState, DecodedTx, Header, Msg, MsgPayForBlobs, PfbBlobValidator, ProposalValidator,
    TxDecodeError, TxDecoder, ValidatorConfig,
};
use serde::{Deserialize, Serialize};

/// Test SDK transaction: CBOR with a sender, its sequence number and messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTx {
    pub sender: String,
    pub sequence: u64,
    pub msgs: Vec<Msg>,
}

impl TestTx {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::into_writer(self, &mut out).unwrap();
        out
    }
}

impl DecodedTx for TestTx {
    fn msgs(&self) -> &[Msg] {
        &self.msgs
    }
}

pub struct CborDecoder;

impl TxDecoder for CborDecoder {
    type Tx = TestTx;

    fn decode(&self, raw: &[u8]) -> Result<TestTx, TxDecodeError> {
        ciborium::from_reader(raw).map_err(|e| TxDecodeError(e.to_string()))
    }
}

/// Next expected sequence per sender.
pub type Sequences = BTreeMap<String, u64>;

/// Accepts a transaction when its sequence is the sender's next one.
pub struct SequenceAnte;

impl AnteHandler<TestTx, Sequences> for SequenceAnte {
    fn handle(&self, mut state: Sequences, tx: &TestTx, _is_recheck: bool) -> Result<Sequences, AnteError> {
        let next = state.entry(tx.sender.clone()).or_default();
        if tx.sequence != *next {
            return Err(AnteError(format!("{}: expected sequence {}, got {}", tx.sender, next, tx.sequence)));
        }
        *next += 1;
        Ok(state)
    }
}

pub struct TestChain {
    pub last_height: u64,
    pub app_version: u64,
    pub max_square_size: usize,
}

impl ChainState for TestChain {
    type AnteState = Sequences;

    fn last_block_height(&self) -> u64 {
        self.last_height
    }

    fn app_version(&self) -> u64 {
        self.app_version
    }

    fn gov_square_size_upper_bound(&self) -> usize {
        self.max_square_size
    }

    fn proposal_state(&self, _header: &Header) -> Sequences {
        Sequences::new()
    }
}

pub type TestValidator = ProposalValidator<CborDecoder, SequenceAnte, PfbBlobValidator, TestChain>;

pub fn validator(last_height: u64, config: ValidatorConfig) -> TestValidator {
    let chain = TestChain { last_height, app_version: 2, max_square_size: 64 };
    ProposalValidator::new(CborDecoder, SequenceAnte, PfbBlobValidator, chain, config)
}

pub fn user_ns(n: u64) -> Namespace {
    Namespace::from_u64(0x0100_0000 + n)
}

pub fn send_tx(sender: &str, sequence: u64) -> Vec<u8> {
    TestTx { sender: sender.into(), sequence, msgs: vec![Msg::Other("/bank.MsgSend".into())] }.encode()
}

pub fn pfb(sender: &str, blobs: &[Blob]) -> MsgPayForBlobs {
    MsgPayForBlobs {
        signer: sender.into(),
        namespaces: blobs.iter().map(|b| b.namespace).collect(),
        blob_sizes: blobs.iter().map(|b| b.data.len() as u32).collect(),
        share_commitments: blobs.iter().map(|b| create_commitment(b).unwrap()).collect(),
        share_versions: blobs.iter().map(|b| b.share_version).collect(),
    }
}

/// Blob transaction whose PFB matches its blobs.
pub fn blob_tx(sender: &str, sequence: u64, blobs: Vec<Blob>) -> Vec<u8> {
    let inner = TestTx { sender: sender.into(), sequence, msgs: vec![Msg::PayForBlobs(pfb(sender, &blobs))] };
    BlobTx::new(inner.encode(), blobs).encode()
}

pub fn blob(ns: u64, len: usize, fill: u8) -> Blob {
    Blob::new(user_ns(ns), vec![fill; len])
}
