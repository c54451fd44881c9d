//! Default blob transaction validation.

use dasquare_native::square::{create_commitment, BlobTx};

use super::types::{BlobTxError, BlobTxValidator, DecodedTx};

/// Accepts a blob transaction when its single pay-for-blobs message
/// describes exactly the blobs it carries.
#[derive(Clone, Copy, Debug, Default)]
pub struct PfbBlobValidator;

impl<Tx: DecodedTx> BlobTxValidator<Tx> for PfbBlobValidator {
    fn validate(&self, tx: &Tx, blob_tx: &BlobTx) -> Result<(), BlobTxError> {
        let msgs = tx.msgs();
        if msgs.len() != 1 {
            return Err(BlobTxError::MessageCount(msgs.len()));
        }
        let pfb = msgs[0].as_pfb().ok_or(BlobTxError::NoPfb)?;

        let n = pfb.namespaces.len();
        if pfb.blob_sizes.len() != n || pfb.share_commitments.len() != n || pfb.share_versions.len() != n {
            return Err(BlobTxError::MalformedPfb);
        }
        if blob_tx.blobs.len() != n {
            return Err(BlobTxError::BlobCount { declared: n, actual: blob_tx.blobs.len() });
        }

        for (index, blob) in blob_tx.blobs.iter().enumerate() {
            blob.namespace
                .validate_for_data()
                .map_err(|source| BlobTxError::Namespace { index, source })?;
            if blob.namespace != pfb.namespaces[index] {
                return Err(BlobTxError::NamespaceMismatch { index });
            }
            if blob.data.len() != pfb.blob_sizes[index] as usize {
                return Err(BlobTxError::SizeMismatch { index, declared: pfb.blob_sizes[index], actual: blob.data.len() });
            }
            if blob.share_version != pfb.share_versions[index] {
                return Err(BlobTxError::ShareVersionMismatch { index });
            }
            let commitment = create_commitment(blob).map_err(|source| BlobTxError::Commitment { index, source })?;
            if commitment != pfb.share_commitments[index] {
                return Err(BlobTxError::CommitmentMismatch { index });
            }
        }
        Ok(())
    }
}

/* --------------------------------- Tests -------------------------------- */

#[cfg(test)]
mod tests {
    use dasquare_native::square::Blob;
    use dasquare_native::Namespace;

    use super::super::types::{Msg, MsgPayForBlobs};
    use super::*;

    struct Tx(Vec<Msg>);

    impl DecodedTx for Tx {
        fn msgs(&self) -> &[Msg] {
            &self.0
        }
    }

    fn blob() -> Blob {
        Blob::new(Namespace::from_u64(0x0100_0042), vec![5u8; 700])
    }

    fn pfb_for(blobs: &[Blob]) -> MsgPayForBlobs {
        MsgPayForBlobs {
            signer: "signer".into(),
            namespaces: blobs.iter().map(|b| b.namespace).collect(),
            blob_sizes: blobs.iter().map(|b| b.data.len() as u32).collect(),
            share_commitments: blobs.iter().map(|b| create_commitment(b).unwrap()).collect(),
            share_versions: blobs.iter().map(|b| b.share_version).collect(),
        }
    }

    #[test]
    fn matching_pfb_is_accepted() {
        let btx = BlobTx::new(vec![], vec![blob()]);
        let tx = Tx(vec![Msg::PayForBlobs(pfb_for(&btx.blobs))]);
        PfbBlobValidator.validate(&tx, &btx).unwrap();
    }

    #[test]
    fn extra_messages_are_rejected() {
        let btx = BlobTx::new(vec![], vec![blob()]);
        let tx = Tx(vec![Msg::PayForBlobs(pfb_for(&btx.blobs)), Msg::Other("/bank.MsgSend".into())]);
        assert_eq!(PfbBlobValidator.validate(&tx, &btx), Err(BlobTxError::MessageCount(2)));
        let tx = Tx(vec![Msg::Other("/bank.MsgSend".into())]);
        assert_eq!(PfbBlobValidator.validate(&tx, &btx), Err(BlobTxError::NoPfb));
    }

    #[test]
    fn tampered_blob_fails_its_commitment() {
        let btx = BlobTx::new(vec![], vec![blob()]);
        let pfb = pfb_for(&btx.blobs);
        let mut tampered = btx.clone();
        tampered.blobs[0].data[0] ^= 1;
        let tx = Tx(vec![Msg::PayForBlobs(pfb)]);
        assert_eq!(PfbBlobValidator.validate(&tx, &tampered), Err(BlobTxError::CommitmentMismatch { index: 0 }));
    }

    #[test]
    fn reserved_namespace_and_size_are_checked() {
        let mut btx = BlobTx::new(vec![], vec![blob()]);
        let mut pfb = pfb_for(&btx.blobs);
        pfb.blob_sizes[0] += 1;
        let tx = Tx(vec![Msg::PayForBlobs(pfb.clone())]);
        assert!(matches!(PfbBlobValidator.validate(&tx, &btx), Err(BlobTxError::SizeMismatch { index: 0, .. })));

        btx.blobs[0].namespace = Namespace::TRANSACTION;
        assert!(matches!(PfbBlobValidator.validate(&tx, &btx), Err(BlobTxError::Namespace { index: 0, .. })));
    }
}
