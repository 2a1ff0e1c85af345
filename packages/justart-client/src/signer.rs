//! Signer collaborator.
//!
//! Key custody lives outside this crate (a wallet, an HSM, a browser
//! extension). The client only hands over canonical unsigned encodings and
//! expects signed blobs back in the same order.

use async_trait::async_trait;

use crate::Error;

#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign an ordered batch. Must return one blob per input, same order.
    /// A declined request is `Error::Signing`.
    async fn sign(&self, unsigned: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, Error>;
}

/// Sign a batch and enforce the one-blob-per-transaction contract.
pub(crate) async fn sign_batch(
    signer: &dyn Signer,
    unsigned: Vec<Vec<u8>>,
) -> Result<Vec<Vec<u8>>, Error> {
    let expected = unsigned.len();
    let signed = signer.sign(&unsigned).await?;
    if signed.len() != expected {
        return Err(Error::Signing(format!(
            "signer returned {} blobs for {expected} transactions",
            signed.len()
        )));
    }
    Ok(signed)
}
