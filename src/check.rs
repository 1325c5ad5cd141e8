//! # Signature Validator
//!
//! Confirms that a signed file's bytes are unchanged since signing.
//!
//! This is an integrity check only: it recomputes the content hash and
//! compares it with the hash bound into the signature record and its proof.
//! It does not re-verify the holder's credential, which may since have been
//! revoked or expired.

use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::jose::{self, Jwt};
use crate::model::FileStatus;
use crate::provider::{BlobStore, Provider};
use crate::sign::ProofClaims;
use crate::types::CheckResponse;
use crate::{hash, registry, Error, Result};

impl<P: Provider> Endpoint<P> {
    /// Check a signed file against its signature.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` for an unknown file, `RetentionExpired` for an
    /// expired file, `NotSigned` if the file has no signature, and
    /// `HashMismatch` if the stored bytes, or the hash claimed by the proof,
    /// differ from the recorded hash.
    #[instrument(level = "debug", skip(self))]
    pub async fn check(&self, file_id: &str) -> Result<CheckResponse> {
        tracing::debug!("check::verify");

        let record = registry::require(&self.provider, file_id).await?;
        if record.status == FileStatus::Expired {
            return Err(Error::RetentionExpired(format!("file {file_id} has expired")));
        }
        let Some(signature) = record.signature() else {
            return Err(Error::NotSigned(format!("file {file_id} is not signed")));
        };

        tracing::debug!("check::process");

        let reader = BlobStore::read(&self.provider, &record.stored_path)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue reading file: {e}")))?;
        let current = hash::digest(reader)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue hashing file: {e}")))?;
        if current != signature.content_hash {
            return Err(Error::HashMismatch("file has changed since signing".into()));
        }

        let proof: Jwt<ProofClaims> = jose::decode(&signature.proof)
            .map_err(|e| Error::HashMismatch(format!("issue decoding proof: {e}")))?;
        if proof.claims.file_hash != signature.content_hash.to_base64()
            || proof.claims.file_id != record.id
        {
            return Err(Error::HashMismatch("proof does not match the signed file".into()));
        }

        Ok(CheckResponse {
            holder: signature.holder.clone(),
            issued_at: signature.issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_let_bind::assert_let;

    use super::*;
    use crate::config::Config;
    use crate::test_utils::{sample, Provider as TestProvider};

    async fn signed() -> (Endpoint<TestProvider>, String) {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let file_id =
            endpoint.upload("contract.pdf", vec![9; 4096]).await.expect("should upload").file_id;
        let issued = endpoint.issue_request(&file_id).await.expect("should issue");
        let vp = sample::json_vp("did:example:alice", &issued.request_object.nonce);
        endpoint.callback(&sample::response(&issued.state, vp)).await.expect("should sign");
        (endpoint, file_id)
    }

    #[tokio::test]
    async fn unchanged() {
        let (endpoint, file_id) = signed().await;
        let response = endpoint.check(&file_id).await.expect("should check");
        assert_eq!(response.holder, "did:example:alice");
    }

    #[tokio::test]
    async fn changed() {
        let (endpoint, file_id) = signed().await;
        endpoint.provider().blobs.tamper(&format!("blobs/{file_id}"), vec![9; 4097]);
        assert_let!(Err(Error::HashMismatch(_)), endpoint.check(&file_id).await);
    }

    #[tokio::test]
    async fn not_signed() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let file_id = endpoint.upload("a.txt", vec![1]).await.expect("should upload").file_id;
        assert_let!(Err(Error::NotSigned(_)), endpoint.check(&file_id).await);
        assert_let!(Err(Error::FileNotFound(_)), endpoint.check("missing").await);
    }
}
