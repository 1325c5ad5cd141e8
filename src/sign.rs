//! # Signature Producer
//!
//! Binds a verified holder to a file's content hash. The proof is a compact
//! JWS (`typ: sign-proof+jwt`) over [`ProofClaims`], signed by the host's
//! [`Signer`](crate::provider::Signer).
//!
//! Signing holds the file's lock for its whole duration, then the session's.
//! Two sessions racing to sign the same file therefore produce exactly one
//! signature: the loser fails with `AlreadySigned` and its session is
//! rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::jose::{self, Type};
use crate::model::{
    FileRecord, FileStatus, Session, SessionStatus, SignatureRecord, Suite, SupersededSignature,
    SUITE_VERSION,
};
use crate::provider::{BlobStore, Clock, Provider, Signer};
use crate::types::{SignStatus, VerifiedClaim};
use crate::{core::generate, hash, registry, session, Error, Result};

/// Claims carried by a signature proof.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProofClaims {
    /// The signing service (its `client_id`).
    pub iss: String,

    /// The holder who authorized the signature.
    pub sub: String,

    /// Issued at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    /// Signature id.
    pub jti: String,

    /// The signed file.
    pub file_id: String,

    /// Base64 content hash of the signed file.
    pub file_hash: String,

    /// Algorithm that produced `file_hash`.
    pub hash_alg: String,
}

impl<P: Provider> Endpoint<P> {
    /// Sign the file named by a verified claim.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound`, `RetentionExpired`, `InvalidRequest` when the
    /// session does not back the claim, `AlreadySigned` if the file or the
    /// session has already been used, `HashMismatch` if the stored bytes have
    /// changed since upload, and `StorageFailure` if the record cannot be
    /// saved.
    #[instrument(level = "debug", skip(self, claim), fields(file_id = %claim.file_id))]
    pub async fn sign(&self, claim: &VerifiedClaim) -> Result<SignatureRecord> {
        self.produce(claim, false).await
    }

    /// Sign an already-signed file again, moving the current signature into
    /// the file's history.
    ///
    /// # Errors
    ///
    /// As for [`Endpoint::sign`], except that a signed file is not an error.
    #[instrument(level = "debug", skip(self, claim), fields(file_id = %claim.file_id))]
    pub async fn supersede(&self, claim: &VerifiedClaim) -> Result<SignatureRecord> {
        self.produce(claim, true).await
    }

    /// Signing progress for a file.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` for an unknown file.
    #[instrument(level = "debug", skip(self))]
    pub async fn sign_status(&self, file_id: &str) -> Result<SignStatus> {
        tracing::debug!("sign_status::process");

        let record = registry::require(&self.provider, file_id).await?;
        let signature = record.signature();

        Ok(SignStatus {
            file_id: record.id.clone(),
            status: record.status.as_str().to_string(),
            holder: signature.map(|s| s.holder.clone()),
            issued_at: signature.map(|s| s.issued_at),
        })
    }

    async fn produce(&self, claim: &VerifiedClaim, supersede: bool) -> Result<SignatureRecord> {
        let _file_guard = self.lock_file(&claim.file_id).await;
        let _session_guard = self.lock_session(&claim.state).await;

        tracing::debug!("sign::verify");

        let now = Clock::now(&self.provider);
        let mut record = registry::require(&self.provider, &claim.file_id).await?;
        if record.status == FileStatus::Expired
            || record.is_expired(now, self.config.retention)
        {
            return Err(Error::RetentionExpired(format!("file {} has expired", record.id)));
        }

        let Some(mut session) = session::get(&self.provider, &claim.state).await? else {
            return Err(Error::UnknownSession("no session for state".into()));
        };
        verify_session(&session, claim)?;

        if record.signature().is_some() && !supersede {
            session.status = SessionStatus::Rejected {
                reason: "file is already signed".into(),
            };
            if let Err(e) = session::put(&self.provider, &session, self.config.retention).await {
                tracing::error!("issue rejecting session: {e}");
            }
            return Err(Error::AlreadySigned(format!("file {} is already signed", record.id)));
        }

        tracing::debug!("sign::process");

        let reader = BlobStore::read(&self.provider, &record.stored_path)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue reading file: {e}")))?;
        let content_hash = hash::digest(reader)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue hashing file: {e}")))?;
        if content_hash != record.content_hash {
            return Err(Error::HashMismatch(format!("file {} has changed since upload", record.id)));
        }

        let signature = self.signature_record(&record, &session, now).await?;

        if let FileStatus::Signed { signature: current } = &record.status {
            record.history.push(SupersededSignature {
                signature: current.clone(),
                superseded_at: now,
            });
        }
        record.status = FileStatus::Signed {
            signature: signature.clone(),
        };
        registry::put(&self.provider, &record, self.config.retention).await?;

        if let SessionStatus::Verified { signature_id, .. } = &mut session.status {
            *signature_id = Some(signature.id.clone());
        }
        if let Err(e) = session::put(&self.provider, &session, self.config.retention).await {
            tracing::warn!("signature {} not recorded on session: {e}", signature.id);
        }

        Ok(signature)
    }

    async fn signature_record(
        &self, record: &FileRecord, session: &Session, now: DateTime<Utc>,
    ) -> Result<SignatureRecord> {
        let holder = session.holder().unwrap_or_default().to_string();
        let id = generate::signature_id();
        let expires_at = now + self.config.signature_validity;

        let claims = ProofClaims {
            iss: self.config.client_id.clone(),
            sub: holder.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: id.clone(),
            file_id: record.id.clone(),
            file_hash: record.content_hash.to_base64(),
            hash_alg: record.content_hash.algorithm.to_string(),
        };
        let proof = jose::encode(Type::Proof, &claims, &self.provider)
            .await
            .map_err(|e| Error::ServerError(format!("issue signing proof: {e}")))?;

        Ok(SignatureRecord {
            id,
            holder,
            content_hash: record.content_hash.clone(),
            suite: Suite {
                hash: record.content_hash.algorithm,
                proof: Signer::algorithm(&self.provider),
                version: SUITE_VERSION.to_string(),
            },
            issued_at: now,
            expires_at,
            session: session.token.clone(),
            proof,
        })
    }
}

// The session must be verified, for this file and holder, and unused.
fn verify_session(session: &Session, claim: &VerifiedClaim) -> Result<()> {
    let SessionStatus::Verified {
        holder,
        signature_id,
        ..
    } = &session.status
    else {
        return Err(Error::InvalidRequest(format!(
            "session is {}, not verified",
            session.status.as_str()
        )));
    };
    if session.file_id != claim.file_id || *holder != claim.holder {
        return Err(Error::InvalidRequest("claim does not match the verified session".into()));
    }
    if signature_id.is_some() {
        return Err(Error::AlreadySigned("session has already produced a signature".into()));
    }
    Ok(())
}
