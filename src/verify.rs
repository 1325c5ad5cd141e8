//! # Presentation Verifier
//!
//! The Wallet posts its Authorization Response (`direct_post`) to the
//! `response_uri`. The response is checked against the pending session in a
//! fixed order, each step a hard gate:
//!
//! 1. `state` must name a known session.
//! 2. The session must still be pending and inside its window. A session
//!    found past its window is marked `Expired`.
//! 3. The `vp_token` must decode, as a compact JWT or a JSON VP.
//! 4. The echoed nonce must equal the session nonce exactly.
//! 5. The host's [`CredentialValidator`] must accept the presentation.
//!
//! A failure at steps 3 to 5 marks the session `Rejected`; the session can
//! never be retried. On success the session becomes `Verified`.
//!
//! [`CredentialValidator`]: crate::provider::CredentialValidator

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::model::{Session, SessionStatus};
use crate::provider::{Clock, CredentialValidator, Provider};
use crate::types::{Presentation, ResponseRequest, ResponseResponse, VerifiedClaim};
use crate::{session, Error, Result};

impl<P: Provider> Endpoint<P> {
    /// Verify a Wallet's presentation against its pending session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession`, `SessionExpired`, `MalformedArtifact`,
    /// `NonceMismatch` or `CredentialInvalid` as described in the module
    /// docs, and `StorageFailure` if the session cannot be read or written.
    #[instrument(level = "debug", skip(self, request))]
    pub async fn verify(&self, request: &ResponseRequest) -> Result<VerifiedClaim> {
        let Some(state) = &request.state else {
            return Err(Error::UnknownSession("response has no state".into()));
        };
        let _guard = self.lock_session(state).await;

        let Some(mut session) = session::get(&self.provider, state).await? else {
            return Err(Error::UnknownSession("no session for state".into()));
        };
        let now = Clock::now(&self.provider);

        tracing::debug!("verify::verify");

        self.verify_window(&mut session, now).await?;

        let presentation = match self.verify_presentation(&session, request).await {
            Ok(presentation) => presentation,
            Err(e) => {
                session.status = SessionStatus::Rejected {
                    reason: e.parts().1.to_string(),
                };
                if let Err(store_err) =
                    session::put(&self.provider, &session, self.config.retention).await
                {
                    tracing::error!("issue rejecting session: {store_err}");
                }
                return Err(e);
            }
        };

        tracing::debug!("verify::process");

        session.status = SessionStatus::Verified {
            verified_at: now,
            holder: presentation.holder.clone(),
            signature_id: None,
        };
        session::put(&self.provider, &session, self.config.retention).await?;

        Ok(VerifiedClaim {
            state: session.token,
            file_id: session.file_id,
            attributes: presentation.attributes(),
            holder: presentation.holder,
            verified_at: now,
        })
    }

    /// Verify the Wallet's presentation and, if it is accepted, sign the
    /// file.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Endpoint::verify`] or [`Endpoint::sign`].
    #[instrument(level = "debug", skip(self, request))]
    pub async fn callback(&self, request: &ResponseRequest) -> Result<ResponseResponse> {
        let claim = self.verify(request).await?;
        let signature = self.sign(&claim).await?;

        Ok(ResponseResponse {
            redirect_uri: Some(format!(
                "{}/share/{}",
                self.config.request_uri_base.trim_end_matches('/'),
                claim.file_id
            )),
            file_id: claim.file_id,
            signature_id: signature.id,
        })
    }

    async fn verify_window(&self, session: &mut Session, now: DateTime<Utc>) -> Result<()> {
        if session.status != SessionStatus::Pending {
            return Err(Error::SessionExpired(format!(
                "session is {}",
                session.status.as_str()
            )));
        }
        if session.is_expired(now) {
            session.status = SessionStatus::Expired;
            session::put(&self.provider, session, self.config.retention).await?;
            return Err(Error::SessionExpired("session has expired".into()));
        }
        Ok(())
    }

    async fn verify_presentation(
        &self, session: &Session, request: &ResponseRequest,
    ) -> Result<Presentation> {
        let Some(vp_token) = &request.vp_token else {
            return Err(Error::MalformedArtifact("response has no vp_token".into()));
        };
        let presentation = Presentation::decode(vp_token)
            .map_err(|e| Error::MalformedArtifact(format!("issue decoding vp_token: {e}")))?;

        if let Some(submission) = &request.presentation_submission {
            if submission.definition_id != session.definition_id {
                return Err(Error::MalformedArtifact("definition_ids do not match".into()));
            }
        }

        if presentation.nonce != session.nonce {
            return Err(Error::NonceMismatch("nonce does not match".into()));
        }

        CredentialValidator::validate(&self.provider, &presentation)
            .await
            .map_err(|e| Error::CredentialInvalid(e.to_string()))?;

        Ok(presentation)
    }
}
