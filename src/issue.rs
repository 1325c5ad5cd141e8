//! # Presentation Request Issuer
//!
//! Prepares an [OpenID4VP] Authorization Request bound to a single file.
//!
//! Each request gets a fresh correlation token (`state`) and anti-replay
//! `nonce`, recorded in a `Pending` session that expires after the configured
//! TTL. The Request Object is returned by value and is also available, signed,
//! by reference from [`Endpoint::request_object`]: the Wallet is given a
//! `request_uri` of the form `{request_uri_base}/request/{state}`.
//!
//! ```json
//! {
//!   "response_type": "vp_token",
//!   "response_mode": "direct_post",
//!   "client_id": "http://localhost:8080",
//!   "response_uri": "http://localhost:8080/callback",
//!   "nonce": "...",
//!   "state": "...",
//!   "presentation_definition": { ... }
//! }
//! ```
//!
//! [OpenID4VP]: https://openid.net/specs/openid-4-verifiable-presentations-1_0.html

use tracing::instrument;

use crate::core::generate;
use crate::dif_exch::PresentationDefinition;
use crate::endpoint::Endpoint;
use crate::jose::{self, Type};
use crate::model::{FileRecord, FileStatus, Session, SessionStatus};
use crate::provider::{Clock, Provider};
use crate::types::{IssueResponse, RequestObject};
use crate::{registry, session, wallet, Error, Result};

impl<P: Provider> Endpoint<P> {
    /// Issue a presentation request for the file.
    ///
    /// Several requests may be outstanding for one file; whichever is
    /// answered first signs it.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` for an unknown file, `AlreadySigned` for a
    /// signed file, `RetentionExpired` for an expired file, and
    /// `StorageFailure` if the session cannot be saved.
    #[instrument(level = "debug", skip(self))]
    pub async fn issue_request(&self, file_id: &str) -> Result<IssueResponse> {
        let _guard = self.lock_file(file_id).await;

        let mut record = registry::require(&self.provider, file_id).await?;
        self.verify_issuable(&record)?;

        tracing::debug!("issue::process");

        let now = Clock::now(&self.provider);
        let session = Session {
            token: generate::state_key(),
            nonce: generate::nonce(),
            file_id: record.id.clone(),
            definition_id: generate::definition_id(),
            created_at: now,
            expires_at: now + self.config.session_ttl,
            status: SessionStatus::Pending,
        };
        session::put(&self.provider, &session, self.config.retention).await?;

        if record.status == FileStatus::Uploaded {
            record.status = FileStatus::AwaitingPresentation;
            registry::put(&self.provider, &record, self.config.retention).await?;
        }

        Ok(IssueResponse {
            request_object: self.build_request_object(&session),
            request_uri: wallet::request_uri(&self.config, &session.token),
            wallet_uri: wallet::wallet_uri(&self.config, &session.token),
            expires_at: session.expires_at,
            state: session.token,
        })
    }

    /// The signed Request Object for a pending session, as a compact JWS.
    /// Served to the Wallet from the `request_uri`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` for an unknown `state`, `SessionExpired` if the
    /// session is no longer pending, and `ServerError` if signing fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn request_object(&self, state: &str) -> Result<String> {
        tracing::debug!("request_object::verify");

        let Some(session) = session::get(&self.provider, state).await? else {
            return Err(Error::UnknownSession("no session for state".into()));
        };
        if session.status != SessionStatus::Pending || session.is_expired(Clock::now(&self.provider))
        {
            return Err(Error::SessionExpired("request is no longer available".into()));
        }

        tracing::debug!("request_object::process");

        let request_object = self.build_request_object(&session);
        jose::encode(Type::Request, &request_object, &self.provider)
            .await
            .map_err(|e| Error::ServerError(format!("issue signing request object: {e}")))
    }

    fn verify_issuable(&self, record: &FileRecord) -> Result<()> {
        tracing::debug!("issue::verify");

        match record.status {
            FileStatus::Signed { .. } => {
                Err(Error::AlreadySigned(format!("file {} is already signed", record.id)))
            }
            FileStatus::Expired => {
                Err(Error::RetentionExpired(format!("file {} has expired", record.id)))
            }
            FileStatus::Uploaded | FileStatus::AwaitingPresentation => {
                if record.is_expired(Clock::now(&self.provider), self.config.retention) {
                    return Err(Error::RetentionExpired(format!("file {} has expired", record.id)));
                }
                Ok(())
            }
        }
    }

    fn build_request_object(&self, session: &Session) -> RequestObject {
        RequestObject {
            response_type: "vp_token".into(),
            response_mode: "direct_post".into(),
            client_id: self.config.client_id.clone(),
            response_uri: self.config.response_uri.clone(),
            nonce: session.nonce.clone(),
            state: session.token.clone(),
            presentation_definition: PresentationDefinition::for_credential(
                &session.definition_id,
                &self.config.credential_type,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_let_bind::assert_let;

    use super::*;
    use crate::config::Config;
    use crate::jose::Jwt;
    use crate::test_utils::Provider as TestProvider;

    async fn uploaded() -> (Endpoint<TestProvider>, String) {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let file_id =
            endpoint.upload("contract.pdf", vec![1; 1024]).await.expect("should upload").file_id;
        (endpoint, file_id)
    }

    #[tokio::test]
    async fn issue() {
        let (endpoint, file_id) = uploaded().await;

        let response = endpoint.issue_request(&file_id).await.expect("should issue");
        let req_obj = &response.request_object;

        assert_eq!(req_obj.response_type, "vp_token");
        assert_eq!(req_obj.response_mode, "direct_post");
        assert_eq!(req_obj.state, response.state);
        assert_ne!(req_obj.nonce, response.state);
        assert!(response.wallet_uri.starts_with("openid4vp://authorize?client_id="));

        let session = session::get(endpoint.provider(), &response.state)
            .await
            .expect("should read")
            .expect("should exist");
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.file_id, file_id);
        assert_eq!(session.expires_at - session.created_at, endpoint.config().session_ttl);

        let record = registry::require(endpoint.provider(), &file_id).await.expect("should exist");
        assert_eq!(record.status, FileStatus::AwaitingPresentation);
    }

    #[tokio::test]
    async fn tokens_are_fresh() {
        let (endpoint, file_id) = uploaded().await;

        let first = endpoint.issue_request(&file_id).await.expect("should issue");
        let second = endpoint.issue_request(&file_id).await.expect("should issue");
        assert_ne!(first.state, second.state);
        assert_ne!(first.request_object.nonce, second.request_object.nonce);
    }

    #[tokio::test]
    async fn unknown_file() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        assert_let!(Err(Error::FileNotFound(_)), endpoint.issue_request("missing").await);
    }

    #[tokio::test]
    async fn signed_request_object() {
        let (endpoint, file_id) = uploaded().await;
        let response = endpoint.issue_request(&file_id).await.expect("should issue");

        let jws = endpoint.request_object(&response.state).await.expect("should sign");
        let jwt: Jwt<RequestObject> = jose::decode(&jws).expect("should decode");
        assert_eq!(jwt.header.typ, Type::Request);
        assert_eq!(jwt.claims, response.request_object);
        jose::verify(&jws, &endpoint.provider().keystore.jwk()).expect("should verify");

        let result = endpoint.request_object("unknown").await;
        assert_let!(Err(Error::UnknownSession(_)), result);
    }

    #[tokio::test]
    async fn request_object_expired() {
        let (endpoint, file_id) = uploaded().await;
        let response = endpoint.issue_request(&file_id).await.expect("should issue");

        endpoint.provider().clock.advance(chrono::TimeDelta::minutes(6));
        let result = endpoint.request_object(&response.state).await;
        assert_let!(Err(Error::SessionExpired(_)), result);
    }
}
