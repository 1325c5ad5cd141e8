//! # Types
//!
//! Request and response types for the [`Endpoint`](crate::Endpoint)
//! operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Kind;
use crate::dif_exch::{PresentationDefinition, PresentationSubmission};
use crate::hash::Digest;
use crate::model::FileRecord;
pub use crate::presentation::{Presentation, PresentationFormat};
pub use crate::sign::ProofClaims;

/// Returned after a file has been stored.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Identifier of the new file.
    pub file_id: String,

    /// Sanitized file name.
    pub original_name: String,

    /// Size of the stored file.
    pub size_bytes: u64,

    /// Digest of the stored bytes.
    pub content_hash: Digest,
}

/// The Request Object sent to the Wallet, either by value or, signed, by
/// reference.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestObject {
    /// Always `vp_token`.
    pub response_type: String,

    /// Always `direct_post`: the Wallet posts its response to
    /// `response_uri`.
    pub response_mode: String,

    /// Verifier identifier.
    pub client_id: String,

    /// Where the Wallet sends the Authorization Response.
    pub response_uri: String,

    /// Anti-replay value the presentation must echo.
    pub nonce: String,

    /// Correlation token returned with the response.
    pub state: String,

    /// The credential the Verifier is asking for.
    pub presentation_definition: PresentationDefinition,
}

/// Returned when a presentation request is issued.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IssueResponse {
    /// Correlation token (session id).
    pub state: String,

    /// The Request Object, by value.
    pub request_object: RequestObject,

    /// URI the Wallet fetches the signed Request Object from.
    pub request_uri: String,

    /// URI that invokes the Wallet. Suitable for embedding in a QR code.
    pub wallet_uri: String,

    /// When the request stops being answerable.
    pub expires_at: DateTime<Utc>,
}

/// Authorization Response sent by the Wallet to the `response_uri`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResponseRequest {
    /// The Verifiable Presentation, either a compact JWT or a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<Kind<Map<String, Value>>>,

    /// Mapping between the requested credentials and where they sit in the
    /// VP Token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_submission: Option<PresentationSubmission>,

    /// The `state` value from the Request Object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ResponseRequest {
    /// Create a `HashMap` representation of the `ResponseRequest` suitable for
    /// use in an HTML form post.
    ///
    /// # Errors
    ///
    /// Will return an error if any nested objects cannot be serialized.
    pub fn form_encode(&self) -> anyhow::Result<HashMap<String, String>> {
        let mut map = HashMap::new();
        match &self.vp_token {
            Some(Kind::String(token)) => {
                map.insert("vp_token".into(), token.clone());
            }
            Some(Kind::Object(vp)) => {
                map.insert("vp_token".into(), serde_json::to_string(vp)?);
            }
            None => {}
        }
        if let Some(submission) = &self.presentation_submission {
            map.insert("presentation_submission".into(), serde_json::to_string(submission)?);
        }
        if let Some(state) = &self.state {
            map.insert("state".into(), state.clone());
        }
        Ok(map)
    }

    /// Create a `ResponseRequest` from the fields of a form post.
    ///
    /// A `vp_token` that parses as a JSON object is taken as a JSON VP,
    /// anything else as a compact JWT.
    ///
    /// # Errors
    ///
    /// Will return an error if the `presentation_submission` is not valid
    /// JSON.
    pub fn form_decode(map: &HashMap<String, String>) -> anyhow::Result<Self> {
        let mut req = Self::default();
        if let Some(vp_token) = map.get("vp_token") {
            req.vp_token = Some(match serde_json::from_str::<Map<String, Value>>(vp_token) {
                Ok(vp) => Kind::Object(vp),
                Err(_) => Kind::String(vp_token.clone()),
            });
        }
        if let Some(submission) = map.get("presentation_submission") {
            req.presentation_submission = Some(serde_json::from_str(submission)?);
        }
        if let Some(state) = map.get("state") {
            req.state = Some(state.clone());
        }
        Ok(req)
    }
}

/// Returned to the Wallet once the presentation has been accepted and the
/// file signed.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResponseResponse {
    /// Where the Wallet should send the User Agent next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// The signed file.
    pub file_id: String,

    /// Identifier of the new signature.
    pub signature_id: String,
}

/// The outcome of a successful presentation verification.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VerifiedClaim {
    /// Token of the verified session.
    pub state: String,

    /// File the session was issued for.
    pub file_id: String,

    /// Holder identifier asserted by the presentation.
    pub holder: String,

    /// Credential subject attributes asserted by the presentation.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    /// When the presentation was accepted.
    pub verified_at: DateTime<Utc>,
}

/// Signing progress for a file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignStatus {
    /// The file.
    pub file_id: String,

    /// One of `uploaded`, `awaiting_presentation`, `signed` or `expired`.
    pub status: String,

    /// The signer, once signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    /// When the file was signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

/// Returned when a signed file's bytes match its signature.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CheckResponse {
    /// Holder identifier bound into the signature.
    pub holder: String,

    /// When the signature was produced.
    pub issued_at: DateTime<Utc>,
}

/// A file's record together with a reader over its bytes.
#[derive(Debug)]
pub struct Download<R> {
    /// The file record.
    pub record: FileRecord,

    /// Reader over the stored bytes.
    pub reader: R,
}

/// Counts from a single reaper sweep.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReapReport {
    /// Files whose bytes and record were removed.
    pub files_removed: usize,

    /// Expired files that could not be fully removed and will be retried.
    pub files_retained: usize,

    /// Pending sessions moved to `Expired`.
    pub sessions_expired: usize,

    /// Terminal sessions removed.
    pub sessions_purged: usize,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn form_round_trip() {
        let req = ResponseRequest {
            vp_token: Some(Kind::Object(
                json!({"holder": "did:example:alice"}).as_object().cloned().unwrap_or_default(),
            )),
            presentation_submission: None,
            state: Some("abc".into()),
        };

        let form = req.form_encode().expect("should encode");
        assert_eq!(form["state"], "abc");

        let decoded = ResponseRequest::form_decode(&form).expect("should decode");
        assert_eq!(decoded, req);
    }

    #[test]
    fn form_jwt_token() {
        let form = HashMap::from([
            ("vp_token".to_string(), "eyJhbGciOiJFZERTQSJ9.e30.c2ln".to_string()),
            ("state".to_string(), "abc".to_string()),
        ]);
        let decoded = ResponseRequest::form_decode(&form).expect("should decode");
        assert_eq!(decoded.vp_token, Some(Kind::String("eyJhbGciOiJFZERTQSJ9.e30.c2ln".into())));
    }
}
