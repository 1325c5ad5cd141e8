//! # Errors
//!
//! This module defines the errors returned across the signing lifecycle.
//!
//! Errors are rendered using the `OpenID` error response shape
//! (`error` + `error_description`) so the HTTP layer can return them to a
//! Wallet or a browser without further mapping.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Errors returned by the presentation, signing, and validation endpoints.
///
/// Each error is scoped to the single file or session involved; none are
/// fatal to the process.
#[derive(Error, Debug, Deserialize)]
pub enum Error {
    /// The correlation `state` does not reference a known session.
    #[error(r#"{{"error": "unknown_session", "error_description": "{0}"}}"#)]
    UnknownSession(String),

    /// The session has passed its expiry or is no longer pending.
    #[error(r#"{{"error": "session_expired", "error_description": "{0}"}}"#)]
    SessionExpired(String),

    /// The presentation artifact could not be decoded.
    #[error(r#"{{"error": "malformed_artifact", "error_description": "{0}"}}"#)]
    MalformedArtifact(String),

    /// The nonce in the presentation does not match the one issued with the
    /// request.
    #[error(r#"{{"error": "nonce_mismatch", "error_description": "{0}"}}"#)]
    NonceMismatch(String),

    /// The injected credential check rejected the presentation.
    #[error(r#"{{"error": "credential_invalid", "error_description": "{0}"}}"#)]
    CredentialInvalid(String),

    /// The file id does not reference a known file.
    #[error(r#"{{"error": "file_not_found", "error_description": "{0}"}}"#)]
    FileNotFound(String),

    /// The file has no signature record.
    #[error(r#"{{"error": "not_signed", "error_description": "{0}"}}"#)]
    NotSigned(String),

    /// The stored bytes no longer match the hash bound into the signature.
    #[error(r#"{{"error": "hash_mismatch", "error_description": "{0}"}}"#)]
    HashMismatch(String),

    /// The file, or the session, has already produced a signature.
    #[error(r#"{{"error": "already_signed", "error_description": "{0}"}}"#)]
    AlreadySigned(String),

    /// The file has passed its retention window.
    #[error(r#"{{"error": "retention_expired", "error_description": "{0}"}}"#)]
    RetentionExpired(String),

    /// The request is missing a required parameter or is otherwise invalid.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// The notification could not be delivered.
    #[error(r#"{{"error": "delivery_failed", "error_description": "{0}"}}"#)]
    DeliveryFailed(String),

    /// The underlying state or byte store is unavailable.
    #[error(r#"{{"error": "storage_failure", "error_description": "{0}"}}"#)]
    StorageFailure(String),

    /// An unexpected condition prevented the request from being fulfilled.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

/// Error response in `OpenID` format.
#[derive(Deserialize, Serialize)]
pub struct OidError {
    /// Error code.
    pub error: String,

    /// Error description.
    pub error_description: String,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (error, description) = self.parts();
        OidError {
            error: error.to_string(),
            error_description: description.to_string(),
        }
        .serialize(serializer)
    }
}

impl Error {
    /// Transform error to `OpenID` compatible json format.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// The `OpenID` error code and description.
    ///
    /// Descriptions may contain characters (quotes, for example) that make
    /// the `Display` form invalid JSON, so serialization goes through here.
    #[must_use]
    pub fn parts(&self) -> (&'static str, &str) {
        match self {
            Self::UnknownSession(d) => ("unknown_session", d.as_str()),
            Self::SessionExpired(d) => ("session_expired", d.as_str()),
            Self::MalformedArtifact(d) => ("malformed_artifact", d.as_str()),
            Self::NonceMismatch(d) => ("nonce_mismatch", d.as_str()),
            Self::CredentialInvalid(d) => ("credential_invalid", d.as_str()),
            Self::FileNotFound(d) => ("file_not_found", d.as_str()),
            Self::NotSigned(d) => ("not_signed", d.as_str()),
            Self::HashMismatch(d) => ("hash_mismatch", d.as_str()),
            Self::AlreadySigned(d) => ("already_signed", d.as_str()),
            Self::RetentionExpired(d) => ("retention_expired", d.as_str()),
            Self::InvalidRequest(d) => ("invalid_request", d.as_str()),
            Self::DeliveryFailed(d) => ("delivery_failed", d.as_str()),
            Self::StorageFailure(d) => ("storage_failure", d.as_str()),
            Self::ServerError(d) => ("server_error", d.as_str()),
        }
    }

    /// Whether the error was caused by the caller (protocol or validation
    /// failure) rather than by the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::StorageFailure(_) | Self::ServerError(_) | Self::DeliveryFailed(_)
        )
    }
}
