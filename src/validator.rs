//! # `did:jwk` Credential Validator
//!
//! A [`CredentialValidator`] for JWT presentations signed with a key
//! published as a [`did:jwk`]. The DID embeds the public key, so no network
//! resolution is needed.
//!
//! The validator checks:
//!
//! * the presentation signature, and that the presenter (`iss`) is the DID
//!   that signed it;
//! * that the presentation has not passed its `exp`;
//! * when an audience is configured, that `aud` names it.
//!
//! It does NOT verify the signatures of the credentials embedded in the
//! presentation, so a holder can present a self-issued credential of the
//! required type. Nor does it consult trust registries or revocation lists.
//! Hosts relying on the issuer of a credential must wrap or replace it.
//!
//! [`did:jwk`]: https://github.com/quartzjer/did-jwk/blob/main/spec.md

use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use serde_json::Value;

use crate::core::Kind;
use crate::jose::{self, Jwk, Jwt};
use crate::provider::{CredentialValidator, Result};
use crate::types::Presentation;

const DID_JWK: &str = "did:jwk:";

/// Verifies JWT presentations signed by a `did:jwk` holder.
#[derive(Clone, Debug, Default)]
pub struct DidJwkValidator {
    credential_type: Option<String>,
    audience: Option<String>,
}

impl DidJwkValidator {
    /// Create a validator that accepts any credential type.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            credential_type: None,
            audience: None,
        }
    }

    /// Require the presentation to contain a credential of `credential_type`.
    #[must_use]
    pub fn with_credential_type(mut self, credential_type: impl Into<String>) -> Self {
        self.credential_type = Some(credential_type.into());
        self
    }

    /// Require the presentation's `aud` to name `audience`, usually the
    /// Verifier's `client_id`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

impl CredentialValidator for DidJwkValidator {
    async fn validate(&self, presentation: &Presentation) -> Result<()> {
        let Kind::String(token) = &presentation.token else {
            bail!("only JWT presentations can be verified");
        };

        let jwt: Jwt<Value> = jose::decode(token)?;
        let kid = jwt.header.kid.ok_or_else(|| anyhow!("presentation has no kid"))?;
        let did = kid.split('#').next().unwrap_or_default();

        let jwk = deref_did_jwk(did)?;
        jose::verify(token, &jwk)?;

        if presentation.holder != did {
            bail!("holder {} is not bound to the signing key", presentation.holder);
        }

        if let Some(exp) = jwt.claims.get("exp").and_then(Value::as_i64) {
            if exp <= Utc::now().timestamp() {
                bail!("presentation has expired");
            }
        }

        if let Some(audience) = &self.audience {
            let matches = match jwt.claims.get("aud") {
                Some(Value::String(aud)) => aud == audience,
                Some(Value::Array(auds)) => auds.iter().any(|aud| aud == audience.as_str()),
                _ => false,
            };
            if !matches {
                bail!("presentation is not intended for {audience}");
            }
        }

        if let Some(credential_type) = &self.credential_type {
            let credentials = jwt.claims.pointer("/vp/verifiableCredential");
            if !contains_type(credentials, credential_type) {
                bail!("presentation has no {credential_type} credential");
            }
        }

        Ok(())
    }
}

/// Extract the public key embedded in a `did:jwk`.
///
/// # Errors
///
/// Returns an error if the DID is not a `did:jwk` or does not decode to a
/// JWK.
pub fn deref_did_jwk(did: &str) -> anyhow::Result<Jwk> {
    let Some(encoded) = did.strip_prefix(DID_JWK) else {
        bail!("{did} is not a did:jwk");
    };
    let decoded = Base64UrlUnpadded::decode_vec(encoded)
        .map_err(|e| anyhow!("Unable to decode DID: {e}"))?;
    serde_json::from_slice::<Jwk>(&decoded).map_err(anyhow::Error::from)
}

fn contains_type(credentials: Option<&Value>, credential_type: &str) -> bool {
    let has_type = |vc: &Value| {
        let vc = vc.get("vc").unwrap_or(vc);
        match vc.get("type") {
            Some(Value::Array(types)) => types.iter().any(|t| t == credential_type),
            Some(Value::String(t)) => t == credential_type,
            _ => false,
        }
    };
    match credentials {
        Some(Value::Array(vcs)) => vcs.iter().any(has_type),
        Some(vc) => has_type(vc),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::keystore::Keystore;
    use crate::test_utils::sample;

    #[tokio::test]
    async fn valid_presentation() {
        let wallet = Keystore::new();
        let vp = sample::jwt_vp(&wallet, "n-123").await;
        let presentation = Presentation::decode(&vp).expect("should decode");

        let validator = DidJwkValidator::new().with_credential_type(sample::CREDENTIAL_TYPE);
        validator.validate(&presentation).await.expect("should validate");
    }

    #[tokio::test]
    async fn holder_not_bound() {
        let wallet = Keystore::new();
        let vp = sample::jwt_vp(&wallet, "n-123").await;
        let mut presentation = Presentation::decode(&vp).expect("should decode");
        presentation.holder = "did:example:mallory".into();

        let err = DidJwkValidator::new().validate(&presentation).await.expect_err("should fail");
        assert!(err.to_string().contains("not bound"));
    }

    #[tokio::test]
    async fn wrong_credential_type() {
        let wallet = Keystore::new();
        let vp = sample::jwt_vp(&wallet, "n-123").await;
        let presentation = Presentation::decode(&vp).expect("should decode");

        let validator = DidJwkValidator::new().with_credential_type("DriversLicense");
        assert!(validator.validate(&presentation).await.is_err());
    }

    #[tokio::test]
    async fn audience() {
        let wallet = Keystore::new();
        let claims = |aud: &str| {
            serde_json::json!({
                "iss": wallet.did(),
                "nonce": "n-123",
                "aud": aud,
                "vp": {"holder": wallet.did()}
            })
        };
        let validator = DidJwkValidator::new().with_audience("https://sign.example.com");

        let vp = sample::signed_vp(&wallet, &claims("https://sign.example.com")).await;
        let presentation = Presentation::decode(&vp).expect("should decode");
        validator.validate(&presentation).await.expect("should validate");

        let vp = sample::signed_vp(&wallet, &claims("https://other.example.com")).await;
        let presentation = Presentation::decode(&vp).expect("should decode");
        let err = validator.validate(&presentation).await.expect_err("should fail");
        assert!(err.to_string().contains("not intended"));

        // no aud at all
        let vp = sample::jwt_vp(&wallet, "n-123").await;
        let presentation = Presentation::decode(&vp).expect("should decode");
        assert!(validator.validate(&presentation).await.is_err());
    }

    #[tokio::test]
    async fn expired_presentation() {
        let wallet = Keystore::new();
        let claims = serde_json::json!({
            "iss": wallet.did(),
            "nonce": "n-123",
            "exp": Utc::now().timestamp() - 60,
            "vp": {"holder": wallet.did()}
        });
        let vp = sample::signed_vp(&wallet, &claims).await;
        let presentation = Presentation::decode(&vp).expect("should decode");

        let err = DidJwkValidator::new().validate(&presentation).await.expect_err("should fail");
        assert!(err.to_string().contains("expired"));
    }

    #[tokio::test]
    async fn json_vp_unsupported() {
        let vp = sample::json_vp("did:example:alice", "n-123");
        let presentation = Presentation::decode(&vp).expect("should decode");
        assert!(DidJwkValidator::new().validate(&presentation).await.is_err());
    }

    #[test]
    fn deref_round_trip() {
        let wallet = Keystore::new();
        let jwk = deref_did_jwk(&wallet.did()).expect("should deref");
        assert_eq!(jwk, wallet.jwk());
        assert!(deref_did_jwk("did:web:example.com").is_err());
    }
}
