//! # JOSE
//!
//! Minimal JSON Web Token support: compact JWS encoding with the pluggable
//! [`Signer`], header and claims decoding, and Ed25519 signature
//! verification against a JWK.
//!
//! Decoding a token does not establish trust. Only [`verify`] checks a
//! signature, and only the injected `CredentialValidator` decides whether a
//! presentation is accepted.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

use std::fmt::{self, Display};

use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::provider::Signer;

/// Algorithm is used to specify the signing algorithm used by the signer.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Algorithm {
    /// Algorithm for the secp256k1 curve
    #[serde(rename = "ES256K")]
    ES256K,

    /// Algorithm for the P-256 curve
    #[serde(rename = "ES256")]
    ES256,

    /// Algorithm for the Ed25519 curve
    #[default]
    #[serde(rename = "EdDSA")]
    EdDSA,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The JWT `typ` header.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Type {
    /// Generic JWT, used for presentations.
    #[default]
    #[serde(rename = "JWT")]
    Jwt,

    /// Authorization Request Object.
    #[serde(rename = "oauth-authz-req+jwt")]
    Request,

    /// Proof over a signed file.
    #[serde(rename = "sign-proof+jwt")]
    Proof,
}

/// JOSE header.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Digital signature algorithm identifier.
    pub alg: Algorithm,

    /// Used to declare the media type of the JWS.
    #[serde(default)]
    pub typ: Type,

    /// Key id of the key used to sign the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// A decoded JWT.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwt<T> {
    /// The JWT header.
    pub header: Header,

    /// The JWT claims.
    pub claims: T,
}

/// Simplified JSON Web Key, sufficient for Ed25519 (`OKP`) keys.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type.
    pub kty: String,

    /// Cryptographic curve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// Public key, base64url encoded.
    pub x: String,

    /// Key use.
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

/// Encode the provided claims and sign, returning a JWT in compact JWS form.
///
/// # Errors
///
/// Returns an error if the claims cannot be serialized or the signer fails.
pub async fn encode<T>(typ: Type, claims: &T, signer: &impl Signer) -> anyhow::Result<String>
where
    T: Serialize + Send + Sync,
{
    tracing::debug!("encode");

    let header = Header {
        alg: signer.algorithm(),
        typ,
        kid: Some(signer.verification_method().await?),
    };

    let header_enc = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);
    let claims_enc = Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?);
    let payload = format!("{header_enc}.{claims_enc}");

    let sig = signer.try_sign(payload.as_bytes()).await?;
    let sig_enc = Base64UrlUnpadded::encode_string(&sig);

    Ok(format!("{payload}.{sig_enc}"))
}

/// Decode the header and claims of a compact JWS without checking its
/// signature.
///
/// # Errors
///
/// Returns an error if the token is not three base64url segments or the
/// header or claims are not the expected JSON.
pub fn decode<T>(token: &str) -> anyhow::Result<Jwt<T>>
where
    T: DeserializeOwned,
{
    let (header_enc, claims_enc, _) = split(token)?;

    let decoded = Base64UrlUnpadded::decode_vec(header_enc)
        .map_err(|e| anyhow!("issue decoding header: {e}"))?;
    let header: Header =
        serde_json::from_slice(&decoded).map_err(|e| anyhow!("issue deserializing header: {e}"))?;
    let decoded = Base64UrlUnpadded::decode_vec(claims_enc)
        .map_err(|e| anyhow!("issue decoding claims: {e}"))?;
    let claims =
        serde_json::from_slice(&decoded).map_err(|e| anyhow!("issue deserializing claims: {e}"))?;

    Ok(Jwt { header, claims })
}

/// Verify the signature of a compact JWS using the provided Ed25519 JWK.
///
/// # Errors
///
/// Returns an error if the token is malformed, the header does not declare
/// `EdDSA`, the key is not an Ed25519 key, or the signature does not verify.
pub fn verify(token: &str, jwk: &Jwk) -> anyhow::Result<()> {
    let jwt: Jwt<serde_json::Value> = decode(token)?;
    if jwt.header.alg != Algorithm::EdDSA {
        bail!("unsupported algorithm: {}", jwt.header.alg);
    }
    if jwk.kty != "OKP" || jwk.crv.as_deref() != Some("Ed25519") {
        bail!("key is not an Ed25519 key");
    }

    let x = Base64UrlUnpadded::decode_vec(&jwk.x).map_err(|e| anyhow!("invalid key: {e}"))?;
    let bytes: [u8; 32] = x.try_into().map_err(|_| anyhow!("invalid key length"))?;
    let verifying_key = VerifyingKey::from_bytes(&bytes)?;

    let (header_enc, claims_enc, sig_enc) = split(token)?;
    let sig = Base64UrlUnpadded::decode_vec(sig_enc)
        .map_err(|e| anyhow!("issue decoding signature: {e}"))?;
    let signature = Signature::from_slice(&sig)?;

    verifying_key
        .verify(format!("{header_enc}.{claims_enc}").as_bytes(), &signature)
        .map_err(|e| anyhow!("signature does not verify: {e}"))
}

fn split(token: &str) -> anyhow::Result<(&str, &str, &str)> {
    let parts = token.split('.').collect::<Vec<&str>>();
    if parts.len() != 3 {
        bail!("invalid Compact JWS format");
    }
    Ok((parts[0], parts[1], parts[2]))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::test_utils::keystore::Keystore;

    #[tokio::test]
    async fn encode_then_verify() {
        let keystore = Keystore::new();
        let claims = json!({"sub": "did:example:alice", "file_id": "1234"});

        let token = encode(Type::Proof, &claims, &keystore).await.expect("should encode");
        let jwt: Jwt<Value> = decode(&token).expect("should decode");

        assert_eq!(jwt.header.alg, Algorithm::EdDSA);
        assert_eq!(jwt.header.typ, Type::Proof);
        assert_eq!(jwt.claims, claims);
        verify(&token, &keystore.jwk()).expect("should verify");
    }

    #[tokio::test]
    async fn tampered_claims() {
        let keystore = Keystore::new();
        let token =
            encode(Type::Jwt, &json!({"nonce": "abc"}), &keystore).await.expect("should encode");

        let parts: Vec<&str> = token.split('.').collect();
        let forged = Base64UrlUnpadded::encode_string(br#"{"nonce":"xyz"}"#);
        let tampered = format!("{}.{forged}.{}", parts[0], parts[2]);

        assert!(verify(&tampered, &keystore.jwk()).is_err());
    }

    #[test]
    fn malformed() {
        assert!(decode::<Value>("not-a-jwt").is_err());
        assert!(decode::<Value>("a.b.c").is_err());
    }
}
