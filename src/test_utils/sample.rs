//! Sample presentations, as a Wallet would submit them.

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::keystore::Keystore;
use crate::core::Kind;
use crate::jose::{self, Type};
use crate::types::ResponseRequest;

pub const CREDENTIAL_TYPE: &str = "SwissEID";

/// A JSON (`ldp_vp`) presentation asserting `holder` and echoing `nonce`.
#[must_use]
pub fn json_vp(holder: &str, nonce: &str) -> Kind<Map<String, Value>> {
    let vp = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiablePresentation"],
        "holder": holder,
        "verifiableCredential": [{
            "type": ["VerifiableCredential", CREDENTIAL_TYPE],
            "issuer": "did:example:government",
            "credentialSubject": {
                "id": holder,
                "givenName": "Alice",
                "familyName": "Liddell"
            }
        }],
        "proof": {
            "type": "Ed25519Signature2020",
            "created": Utc::now().to_rfc3339(),
            "challenge": nonce,
            "proofPurpose": "authentication",
            "verificationMethod": format!("{holder}#key-0")
        }
    });
    Kind::Object(vp.as_object().cloned().unwrap_or_default())
}

/// A JWT (`jwt_vp`) presentation signed by `wallet`, echoing `nonce`.
pub async fn jwt_vp(wallet: &Keystore, nonce: &str) -> Kind<Map<String, Value>> {
    let did = wallet.did();
    let claims = json!({
        "iss": did,
        "sub": did,
        "iat": Utc::now().timestamp(),
        "nonce": nonce,
        "vp": {
            "type": ["VerifiablePresentation"],
            "holder": did,
            "verifiableCredential": [{
                "type": ["VerifiableCredential", CREDENTIAL_TYPE],
                "credentialSubject": {"givenName": "Alice"}
            }]
        }
    });
    signed_vp(wallet, &claims).await
}

/// Sign arbitrary presentation claims as `wallet`.
pub async fn signed_vp(wallet: &Keystore, claims: &Value) -> Kind<Map<String, Value>> {
    let token = jose::encode(Type::Jwt, claims, wallet).await.expect("should encode");
    Kind::String(token)
}

/// Wrap a presentation in an Authorization Response for `state`.
#[must_use]
pub fn response(state: &str, vp_token: Kind<Map<String, Value>>) -> ResponseRequest {
    ResponseRequest {
        vp_token: Some(vp_token),
        presentation_submission: None,
        state: Some(state.to_string()),
    }
}
