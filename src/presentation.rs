//! # Presentation
//!
//! Decoding of the `vp_token` submitted by a Wallet. A presentation arrives
//! either as a compact JWT (`jwt_vp`) or as a JSON Verifiable Presentation
//! carrying a Linked Data proof (`ldp_vp`).
//!
//! Decoding extracts the holder, the echoed nonce and any asserted
//! attributes. It does not check signatures.

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Kind;
use crate::jose;

/// Encoding of a submitted presentation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentationFormat {
    /// Compact JWT.
    JwtVp,

    /// JSON object with an embedded proof.
    LdpVp,
}

/// A decoded, not yet validated, presentation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Presentation {
    /// How the presentation was encoded.
    pub format: PresentationFormat,

    /// The presentation as submitted.
    pub token: Kind<Map<String, Value>>,

    /// Holder identifier (JWT `iss`, or the VP `holder`).
    pub holder: String,

    /// Nonce echoed by the holder (JWT `nonce`, or `proof.challenge`).
    /// Empty when absent.
    pub nonce: String,

    /// The presentation body: JWT claims or the JSON VP itself.
    pub claims: Map<String, Value>,
}

impl Presentation {
    /// Decode a `vp_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or does not name a
    /// holder.
    pub fn decode(token: &Kind<Map<String, Value>>) -> anyhow::Result<Self> {
        match token {
            Kind::String(jwt) => {
                let decoded = jose::decode::<Map<String, Value>>(jwt)?;
                let claims = decoded.claims;

                let holder = string_at(&claims, &["iss"])
                    .or_else(|| string_at(&claims, &["sub"]))
                    .or_else(|| string_at(&claims, &["vp", "holder"]))
                    .ok_or_else(|| anyhow!("presentation has no holder"))?;
                let nonce = string_at(&claims, &["nonce"]).unwrap_or_default();

                Ok(Self {
                    format: PresentationFormat::JwtVp,
                    token: token.clone(),
                    holder,
                    nonce,
                    claims,
                })
            }
            Kind::Object(vp) => {
                if !vp.contains_key("type") && !vp.contains_key("verifiableCredential") {
                    bail!("object is not a verifiable presentation");
                }
                let holder = string_at(vp, &["holder"])
                    .ok_or_else(|| anyhow!("presentation has no holder"))?;
                let nonce = proof_challenge(vp).unwrap_or_default();

                Ok(Self {
                    format: PresentationFormat::LdpVp,
                    token: token.clone(),
                    holder,
                    nonce,
                    claims: vp.clone(),
                })
            }
        }
    }

    /// Credential subject attributes asserted by the presentation's
    /// credentials, merged in order. Subject `id`s are omitted.
    #[must_use]
    pub fn attributes(&self) -> Map<String, Value> {
        let credentials = match self.format {
            PresentationFormat::JwtVp => {
                self.claims.get("vp").and_then(|vp| vp.get("verifiableCredential"))
            }
            PresentationFormat::LdpVp => self.claims.get("verifiableCredential"),
        };

        let mut attributes = Map::new();
        for credential in as_list(credentials) {
            let subject = match credential {
                Value::Object(vc) => vc.get("credentialSubject").cloned(),
                Value::String(jwt) => jose::decode::<Value>(jwt).ok().and_then(|decoded| {
                    decoded.claims.get("vc")?.get("credentialSubject").cloned()
                }),
                _ => None,
            };
            if let Some(Value::Object(subject)) = subject {
                for (key, value) in subject {
                    if key != "id" {
                        attributes.insert(key, value);
                    }
                }
            }
        }
        attributes
    }
}

fn string_at(map: &Map<String, Value>, path: &[&str]) -> Option<String> {
    let (first, rest) = path.split_first()?;
    let mut value = map.get(*first)?;
    for key in rest {
        value = value.get(*key)?;
    }
    value.as_str().map(ToString::to_string)
}

// `proof` may be a single object or a set.
fn proof_challenge(vp: &Map<String, Value>) -> Option<String> {
    as_list(vp.get("proof"))
        .find_map(|proof| proof.get("challenge").and_then(Value::as_str))
        .map(ToString::to_string)
}

fn as_list(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => vec![],
    };
    items.into_iter()
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Kind<Map<String, Value>> {
        Kind::Object(value.as_object().cloned().unwrap_or_default())
    }

    fn unsigned_jwt(claims: &Value) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"EdDSA","typ":"JWT"}"#);
        let claims = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        format!("{header}.{claims}.c2ln")
    }

    #[test]
    fn json_vp() {
        let vp = object(json!({
            "type": ["VerifiablePresentation"],
            "holder": "did:example:alice",
            "verifiableCredential": [{
                "type": ["VerifiableCredential", "SwissEID"],
                "credentialSubject": {"id": "did:example:alice", "givenName": "Alice"}
            }],
            "proof": {"type": "Ed25519Signature2020", "challenge": "n-123"}
        }));

        let presentation = Presentation::decode(&vp).expect("should decode");
        assert_eq!(presentation.format, PresentationFormat::LdpVp);
        assert_eq!(presentation.holder, "did:example:alice");
        assert_eq!(presentation.nonce, "n-123");
        assert_eq!(Value::Object(presentation.attributes()), json!({"givenName": "Alice"}));
    }

    #[test]
    fn jwt_vp() {
        let token = unsigned_jwt(&json!({
            "iss": "did:example:alice",
            "nonce": "n-123",
            "vp": {"verifiableCredential": [{"credentialSubject": {"familyName": "Liddell"}}]}
        }));

        let presentation = Presentation::decode(&Kind::String(token)).expect("should decode");
        assert_eq!(presentation.format, PresentationFormat::JwtVp);
        assert_eq!(presentation.holder, "did:example:alice");
        assert_eq!(presentation.nonce, "n-123");
        assert_eq!(presentation.attributes()["familyName"], "Liddell");
    }

    #[test]
    fn missing_nonce_is_empty() {
        let token = unsigned_jwt(&json!({"iss": "did:example:alice"}));
        let presentation = Presentation::decode(&Kind::String(token)).expect("should decode");
        assert!(presentation.nonce.is_empty());
    }

    #[test]
    fn malformed() {
        assert!(Presentation::decode(&Kind::String("garbage".into())).is_err());
        assert!(Presentation::decode(&object(json!({"holder": "did:example:alice"}))).is_err());
        assert!(Presentation::decode(&object(json!({"type": ["VerifiablePresentation"]}))).is_err());
    }
}
