//! Ed25519 keys for the service signer and for test wallets.

use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::{Signer as _, SigningKey};

use crate::jose::{Algorithm, Jwk};
use crate::provider::{Result, Signer};

const SERVICE_SECRET: &str = "cCxmHfFfIJvP74oNKjAuRC3zYoDMo0pFsAs19yKMowY";

/// An Ed25519 key identified by its `did:jwk`.
#[derive(Clone, Debug)]
pub struct Keystore {
    signing_key: SigningKey,
}

impl Default for Keystore {
    fn default() -> Self {
        Self::new()
    }
}

impl Keystore {
    /// A fresh random key, e.g. for a holder's wallet.
    #[must_use]
    pub fn new() -> Self {
        let secret: [u8; 32] = rand::random();
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// The fixed key used by the test service to sign proofs.
    #[must_use]
    pub fn service() -> Self {
        let decoded = Base64UrlUnpadded::decode_vec(SERVICE_SECRET).expect("should decode");
        let secret: [u8; 32] = decoded.as_slice().try_into().expect("should convert");
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// A key from a stored 32-byte Ed25519 secret.
    #[must_use]
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// The 32-byte secret, for persisting the key.
    #[must_use]
    pub fn secret(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Public key as a JWK.
    #[must_use]
    pub fn jwk(&self) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            x: Base64UrlUnpadded::encode_string(self.signing_key.verifying_key().as_bytes()),
            use_: Some("sig".to_string()),
        }
    }

    /// `did:jwk` identifying the key.
    #[must_use]
    pub fn did(&self) -> String {
        let jwk = serde_json::to_vec(&self.jwk()).expect("should serialize");
        format!("did:jwk:{}", Base64UrlUnpadded::encode_string(&jwk))
    }

    #[must_use]
    pub fn kid(&self) -> String {
        format!("{}#0", self.did())
    }

    #[must_use]
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing_key.sign(msg).to_bytes().to_vec()
    }
}

impl Signer for Keystore {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    async fn verification_method(&self) -> Result<String> {
        Ok(self.kid())
    }

    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        Ok(self.sign(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_restores_key() {
        let key = Keystore::new();
        let restored = Keystore::from_secret(&key.secret());
        assert_eq!(restored.did(), key.did());
        assert_ne!(key.did(), Keystore::service().did());
    }
}
