//! # Generate
//!
//! Generate random strings for use as session state, nonce, and signature
//! identifiers.
//!
//! Values are drawn from the thread-local CSPRNG (seeded from the operating
//! system) so they are unguessable and, at 256 bits, never repeat in
//! practice.

use base64ct::{Base64UrlUnpadded, Encoding};
use uuid::Uuid;

const RANDOM_LEN: usize = 32;

/// Generates a base64url encoded random string for the correlation `state`
/// (session token).
#[must_use]
pub fn state_key() -> String {
    random_string()
}

/// Generates a base64url encoded random string for the anti-replay nonce.
#[must_use]
pub fn nonce() -> String {
    random_string()
}

/// Generates a unique identifier for an uploaded file.
#[must_use]
pub fn file_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a unique identifier for a Presentation Definition.
#[must_use]
pub fn definition_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a unique identifier (`jti`) for a signature record.
#[must_use]
pub fn signature_id() -> String {
    Uuid::new_v4().to_string()
}

fn random_string() -> String {
    let bytes: [u8; RANDOM_LEN] = rand::random();
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn values_are_distinct() {
        let values: HashSet<String> = (0..1000).map(|_| nonce()).collect();
        assert_eq!(values.len(), 1000);
        assert_ne!(state_key(), state_key());
    }

    #[test]
    fn nonce_is_url_safe() {
        let nonce = nonce();
        assert_eq!(nonce.len(), 43);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
