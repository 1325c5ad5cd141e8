//! # Core Utilities for Vercre Sign
//!
//! Shared helpers used across the signing lifecycle: random value
//! generation, string handling, and serde support for binary values.

pub mod generate;
pub mod strings;

use serde::{Deserialize, Serialize};

/// `Kind` allows serde to serialize/deserialize a string or an object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Kind<T> {
    /// Simple string value
    String(String),

    /// Complex object value
    Object(T),
}

impl<T: Default> Default for Kind<T> {
    fn default() -> Self {
        Self::String(String::new())
    }
}

impl<T> Kind<T> {
    /// Returns `true` if the value is a string.
    pub const fn is_string(&self) -> bool {
        match self {
            Self::String(_) => true,
            Self::Object(_) => false,
        }
    }

    /// Returns `true` if the value is an object.
    pub const fn is_object(&self) -> bool {
        match self {
            Self::String(_) => false,
            Self::Object(_) => true,
        }
    }
}

/// Serialize and deserialize byte vectors as standard, padded base64.
pub mod base64 {
    use base64ct::{Base64, Encoding};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the string cannot be written.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    /// Deserialize bytes from a base64 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a string or is not valid base64.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(|e| D::Error::custom(format!("invalid base64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn kind_untagged() {
        let kind: Kind<Value> = serde_json::from_value(json!("eyJ.etc")).expect("should parse");
        assert!(kind.is_string());

        let kind: Kind<Value> =
            serde_json::from_value(json!({"holder": "did:example:alice"})).expect("should parse");
        assert!(kind.is_object());
    }
}
