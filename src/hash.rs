//! # Hash Engine
//!
//! Content addressing for uploaded files. The digest of a file is computed
//! once at upload and again whenever a signature is produced or checked;
//! the two values must be byte-for-byte equal.
//!
//! Input is streamed through a fixed-size buffer so arbitrarily large files
//! are never held in memory at once.

use std::fmt::{self, Display};

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the buffer used to stream file content through the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Supported content hash algorithms.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256 (FIPS 180-4).
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// A fixed-length content digest, tagged with the algorithm that produced
/// it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Digest {
    /// Algorithm used to compute the digest.
    pub algorithm: HashAlgorithm,

    /// Raw digest bytes, serialized as base64.
    #[serde(with = "crate::core::base64")]
    pub value: Vec<u8>,
}

impl Digest {
    /// The digest value as a standard base64 string.
    #[must_use]
    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.value)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_base64())
    }
}

/// Compute the SHA-256 digest of everything readable from `reader`.
///
/// # Errors
///
/// Returns an error if reading from the underlying source fails.
pub async fn digest<R>(mut reader: R) -> std::io::Result<Digest>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0_u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Digest {
        algorithm: HashAlgorithm::Sha256,
        value: hasher.finalize().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn known_vector() {
        let digest = digest(Cursor::new(b"abc".to_vec())).await.expect("should hash");
        assert_eq!(digest.value.len(), 32);
        assert_eq!(digest.to_base64(), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
    }

    #[tokio::test]
    async fn multi_chunk_input() {
        let bytes: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = digest(Cursor::new(bytes.clone())).await.expect("should hash");
        let direct = Sha256::digest(&bytes).to_vec();
        assert_eq!(streamed.value, direct);
    }

    #[tokio::test]
    async fn single_byte_change() {
        let mut bytes = vec![7_u8; 10 * 1024];
        let before = digest(Cursor::new(bytes.clone())).await.expect("should hash");
        bytes[5000] ^= 1;
        let after = digest(Cursor::new(bytes)).await.expect("should hash");
        assert_ne!(before, after);
    }

    #[test]
    fn digest_round_trip() {
        let digest = Digest {
            algorithm: HashAlgorithm::Sha256,
            value: vec![1, 2, 3, 4],
        };
        let json = serde_json::to_value(&digest).expect("should serialize");
        assert_eq!(json["algorithm"], "SHA-256");
        assert_eq!(json["value"], "AQIDBA==");
        let back: Digest = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(back, digest);
    }
}
