//! # Provider
//!
//! Capabilities the signing service consumes. Implementers supply a single
//! type implementing [`Provider`] and the library drives every lifecycle
//! step through it.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncRead;

pub use crate::jose::Algorithm;
use crate::types::Presentation;

/// Result is used for all external errors.
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Signing service Provider trait.
pub trait Provider:
    StateStore + BlobStore + CredentialValidator + Signer + Notifier + Clock + Clone
{
}

/// `StateStore` is used to store and retrieve file records and sessions.
pub trait StateStore: Send + Sync {
    /// Store state using the provided key. The expiry parameter indicates
    /// when data can be expunged from the state store.
    fn put(
        &self, key: &str, state: impl Serialize + Send, expiry: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve data using the provided key. Returns `None` when nothing is
    /// stored under the key.
    fn get<T: DeserializeOwned>(
        &self, key: &str,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Remove data using the key provided.
    fn purge(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// List every key starting with `prefix`.
    fn keys(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// `BlobStore` holds the raw bytes of uploaded files.
pub trait BlobStore: Send + Sync {
    /// Reader returned for stored content.
    type Reader: AsyncRead + Unpin + Send;

    /// Store the bytes for the file, returning an opaque handle used for
    /// subsequent reads and deletes.
    fn store(&self, file_id: &str, bytes: Vec<u8>)
        -> impl Future<Output = Result<String>> + Send;

    /// Open the stored content for reading.
    fn read(&self, handle: &str) -> impl Future<Output = Result<Self::Reader>> + Send;

    /// Delete the stored content. Returns `false` when nothing was stored
    /// under the handle.
    fn delete(&self, handle: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// `CredentialValidator` decides whether a presentation is trustworthy.
///
/// Decoding a presentation says nothing about its authenticity: signature,
/// issuer trust and revocation checks all belong here.
pub trait CredentialValidator: Send + Sync {
    /// Validate the presentation, returning an error describing why it was
    /// rejected.
    fn validate(&self, presentation: &Presentation) -> impl Future<Output = Result<()>> + Send;
}

/// `Signer` produces the proof over a signature record.
pub trait Signer: Send + Sync {
    /// Algorithm used to sign.
    fn algorithm(&self) -> Algorithm;

    /// The verification method (key id) a verifier uses to resolve the
    /// public key.
    fn verification_method(&self) -> impl Future<Output = Result<String>> + Send;

    /// Sign the message, returning the raw signature bytes.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// `Notifier` delivers share links to a recipient. Delivery is best-effort.
pub trait Notifier: Send + Sync {
    /// Send `message` to `recipient`.
    fn notify(&self, recipient: &str, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// `Clock` supplies the current time for expiry decisions.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
