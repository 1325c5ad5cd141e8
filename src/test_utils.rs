//! # Test Utilities for Vercre Sign
//!
//! In-memory provider trait implementations that can be used for testing
//! and examples.

#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod keystore;
pub mod sample;
pub mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};

use anyhow::bail;
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use self::keystore::Keystore;
use crate::provider::{
    self, Algorithm, BlobStore, Clock, CredentialValidator, Notifier, Result, Signer, StateStore,
};
use crate::types::Presentation;
use crate::validator::DidJwkValidator;

// initalise tracing once for all tests
static INIT: Once = Once::new();

/// Initialise tracing for tests.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

/// In-memory provider.
#[derive(Clone, Debug)]
pub struct Provider {
    pub state: store::State,
    pub blobs: store::Blobs,
    pub keystore: Keystore,
    pub validator: Validator,
    pub notifier: Outbox,
    pub clock: TestClock,
}

impl Provider {
    /// A provider whose validator accepts every presentation.
    #[must_use]
    pub fn new() -> Self {
        Self::with_validator(Validator::accept())
    }

    #[must_use]
    pub fn with_validator(validator: Validator) -> Self {
        Self {
            state: store::State::new(),
            blobs: store::Blobs::new(),
            keystore: Keystore::service(),
            validator,
            notifier: Outbox::default(),
            clock: TestClock::default(),
        }
    }
}

impl provider::Provider for Provider {}

impl StateStore for Provider {
    async fn put(&self, key: &str, state: impl Serialize + Send, dt: DateTime<Utc>) -> Result<()> {
        self.state.put(key, state, dt)
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.state.get(key)
    }

    async fn purge(&self, key: &str) -> Result<()> {
        self.state.purge(key)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.state.keys(prefix))
    }
}

impl BlobStore for Provider {
    type Reader = std::io::Cursor<Vec<u8>>;

    async fn store(&self, file_id: &str, bytes: Vec<u8>) -> Result<String> {
        self.blobs.store(file_id, bytes)
    }

    async fn read(&self, handle: &str) -> Result<Self::Reader> {
        self.blobs.read(handle)
    }

    async fn delete(&self, handle: &str) -> Result<bool> {
        self.blobs.delete(handle)
    }
}

impl CredentialValidator for Provider {
    async fn validate(&self, presentation: &Presentation) -> Result<()> {
        self.validator.validate(presentation).await
    }
}

impl Signer for Provider {
    fn algorithm(&self) -> Algorithm {
        self.keystore.algorithm()
    }

    async fn verification_method(&self) -> Result<String> {
        self.keystore.verification_method().await
    }

    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        self.keystore.try_sign(msg).await
    }
}

impl Notifier for Provider {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        self.notifier.send(recipient, message)
    }
}

impl Clock for Provider {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Configurable credential check.
#[derive(Clone, Debug)]
pub enum Validator {
    /// Accept every presentation.
    Accept,

    /// Reject every presentation with the given reason.
    Reject(String),

    /// Verify JWT presentations signed with a `did:jwk` key.
    DidJwk(DidJwkValidator),
}

impl Validator {
    #[must_use]
    pub const fn accept() -> Self {
        Self::Accept
    }

    #[must_use]
    pub fn reject(reason: &str) -> Self {
        Self::Reject(reason.to_string())
    }

    async fn validate(&self, presentation: &Presentation) -> Result<()> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(reason) => bail!("{reason}"),
            Self::DidJwk(validator) => validator.validate(presentation).await,
        }
    }
}

/// Records every notification sent, optionally failing delivery.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl Outbox {
    fn send(&self, recipient: &str, message: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("gateway unavailable");
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }

    /// Make subsequent deliveries fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered so far, as `(recipient, message)`.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Wall clock shifted by an adjustable offset.
#[derive(Clone, Debug, Default)]
pub struct TestClock {
    offset: Arc<Mutex<TimeDelta>>,
}

impl TestClock {
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += delta;
    }
}
