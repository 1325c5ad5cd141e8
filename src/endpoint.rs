//! # Endpoint
//!
//! [`Endpoint`] is the entry point to the library. It wraps the host's
//! [`Provider`] together with the service [`Config`] and the per-record locks
//! that make status transitions atomic. Each lifecycle operation is
//! implemented in its own module as a method on `Endpoint`.

use crate::config::Config;
use crate::lock::{Guard, Locks};
use crate::provider::Provider;
use crate::{registry, session};

/// Endpoint is used to surface the public signing service API.
#[derive(Clone, Debug)]
pub struct Endpoint<P> {
    pub(crate) provider: P,
    pub(crate) config: Config,
    pub(crate) locks: Locks,
}

impl<P: Provider> Endpoint<P> {
    /// Create a new endpoint from the host's provider and configuration.
    pub fn new(provider: P, config: Config) -> Self {
        Self {
            provider,
            config,
            locks: Locks::new(),
        }
    }

    /// The provider the endpoint was created with.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// The endpoint configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) async fn lock_file(&self, file_id: &str) -> Guard {
        self.locks.acquire(&registry::key(file_id)).await
    }

    pub(crate) async fn lock_session(&self, token: &str) -> Guard {
        self.locks.acquire(&session::key(token)).await
    }
}
