//! # Session Store
//!
//! Typed access to [`Session`]s held in the [`StateStore`], keyed by
//! `session:<token>`.

use chrono::TimeDelta;

use crate::model::Session;
use crate::provider::StateStore;
use crate::{Error, Result};

/// Key prefix for sessions.
pub const PREFIX: &str = "session:";

/// State store key for a session.
#[must_use]
pub fn key(token: &str) -> String {
    format!("{PREFIX}{token}")
}

pub(crate) async fn get(store: &impl StateStore, token: &str) -> Result<Option<Session>> {
    store
        .get::<Session>(&key(token))
        .await
        .map_err(|e| Error::StorageFailure(format!("issue reading session: {e}")))
}

/// The store may expunge a session once it has been terminal for a full
/// retention window.
pub(crate) async fn put(
    store: &impl StateStore, session: &Session, retention: TimeDelta,
) -> Result<()> {
    store
        .put(&key(&session.token), session, session.expires_at + retention)
        .await
        .map_err(|e| Error::StorageFailure(format!("issue saving session: {e}")))
}

pub(crate) async fn purge(store: &impl StateStore, token: &str) -> Result<()> {
    store
        .purge(&key(token))
        .await
        .map_err(|e| Error::StorageFailure(format!("issue removing session: {e}")))
}

pub(crate) async fn tokens(store: &impl StateStore) -> Result<Vec<String>> {
    let keys = store
        .keys(PREFIX)
        .await
        .map_err(|e| Error::StorageFailure(format!("issue listing sessions: {e}")))?;
    Ok(keys.iter().filter_map(|k| k.strip_prefix(PREFIX)).map(ToString::to_string).collect())
}
