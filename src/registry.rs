//! # File Registry
//!
//! Typed access to [`FileRecord`]s held in the [`StateStore`]. Records are
//! stored as JSON under `file:<id>`.

use chrono::TimeDelta;

use crate::model::FileRecord;
use crate::provider::StateStore;
use crate::{Error, Result};

/// Key prefix for file records.
pub const PREFIX: &str = "file:";

/// State store key for a file.
#[must_use]
pub fn key(file_id: &str) -> String {
    format!("{PREFIX}{file_id}")
}

/// Load a file record, if one exists.
pub(crate) async fn get(store: &impl StateStore, file_id: &str) -> Result<Option<FileRecord>> {
    store
        .get::<FileRecord>(&key(file_id))
        .await
        .map_err(|e| Error::StorageFailure(format!("issue reading file {file_id}: {e}")))
}

/// Load a file record, failing with `FileNotFound` if there is none.
pub(crate) async fn require(store: &impl StateStore, file_id: &str) -> Result<FileRecord> {
    get(store, file_id).await?.ok_or_else(|| Error::FileNotFound(format!("no file {file_id}")))
}

/// Persist a file record.
///
/// The store may expunge the record once twice the retention window has
/// passed, giving the reaper a full window to remove the bytes first.
pub(crate) async fn put(
    store: &impl StateStore, record: &FileRecord, retention: TimeDelta,
) -> Result<()> {
    let expiry = record.uploaded_at + retention + retention;
    store
        .put(&key(&record.id), record, expiry)
        .await
        .map_err(|e| Error::StorageFailure(format!("issue saving file {}: {e}", record.id)))
}

/// Remove a file record.
pub(crate) async fn purge(store: &impl StateStore, file_id: &str) -> Result<()> {
    store
        .purge(&key(file_id))
        .await
        .map_err(|e| Error::StorageFailure(format!("issue removing file {file_id}: {e}")))
}

/// Ids of every stored file.
pub(crate) async fn ids(store: &impl StateStore) -> Result<Vec<String>> {
    let keys = store
        .keys(PREFIX)
        .await
        .map_err(|e| Error::StorageFailure(format!("issue listing files: {e}")))?;
    Ok(keys.iter().filter_map(|k| k.strip_prefix(PREFIX)).map(ToString::to_string).collect())
}
