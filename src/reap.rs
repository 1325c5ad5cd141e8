//! # Expiry Reaper
//!
//! A single sweep over the registry and the session store. Files past the
//! retention window are marked `Expired`, their bytes deleted, then their
//! record purged. Pending sessions past their window become `Expired`, and
//! terminal sessions are purged once they are a retention window past
//! expiry.
//!
//! Each record is locked only while it is being reaped. A file whose bytes
//! cannot be deleted stays `Expired` and is picked up again by the next
//! sweep. Sweeping twice with no time elapsed changes nothing.

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::model::{FileStatus, SessionStatus};
use crate::provider::{BlobStore, Clock, Provider};
use crate::types::ReapReport;
use crate::{registry, session, Result};

// Outcome of reaping a single file.
enum Reaped {
    Live,
    Removed,
    Retained,
}

impl<P: Provider> Endpoint<P> {
    /// Run one expiry sweep.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` only if the stores cannot be listed.
    /// Failures on individual records are logged and counted.
    #[instrument(level = "debug", skip(self))]
    pub async fn reap(&self) -> Result<ReapReport> {
        tracing::debug!("reap::process");

        let now = Clock::now(&self.provider);
        let mut report = ReapReport::default();

        for file_id in registry::ids(&self.provider).await? {
            match self.reap_file(&file_id, now).await {
                Ok(Reaped::Live) => {}
                Ok(Reaped::Removed) => report.files_removed += 1,
                Ok(Reaped::Retained) => report.files_retained += 1,
                Err(e) => {
                    tracing::error!("issue reaping file {file_id}: {e}");
                    report.files_retained += 1;
                }
            }
        }

        for token in session::tokens(&self.provider).await? {
            if let Err(e) = self.reap_session(&token, now, &mut report).await {
                tracing::error!("issue reaping session: {e}");
            }
        }

        self.locks.prune();

        if report != ReapReport::default() {
            tracing::info!(
                files_removed = report.files_removed,
                files_retained = report.files_retained,
                sessions_expired = report.sessions_expired,
                sessions_purged = report.sessions_purged,
                "reaped"
            );
        }
        Ok(report)
    }

    async fn reap_file(&self, file_id: &str, now: DateTime<Utc>) -> Result<Reaped> {
        let _guard = self.lock_file(file_id).await;

        let Some(mut record) = registry::get(&self.provider, file_id).await? else {
            return Ok(Reaped::Live);
        };
        if record.status != FileStatus::Expired {
            if !record.is_expired(now, self.config.retention) {
                return Ok(Reaped::Live);
            }
            record.status = FileStatus::Expired;
            registry::put(&self.provider, &record, self.config.retention).await?;
        }

        match BlobStore::delete(&self.provider, &record.stored_path).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("blob for file {file_id} was already missing"),
            Err(e) => {
                tracing::error!("issue deleting blob for file {file_id}: {e}");
                return Ok(Reaped::Retained);
            }
        }

        registry::purge(&self.provider, file_id).await?;
        Ok(Reaped::Removed)
    }

    async fn reap_session(
        &self, token: &str, now: DateTime<Utc>, report: &mut ReapReport,
    ) -> Result<()> {
        let _guard = self.lock_session(token).await;

        let Some(mut session) = session::get(&self.provider, token).await? else {
            return Ok(());
        };

        if session.status == SessionStatus::Pending {
            if !session.is_expired(now) {
                return Ok(());
            }
            session.status = SessionStatus::Expired;
            session::put(&self.provider, &session, self.config.retention).await?;
            report.sessions_expired += 1;
        }

        if now > session.expires_at + self.config.retention {
            session::purge(&self.provider, token).await?;
            report.sessions_purged += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::config::Config;
    use crate::test_utils::Provider as TestProvider;

    #[tokio::test]
    async fn nothing_to_reap() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        endpoint.upload("a.txt", vec![1, 2, 3]).await.expect("should upload");

        let report = endpoint.reap().await.expect("should reap");
        assert_eq!(report, ReapReport::default());
    }

    #[tokio::test]
    async fn expired_file() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let file_id = endpoint.upload("a.txt", vec![1, 2, 3]).await.expect("should upload").file_id;
        let issued = endpoint.issue_request(&file_id).await.expect("should issue");

        endpoint.provider().clock.advance(TimeDelta::hours(25));
        let report = endpoint.reap().await.expect("should reap");
        assert_eq!(report.files_removed, 1);
        assert_eq!(report.sessions_expired, 1);
        assert_eq!(report.sessions_purged, 1);
        assert!(!endpoint.provider().blobs.contains(&format!("blobs/{file_id}")));
        assert!(registry::get(endpoint.provider(), &file_id).await.expect("should read").is_none());
        let session = session::get(endpoint.provider(), &issued.state).await.expect("should read");
        assert!(session.is_none());
        assert!(endpoint.locks.is_empty());

        let report = endpoint.reap().await.expect("should reap");
        assert_eq!(report, ReapReport::default());
    }

    #[tokio::test]
    async fn failed_delete_is_retried() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let file_id = endpoint.upload("a.txt", vec![1, 2, 3]).await.expect("should upload").file_id;
        endpoint.provider().clock.advance(TimeDelta::hours(25));

        endpoint.provider().blobs.fail_deletes(true);
        let report = endpoint.reap().await.expect("should reap");
        assert_eq!(report.files_retained, 1);
        let record = registry::require(endpoint.provider(), &file_id).await.expect("should exist");
        assert_eq!(record.status, FileStatus::Expired);

        endpoint.provider().blobs.fail_deletes(false);
        let report = endpoint.reap().await.expect("should reap");
        assert_eq!(report.files_removed, 1);
    }
}
