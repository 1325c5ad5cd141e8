//! # Upload and Download
//!
//! Files enter the registry through [`Endpoint::upload`]. The content hash is
//! computed by streaming the bytes back from the blob store, so the recorded
//! digest describes exactly what was stored.

use tracing::instrument;

use crate::core::{generate, strings};
use crate::endpoint::Endpoint;
use crate::hash;
use crate::model::{FileRecord, FileStatus};
use crate::provider::{BlobStore, Clock, Provider};
use crate::registry;
use crate::types::{Download, UploadResponse};
use crate::{Error, Result};

impl<P: Provider> Endpoint<P> {
    /// Store an uploaded file and register it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the file is empty or larger than the
    /// configured limit, and `StorageFailure` if the bytes or the record
    /// cannot be stored.
    #[instrument(level = "debug", skip(self, bytes))]
    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        tracing::debug!("upload::verify");

        if bytes.is_empty() {
            return Err(Error::InvalidRequest("file is empty".into()));
        }
        let size_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if size_bytes > self.config.max_upload_bytes {
            return Err(Error::InvalidRequest(format!(
                "file exceeds the {} byte limit",
                self.config.max_upload_bytes
            )));
        }

        tracing::debug!("upload::process");

        let original_name = strings::secure_filename(name);
        let file_id = generate::file_id();

        let stored_path = BlobStore::store(&self.provider, &file_id, bytes)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue storing file: {e}")))?;

        // the bytes must not outlive a failed registration
        let record = match self.register(file_id, original_name, &stored_path, size_bytes).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(delete_err) = BlobStore::delete(&self.provider, &stored_path).await {
                    tracing::error!("issue removing unregistered file {stored_path}: {delete_err}");
                }
                return Err(e);
            }
        };

        Ok(UploadResponse {
            file_id: record.id,
            original_name: record.original_name,
            size_bytes: record.size_bytes,
            content_hash: record.content_hash,
        })
    }

    async fn register(
        &self, file_id: String, original_name: String, stored_path: &str, size_bytes: u64,
    ) -> Result<FileRecord> {
        let reader = BlobStore::read(&self.provider, stored_path)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue reading stored file: {e}")))?;
        let content_hash = hash::digest(reader)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue hashing file: {e}")))?;

        let record = FileRecord {
            id: file_id,
            original_name,
            stored_path: stored_path.to_string(),
            size_bytes,
            uploaded_at: Clock::now(&self.provider),
            content_hash,
            status: FileStatus::Uploaded,
            history: vec![],
        };
        registry::put(&self.provider, &record, self.config.retention).await?;
        Ok(record)
    }

    /// Open a stored file for download.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` for an unknown file, `RetentionExpired` for a
    /// file being removed, and `StorageFailure` if the bytes cannot be read.
    #[instrument(level = "debug", skip(self))]
    pub async fn download(&self, file_id: &str) -> Result<Download<P::Reader>> {
        tracing::debug!("download::process");

        let record = registry::require(&self.provider, file_id).await?;
        if record.status == FileStatus::Expired {
            return Err(Error::RetentionExpired(format!("file {file_id} has expired")));
        }

        let reader = BlobStore::read(&self.provider, &record.stored_path)
            .await
            .map_err(|e| Error::StorageFailure(format!("issue reading file: {e}")))?;

        Ok(Download { record, reader })
    }
}

#[cfg(test)]
mod tests {
    use assert_let_bind::assert_let;

    use super::*;
    use crate::config::Config;
    use crate::test_utils::Provider as TestProvider;

    #[tokio::test]
    async fn upload_hashes_stored_bytes() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());

        let response = endpoint
            .upload("../My Contract.pdf", b"abc".to_vec())
            .await
            .expect("should upload");

        assert_eq!(response.original_name, "My_Contract.pdf");
        assert_eq!(response.size_bytes, 3);
        assert_eq!(response.content_hash.to_base64(), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");

        let record = registry::require(endpoint.provider(), &response.file_id)
            .await
            .expect("should exist");
        assert_eq!(record.status, FileStatus::Uploaded);
    }

    #[tokio::test]
    async fn rejects_empty_and_oversize() {
        let config = Config::builder().max_upload_bytes(4_u64).build().expect("should build");
        let endpoint = Endpoint::new(TestProvider::new(), config);

        let result = endpoint.upload("empty.txt", vec![]).await;
        assert_let!(Err(Error::InvalidRequest(_)), result);

        let result = endpoint.upload("big.txt", vec![0; 5]).await;
        assert_let!(Err(Error::InvalidRequest(_)), result);
    }

    #[tokio::test]
    async fn failed_registration_removes_bytes() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        endpoint.provider().state.fail_writes(true);

        let result = endpoint.upload("contract.pdf", vec![1; 64]).await;
        assert_let!(Err(Error::StorageFailure(_)), result);

        endpoint.provider().state.fail_writes(false);
        assert!(registry::ids(endpoint.provider()).await.expect("should list").is_empty());
        assert!(endpoint.provider().blobs.is_empty());
    }

    #[tokio::test]
    async fn download_unknown() {
        let endpoint = Endpoint::new(TestProvider::new(), Config::default());
        let result = endpoint.download("missing").await;
        assert_let!(Err(Error::FileNotFound(_)), result);
    }
}
