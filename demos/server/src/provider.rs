use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::fs::{self, File};
use tokio::sync::Mutex;
use vercre_sign::provider::{
    Algorithm, BlobStore, Clock, CredentialValidator, Notifier, Result, Signer, StateStore,
};
use vercre_sign::test_utils::keystore::Keystore;
use vercre_sign::types::Presentation;
use vercre_sign::validator::DidJwkValidator;

#[derive(Clone, Debug)]
pub struct Provider {
    state: JsonFile,
    uploads: PathBuf,
    keystore: Keystore,
    validator: DidJwkValidator,
}

impl Provider {
    pub async fn new(
        data_dir: PathBuf, credential_type: &str, client_id: &str,
    ) -> anyhow::Result<Self> {
        let uploads = data_dir.join("uploads");
        fs::create_dir_all(&uploads).await?;

        Ok(Self {
            state: JsonFile::open(data_dir.join("state.json")).await?,
            uploads,
            keystore: load_keystore(&data_dir.join("signing.key")).await?,
            validator: DidJwkValidator::new()
                .with_credential_type(credential_type)
                .with_audience(client_id),
        })
    }
}

// The proof signing key lives in the data directory and is created on first
// start. It must never be one of the fixed test keys.
async fn load_keystore(path: &Path) -> anyhow::Result<Keystore> {
    match fs::read(path).await {
        Ok(bytes) => {
            let secret: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("{} is not a 32-byte key", path.display()))?;
            Ok(Keystore::from_secret(&secret))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let keystore = Keystore::new();
            fs::write(path, keystore.secret()).await?;
            tracing::info!("created signing key {}", path.display());
            Ok(keystore)
        }
        Err(e) => Err(e.into()),
    }
}

impl vercre_sign::provider::Provider for Provider {}

impl StateStore for Provider {
    async fn put(&self, key: &str, state: impl Serialize + Send, _: DateTime<Utc>) -> Result<()> {
        self.state.put(key, serde_json::to_value(state)?).await
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.state.get(key).await else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn purge(&self, key: &str) -> Result<()> {
        self.state.purge(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.state.keys(prefix).await)
    }
}

impl BlobStore for Provider {
    type Reader = File;

    async fn store(&self, file_id: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.uploads.join(file_id);
        fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn read(&self, handle: &str) -> Result<Self::Reader> {
        Ok(File::open(handle).await?)
    }

    async fn delete(&self, handle: &str) -> Result<bool> {
        match fs::remove_file(handle).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
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

// Link delivery is logged rather than sent.
impl Notifier for Provider {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        tracing::info!(recipient, "{message}");
        Ok(())
    }
}

impl Clock for Provider {}

/// State held in memory and written through to a JSON file.
#[derive(Clone, Debug)]
struct JsonFile {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl JsonFile {
    async fn open(path: PathBuf) -> anyhow::Result<Self> {
        let entries = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    // Changes are flushed from a copy and only become visible once durable.
    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value);
        self.flush(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn purge(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Vec<String> {
        let entries = self.entries.lock().await;
        entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect()
    }

    async fn flush(&self, entries: &HashMap<String, Value>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn failed_flush_leaves_state_unchanged() {
        let dir = tempfile::tempdir().expect("should create dir");
        let state = JsonFile::open(dir.path().join("state.json")).await.expect("should open");
        state.put("file:1", json!({"status": "uploaded"})).await.expect("should put");

        fs::remove_dir_all(dir.path()).await.expect("should remove dir");

        assert!(state.put("file:1", json!({"status": "signed"})).await.is_err());
        assert_eq!(state.get("file:1").await, Some(json!({"status": "uploaded"})));

        assert!(state.purge("file:1").await.is_err());
        assert_eq!(state.keys("file:").await, vec!["file:1".to_string()]);
    }

    #[tokio::test]
    async fn signing_key_is_persisted() {
        let dir = tempfile::tempdir().expect("should create dir");
        let path = dir.path().join("signing.key");

        let created = load_keystore(&path).await.expect("should create key");
        let loaded = load_keystore(&path).await.expect("should load key");
        assert_eq!(created.did(), loaded.did());
        assert_ne!(created.did(), Keystore::service().did());
    }

    #[tokio::test]
    async fn reopen_reads_flushed_state() {
        let dir = tempfile::tempdir().expect("should create dir");
        let path = dir.path().join("state.json");

        let state = JsonFile::open(path.clone()).await.expect("should open");
        state.put("session:a", json!({"status": "pending"})).await.expect("should put");
        state.put("session:b", json!({"status": "pending"})).await.expect("should put");
        state.purge("session:a").await.expect("should purge");

        let reopened = JsonFile::open(path).await.expect("should reopen");
        assert_eq!(reopened.keys("session:").await, vec!["session:b".to_string()]);
    }
}
