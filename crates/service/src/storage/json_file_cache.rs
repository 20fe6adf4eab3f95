use std::{collections::HashMap, io::ErrorKind, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs, sync::RwLock};
use tracing::warn;

use crate::errors::StoreError;
use crate::storage::cache::LocalCache;

/// JSON file-backed cache: one file holding `key -> snapshot` for every collection.
#[derive(Clone)]
pub struct JsonFileCache {
    inner: Arc<RwLock<HashMap<String, Value>>>,
    file_path: PathBuf,
}

impl JsonFileCache {
    /// Open the cache at `path`. Creates the file with an empty map if missing;
    /// an unparsable file is treated as empty. Any other I/O failure is an
    /// error and leaves the file alone.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::Cache(e.to_string()))?;
        }

        let map: HashMap<String, Value> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %file_path.display(), error = %e, "local cache file unreadable; starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty: HashMap<String, Value> = HashMap::new();
                fs::write(&file_path, serde_json::to_vec(&empty)?)
                    .await
                    .map_err(|e| StoreError::Cache(e.to_string()))?;
                empty
            }
            Err(e) => return Err(StoreError::Cache(format!("{}: {e}", file_path.display()))),
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

    async fn save(&self, map: &HashMap<String, Value>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(map)?;
        fs::write(&self.file_path, data).await.map_err(|e| StoreError::Cache(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl LocalCache for JsonFileCache {
    async fn read(&self, key: &str) -> Option<Value> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        // held across the file write so concurrent writers land in order
        let mut map = self.inner.write().await;
        map.insert(key.to_string(), value);
        self.save(&map).await
    }
}
