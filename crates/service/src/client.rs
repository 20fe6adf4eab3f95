use std::{collections::BTreeMap, sync::Arc, time::Duration};

use models::{Category, CollectionType, Customer, Product};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::errors::StoreError;
use crate::observability::{FALLBACK_READS_TOTAL, LOCAL_BACKUPS_TOTAL};
use crate::remote::{JsonBinClient, RemoteStore};
use crate::storage::{JsonFileCache, LocalCache};

/// Collection type to remote bin id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinMap(BTreeMap<CollectionType, String>);

impl BinMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `kind` to `bin_id`; blank ids are ignored.
    pub fn with(mut self, kind: CollectionType, bin_id: impl Into<String>) -> Self {
        let bin_id = bin_id.into();
        if !bin_id.trim().is_empty() {
            self.0.insert(kind, bin_id.trim().to_string());
        }
        self
    }

    pub fn get(&self, kind: CollectionType) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    /// Fail unless every collection type has a bin.
    pub fn require_all(&self) -> Result<(), StoreError> {
        match CollectionType::ALL.iter().find(|k| !self.0.contains_key(k)) {
            Some(kind) => Err(StoreError::missing_bin(*kind)),
            None => Ok(()),
        }
    }

    pub fn from_config(bins: &configs::BinsConfig) -> Self {
        let mut map = Self::new();
        for (kind, id) in [
            (CollectionType::Products, &bins.products),
            (CollectionType::Categories, &bins.categories),
            (CollectionType::Customers, &bins.customers),
        ] {
            if let Some(id) = id {
                map = map.with(kind, id.as_str());
            }
        }
        map
    }
}

/// Reads and writes whole collections against the remote store, mirroring
/// every write attempt into the local cache and reading from that cache
/// whenever the remote cannot be reached.
///
/// Only configuration errors are returned to callers; remote failures are
/// logged and compensated locally.
pub struct StorageClient {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    bins: BinMap,
}

impl StorageClient {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>, bins: BinMap) -> Self {
        Self { remote, cache, bins }
    }

    /// Build the JSONBin client and file cache described by `cfg`.
    pub async fn from_config(cfg: &configs::StorageConfig) -> Result<Self, StoreError> {
        let remote = JsonBinClient::new(
            &cfg.base_url,
            &cfg.master_key,
            Some(Duration::from_secs(cfg.request_timeout_secs)),
        )?;
        let cache = JsonFileCache::new(&cfg.cache_path).await?;
        Ok(Self::new(Arc::new(remote), cache, BinMap::from_config(&cfg.bins)))
    }

    pub fn bins(&self) -> &BinMap {
        &self.bins
    }

    fn bin_for(&self, kind: CollectionType) -> Result<&str, StoreError> {
        self.bins.get(kind).ok_or_else(|| StoreError::missing_bin(kind))
    }

    /// Current records of `kind`: the remote copy, or the local mirror when
    /// the remote fails.
    pub async fn get_data(&self, kind: CollectionType) -> Result<Vec<Value>, StoreError> {
        let bin = self.bin_for(kind)?;
        let fetched = self.remote.fetch(bin).await.and_then(|record| match record {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::Serialization(format!(
                "bin holds a {} instead of a record list",
                json_kind(&other)
            ))),
        });
        match fetched {
            Ok(items) => {
                debug!(collection = %kind, count = items.len(), "loaded collection from remote store");
                Ok(items)
            }
            Err(e) => {
                error!(collection = %kind, error = %e, "error fetching collection from remote store");
                Ok(self.local_fallback(kind).await)
            }
        }
    }

    /// Replace the remote copy of `kind` with `data`. The local mirror is
    /// written whether or not the remote accepted it; the returned flag
    /// reports the remote outcome.
    pub async fn set_data(&self, kind: CollectionType, data: &[Value]) -> Result<bool, StoreError> {
        let bin = self.bin_for(kind)?;
        let document = Value::Array(data.to_vec());
        let stored = match self.remote.replace(bin, &document).await {
            Ok(()) => true,
            Err(e) => {
                error!(collection = %kind, error = %e, "error updating collection in remote store");
                false
            }
        };
        self.local_backup(kind, document).await;
        Ok(stored)
    }

    /// Last snapshot mirrored for `kind`; empty when nothing usable is cached.
    pub async fn local_fallback(&self, kind: CollectionType) -> Vec<Value> {
        FALLBACK_READS_TOTAL.inc();
        match self.cache.read(&kind.cache_key()).await {
            Some(Value::Array(items)) => {
                warn!(collection = %kind, count = items.len(), "serving collection from local cache");
                items
            }
            Some(other) => {
                warn!(collection = %kind, found = json_kind(&other), "local cache entry is not a list; ignoring");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Best-effort mirror of `document` into the local cache.
    pub async fn local_backup(&self, kind: CollectionType, document: Value) {
        match self.cache.write(&kind.cache_key(), document).await {
            Ok(()) => LOCAL_BACKUPS_TOTAL.inc(),
            Err(e) => warn!(collection = %kind, error = %e, "failed to mirror collection to local cache"),
        }
    }

    /// Typed read; a record that does not match `R` is a serialization error.
    pub async fn get_typed<R: DeserializeOwned>(&self, kind: CollectionType) -> Result<Vec<R>, StoreError> {
        let items = self.get_data(kind).await?;
        Ok(serde_json::from_value(Value::Array(items))?)
    }

    pub async fn set_typed<R: Serialize>(&self, kind: CollectionType, records: &[R]) -> Result<bool, StoreError> {
        let items = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.set_data(kind, &items).await
    }

    pub async fn get_products(&self) -> Result<Vec<Product>, StoreError> {
        self.get_typed(CollectionType::Products).await
    }

    pub async fn set_products(&self, products: &[Product]) -> Result<bool, StoreError> {
        self.set_typed(CollectionType::Products, products).await
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.get_typed(CollectionType::Categories).await
    }

    pub async fn set_categories(&self, categories: &[Category]) -> Result<bool, StoreError> {
        self.set_typed(CollectionType::Categories, categories).await
    }

    pub async fn get_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.get_typed(CollectionType::Customers).await
    }

    pub async fn set_customers(&self, customers: &[Customer]) -> Result<bool, StoreError> {
        self.set_typed(CollectionType::Customers, customers).await
    }

    /// Push every non-empty local snapshot to its remote bin.
    /// Returns `true` only when every push was accepted.
    pub async fn migrate_from_local_cache(&self) -> bool {
        let mut all_ok = true;
        for kind in CollectionType::ALL {
            let Some(Value::Array(items)) = self.cache.read(&kind.cache_key()).await else {
                continue;
            };
            if items.is_empty() {
                continue;
            }
            match self.set_data(kind, &items).await {
                Ok(true) => info!(collection = %kind, count = items.len(), "migrated local snapshot to remote store"),
                Ok(false) => all_ok = false,
                Err(e) => {
                    error!(collection = %kind, error = %e, "error during migration");
                    all_ok = false;
                }
            }
        }
        all_ok
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
