#![cfg(test)]
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::remote::RemoteStore;

/// In-memory remote store that can be switched offline.
#[derive(Default)]
pub struct FakeRemote {
    bins: RwLock<HashMap<String, Value>>,
    offline: AtomicBool,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub async fn stored(&self, bin_id: &str) -> Option<Value> {
        self.bins.read().await.get(bin_id).cloned()
    }

    pub async fn put_raw(&self, bin_id: &str, value: Value) {
        self.bins.write().await.insert(bin_id.to_string(), value);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::RemoteUnavailable("request failed: 503 Service Unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch(&self, bin_id: &str) -> Result<Value, StoreError> {
        self.check_online()?;
        Ok(self.stored(bin_id).await.unwrap_or(Value::Null))
    }

    async fn replace(&self, bin_id: &str, document: &Value) -> Result<(), StoreError> {
        self.check_online()?;
        self.put_raw(bin_id, document.clone()).await;
        Ok(())
    }
}
