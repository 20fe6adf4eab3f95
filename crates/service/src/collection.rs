use std::sync::Arc;

use models::{merge_fields, CollectionType, Entity, Fields, Record, RecordId};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::client::StorageClient;
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    /// Constructed, not loaded yet.
    Idle,
    Loading,
    /// Loaded; `error` tells whether the load (or a later save) failed.
    Ready,
}

/// What consumers render: `{ data, loading, error }`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSnapshot<R> {
    pub data: Vec<R>,
    pub loading: bool,
    pub error: Option<String>,
}

struct CollectionState<R> {
    data: Vec<R>,
    phase: LoadPhase,
    error: Option<String>,
    /// `data` mirrors storage: set by a successful load or whole-collection save.
    loaded: bool,
}

/// In-memory view of one collection with load / add / update / delete / save.
///
/// Every mutation computes the full new collection from the current
/// in-memory value and persists it as a whole through [`StorageClient`].
/// Mutations are not serialized against each other: the last one to
/// resolve wins, both here and in the remote bin.
///
/// Item mutations are refused until a load has succeeded, so a collection
/// that failed to load is never written back over the stored records.
pub struct Collection<R> {
    kind: CollectionType,
    storage: Arc<StorageClient>,
    state: Arc<RwLock<CollectionState<R>>>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self { kind: self.kind, storage: Arc::clone(&self.storage), state: Arc::clone(&self.state) }
    }
}

impl<E: Entity> Collection<E> {
    pub fn for_entity(storage: Arc<StorageClient>) -> Self {
        Self::new(E::COLLECTION, storage)
    }
}

impl<R: Record> Collection<R> {
    pub fn new(kind: CollectionType, storage: Arc<StorageClient>) -> Self {
        Self {
            kind,
            storage,
            state: Arc::new(RwLock::new(CollectionState {
                data: Vec::new(),
                phase: LoadPhase::Idle,
                error: None,
                loaded: false,
            })),
        }
    }

    /// Construct and run the initial load.
    pub async fn mount(kind: CollectionType, storage: Arc<StorageClient>) -> Self {
        let collection = Self::new(kind, storage);
        collection.refresh().await;
        collection
    }

    pub fn kind(&self) -> CollectionType {
        self.kind
    }

    pub async fn snapshot(&self) -> CollectionSnapshot<R> {
        let s = self.state.read().await;
        CollectionSnapshot {
            data: s.data.clone(),
            loading: s.phase != LoadPhase::Ready,
            error: s.error.clone(),
        }
    }

    pub async fn data(&self) -> Vec<R> {
        self.state.read().await.data.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.read().await.phase
    }

    /// Whether the in-memory value came from storage and may be modified.
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    pub async fn find(&self, id: &RecordId) -> Option<R> {
        self.state.read().await.data.iter().find(|r| r.id() == id).cloned()
    }

    /// (Re)load from storage, replacing the in-memory value unconditionally.
    /// A failed load leaves an empty collection and records the error.
    pub async fn refresh(&self) {
        {
            let mut s = self.state.write().await;
            s.phase = LoadPhase::Loading;
            s.error = None;
        }

        let loaded = self.storage.get_data(self.kind).await.and_then(decode::<R>);

        let mut s = self.state.write().await;
        match loaded {
            Ok(data) => {
                debug!(collection = %self.kind, count = data.len(), "collection loaded");
                s.data = data;
                s.loaded = true;
            }
            Err(e) => {
                error!(collection = %self.kind, error = %e, "error loading collection");
                s.error = Some(e.to_string());
                s.data = Vec::new();
                s.loaded = false;
            }
        }
        s.phase = LoadPhase::Ready;
    }

    /// Persist `new_data` as the whole collection.
    ///
    /// Returns the remote outcome. The in-memory value becomes `new_data`
    /// whenever storage was reached at all, since the local mirror was
    /// written either way; it is left untouched when encoding or
    /// configuration fails. A stored whole collection also makes the
    /// collection modifiable again after a failed load.
    pub async fn save_data(&self, new_data: Vec<R>) -> bool {
        self.state.write().await.error = None;

        let result = match encode(&new_data) {
            Ok(items) => self.storage.set_data(self.kind, &items).await,
            Err(e) => Err(e),
        };

        let mut s = self.state.write().await;
        match result {
            Ok(stored) => {
                s.data = new_data;
                s.loaded = true;
                stored
            }
            Err(e) => {
                error!(collection = %self.kind, error = %e, "error saving collection");
                s.error = Some(e.to_string());
                false
            }
        }
    }

    /// Current records to build a mutation from, or `None` (with the error
    /// recorded) when the collection has not loaded.
    async fn modifiable_data(&self) -> Option<Vec<R>> {
        let mut s = self.state.write().await;
        if s.loaded {
            return Some(s.data.clone());
        }
        let e = StoreError::NotLoaded(self.kind);
        error!(collection = %self.kind, error = %e, "refusing to modify collection");
        s.error = Some(e.to_string());
        None
    }

    /// Append `item` and persist.
    pub async fn add_item(&self, item: R) -> bool {
        let Some(mut updated) = self.modifiable_data().await else {
            return false;
        };
        updated.push(item);
        self.save_data(updated).await
    }

    /// Shallow-merge `partial` into the record with `id` and persist. When no
    /// record matches, the unchanged collection is persisted anyway.
    pub async fn update_item(&self, id: &RecordId, partial: &Fields) -> bool {
        let Some(current) = self.modifiable_data().await else {
            return false;
        };
        let mut updated = Vec::with_capacity(current.len());
        for record in current {
            if record.id() == id {
                match merge_fields(&record, partial) {
                    Ok(merged) => updated.push(merged),
                    Err(e) => {
                        let e = StoreError::from(e);
                        error!(collection = %self.kind, %id, error = %e, "error merging update");
                        self.state.write().await.error = Some(e.to_string());
                        return false;
                    }
                }
            } else {
                updated.push(record);
            }
        }
        self.save_data(updated).await
    }

    /// Drop the record with `id`, keeping the order of the rest, and persist.
    pub async fn delete_item(&self, id: &RecordId) -> bool {
        let Some(current) = self.modifiable_data().await else {
            return false;
        };
        let updated: Vec<R> = current.into_iter().filter(|r| r.id() != id).collect();
        self.save_data(updated).await
    }
}

fn decode<R: Record>(items: Vec<Value>) -> Result<Vec<R>, StoreError> {
    Ok(serde_json::from_value(Value::Array(items))?)
}

fn encode<R: Record>(records: &[R]) -> Result<Vec<Value>, StoreError> {
    Ok(records.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BinMap;
    use crate::storage::{LocalCache, MemoryCache};
    use crate::test_support::FakeRemote;
    use models::Document;
    use serde_json::json;

    fn storage(remote: Arc<FakeRemote>, cache: Arc<MemoryCache>) -> Arc<StorageClient> {
        let bins = BinMap::new()
            .with(CollectionType::Products, "bin-p")
            .with(CollectionType::Categories, "bin-c");
        Arc::new(StorageClient::new(remote, cache, bins))
    }

    fn doc(id: i64, name: &str) -> Document {
        Document::new(id).with("name", name)
    }

    fn patch(key: &str, value: Value) -> Fields {
        let mut f = Fields::new();
        f.insert(key.to_string(), value);
        f
    }

    #[tokio::test]
    async fn products_scenario() {
        let remote = FakeRemote::new();
        remote.put_raw("bin-p", json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}])).await;
        let products = Collection::<Document>::mount(CollectionType::Products, storage(remote.clone(), MemoryCache::new())).await;

        assert!(products.update_item(&RecordId::Num(2), &patch("name", json!("C"))).await);
        assert_eq!(products.data().await, vec![doc(1, "A"), doc(2, "C")]);

        assert!(products.add_item(doc(3, "D")).await);
        assert_eq!(products.data().await.len(), 3);

        assert!(products.delete_item(&RecordId::Num(1)).await);
        assert_eq!(products.data().await, vec![doc(2, "C"), doc(3, "D")]);
        assert_eq!(
            remote.stored("bin-p").await,
            Some(json!([{"id": 2, "name": "C"}, {"id": 3, "name": "D"}]))
        );
    }

    #[tokio::test]
    async fn update_touches_one_field_of_one_record() {
        let remote = FakeRemote::new();
        let original = json!([
            {"id": 1, "name": "A", "price": 10, "tags": ["x"]},
            {"id": 2, "name": "B", "price": 20, "tags": ["y"]},
            {"id": "3", "name": "C", "price": 30}
        ]);
        remote.put_raw("bin-p", original.clone()).await;
        let c = Collection::<Document>::mount(CollectionType::Products, storage(remote.clone(), MemoryCache::new())).await;

        assert!(c.update_item(&RecordId::Num(2), &patch("price", json!(25))).await);

        let mut expected = original;
        expected[1]["price"] = json!(25);
        assert_eq!(remote.stored("bin-p").await, Some(expected));
    }

    #[tokio::test]
    async fn update_without_match_still_persists() {
        let remote = FakeRemote::new();
        remote.put_raw("bin-p", json!([{"id": 1, "name": "A"}])).await;
        let cache = MemoryCache::new();
        let c = Collection::<Document>::mount(CollectionType::Products, storage(remote.clone(), cache.clone())).await;

        // a string id never matches a numeric one
        assert!(c.update_item(&RecordId::from("1"), &patch("name", json!("Z"))).await);
        assert_eq!(c.data().await, vec![doc(1, "A")]);
        assert_eq!(cache.read("adminProducts").await, Some(json!([{"id": 1, "name": "A"}])));
    }

    #[tokio::test]
    async fn delete_keeps_order_of_remaining() {
        let remote = FakeRemote::new();
        let five: Vec<Value> = (1..=5).map(|i| json!({"id": i, "name": format!("n{i}")})).collect();
        remote.put_raw("bin-p", Value::Array(five)).await;
        let c = Collection::<Document>::mount(CollectionType::Products, storage(remote, MemoryCache::new())).await;

        assert!(c.delete_item(&RecordId::Num(3)).await);
        let ids: Vec<RecordId> = c.data().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![RecordId::Num(1), RecordId::Num(2), RecordId::Num(4), RecordId::Num(5)]);
    }

    #[tokio::test]
    async fn refresh_is_idempotent_on_stable_remote() {
        let remote = FakeRemote::new();
        remote.put_raw("bin-c", json!([{"id": 1, "name": "Diver"}])).await;
        let c = Collection::<Document>::new(CollectionType::Categories, storage(remote, MemoryCache::new()));
        assert_eq!(c.phase().await, LoadPhase::Idle);
        assert!(c.snapshot().await.loading);

        c.refresh().await;
        let first = c.data().await;
        c.refresh().await;
        assert_eq!(first, c.data().await);
        assert_eq!(c.phase().await, LoadPhase::Ready);
        assert!(!c.snapshot().await.loading);
    }

    #[tokio::test]
    async fn remote_outage_keeps_attempted_value() {
        let remote = FakeRemote::new();
        remote.put_raw("bin-p", json!([{"id": 1, "name": "A"}])).await;
        let cache = MemoryCache::new();
        let store = storage(remote.clone(), cache);
        let c = Collection::<Document>::mount(CollectionType::Products, store.clone()).await;

        remote.go_offline();
        assert!(!c.add_item(doc(2, "B")).await);
        assert_eq!(c.data().await, vec![doc(1, "A"), doc(2, "B")]);
        assert!(c.error().await.is_none());

        // a fresh consumer during the outage sees the attempted value
        let other = Collection::<Document>::mount(CollectionType::Products, store).await;
        assert_eq!(other.data().await, vec![doc(1, "A"), doc(2, "B")]);

        // once the remote is back it is the source of truth again
        remote.go_online();
        other.refresh().await;
        assert_eq!(other.data().await, vec![doc(1, "A")]);
    }

    #[tokio::test]
    async fn undecodable_records_surface_as_error_with_empty_data() {
        let remote = FakeRemote::new();
        remote.put_raw("bin-p", json!([{"name": "no id"}])).await;
        let c = Collection::<Document>::mount(CollectionType::Products, storage(remote, MemoryCache::new())).await;

        assert_eq!(c.phase().await, LoadPhase::Ready);
        assert!(c.data().await.is_empty());
        assert!(c.error().await.unwrap_or_default().contains("serialization"));
    }

    #[tokio::test]
    async fn missing_bin_is_recorded_and_mutations_fail() {
        let c = Collection::<Document>::mount(CollectionType::Customers, storage(FakeRemote::new(), MemoryCache::new())).await;
        assert!(c.error().await.unwrap_or_default().contains("customers"));

        assert!(!c.add_item(doc(1, "Ann")).await);
        assert!(c.data().await.is_empty());
        assert!(c.error().await.is_some());
    }

    #[tokio::test]
    async fn typed_entities_bind_their_collection() {
        let remote = FakeRemote::new();
        remote
            .put_raw("bin-c", json!([{"id": 7, "name": "Dress", "slug": "dress", "productCount": 1}]))
            .await;
        let categories = Collection::<models::Category>::for_entity(storage(remote.clone(), MemoryCache::new()));
        assert_eq!(categories.kind(), CollectionType::Categories);
        categories.refresh().await;

        assert!(categories.update_item(&RecordId::Num(7), &patch("productCount", json!(2))).await);
        assert_eq!(categories.find(&RecordId::Num(7)).await.map(|c| c.product_count()), Some(2));
        assert_eq!(
            remote.stored("bin-c").await,
            Some(json!([{"id": 7, "name": "Dress", "slug": "dress", "productCount": 2}]))
        );
    }

    #[tokio::test]
    async fn undecodable_load_blocks_item_mutations() {
        let remote = FakeRemote::new();
        let stored = json!([{"id": 1, "name": "A", "price": "12.5"}, {"name": "no id"}]);
        remote.put_raw("bin-p", stored.clone()).await;
        let products = Collection::<models::Product>::for_entity(storage(remote.clone(), MemoryCache::new()));
        products.refresh().await;
        assert!(!products.is_loaded().await);

        let new_product = models::Product::from(Document::new(3).with("name", "C"));
        assert!(!products.add_item(new_product).await);
        assert!(!products.update_item(&RecordId::Num(1), &patch("name", json!("Z"))).await);
        assert!(!products.delete_item(&RecordId::Num(1)).await);
        assert!(products.error().await.unwrap_or_default().contains("not loaded"));
        assert_eq!(remote.stored("bin-p").await, Some(stored));

        // a deliberate whole-collection save makes it usable again
        assert!(products.save_data(Vec::new()).await);
        assert!(products.is_loaded().await);
        assert!(products.add_item(models::Product::from(Document::new(4))).await);
    }

    #[tokio::test]
    async fn loose_typed_records_load_and_survive_updates_unchanged() {
        let remote = FakeRemote::new();
        remote
            .put_raw(
                "bin-p",
                json!([
                    {"id": 1, "name": "A", "price": 5200},
                    {"id": 2, "name": "B", "price": 10},
                    {"id": 2.5, "price": "12.5", "legacy": {"sku": null}}
                ]),
            )
            .await;
        let products = Collection::<models::Product>::for_entity(storage(remote.clone(), MemoryCache::new()));
        products.refresh().await;
        assert!(products.is_loaded().await);
        assert_eq!(products.data().await.len(), 3);

        assert!(products.update_item(&RecordId::Num(2), &patch("name", json!("C"))).await);
        assert_eq!(
            remote.stored("bin-p").await,
            Some(json!([
                {"id": 1, "name": "A", "price": 5200},
                {"id": 2, "name": "C", "price": 10},
                {"id": 2.5, "price": "12.5", "legacy": {"sku": null}}
            ]))
        );
    }
}
