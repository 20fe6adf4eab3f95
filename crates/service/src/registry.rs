use std::sync::Arc;

use models::{Category, Customer, Product};
use tracing::{info, warn};

use crate::client::StorageClient;
use crate::collection::Collection;

/// The three storefront collections over one shared storage client.
#[derive(Clone)]
pub struct Collections {
    pub products: Collection<Product>,
    pub categories: Collection<Category>,
    pub customers: Collection<Customer>,
    storage: Arc<StorageClient>,
}

impl Collections {
    pub fn new(storage: Arc<StorageClient>) -> Self {
        Self {
            products: Collection::for_entity(Arc::clone(&storage)),
            categories: Collection::for_entity(Arc::clone(&storage)),
            customers: Collection::for_entity(Arc::clone(&storage)),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<StorageClient> {
        &self.storage
    }

    /// Initial load of every collection.
    pub async fn load_all(&self) {
        tokio::join!(
            self.products.refresh(),
            self.categories.refresh(),
            self.customers.refresh(),
        );
    }

    /// Recount every category's `productCount` from the products filed under
    /// its slug (case-insensitive) and persist the categories when any count
    /// moved. Skipped unless both collections are loaded. Returns `false`
    /// only when the categories save was not accepted.
    pub async fn reconcile_product_counts(&self) -> bool {
        if !self.products.is_loaded().await || !self.categories.is_loaded().await {
            return true;
        }
        let products = self.products.data().await;
        let mut changed = 0usize;
        let categories: Vec<Category> = self
            .categories
            .data()
            .await
            .into_iter()
            .map(|mut category| {
                let count = products.iter().filter(|p| p.belongs_to(category.slug())).count() as u64;
                if category.stored_product_count() != Some(count) {
                    category.set_product_count(count);
                    changed += 1;
                }
                category
            })
            .collect();
        if changed == 0 {
            return true;
        }

        info!(changed, "reconciling category product counts");
        let ok = self.categories.save_data(categories).await;
        if !ok {
            warn!("category product counts were not stored remotely");
        }
        ok
    }
}
