use crate::{collection_type::CollectionType, record::entity_view};

pub const LOW_STOCK_THRESHOLD: i64 = 10;

entity_view! {
    /// A watch listed in the storefront.
    Product => CollectionType::Products
}

impl Product {
    pub fn name(&self) -> &str {
        self.0.str_field("name").unwrap_or_default()
    }

    pub fn price(&self) -> Option<f64> {
        self.0.f64_field("price")
    }

    /// Slug of the owning category.
    pub fn category(&self) -> &str {
        self.0.str_field("category").unwrap_or_default()
    }

    pub fn stock(&self) -> i64 {
        self.0.i64_field("stock").unwrap_or(0)
    }

    pub fn status(&self) -> Option<&str> {
        self.0.str_field("status")
    }

    pub fn set_status(&mut self, status: &str) {
        self.0.set("status", status);
    }

    /// Category slugs compare case-insensitively.
    pub fn belongs_to(&self, slug: &str) -> bool {
        self.category().to_lowercase() == slug.to_lowercase()
    }
}

/// Inventory label shown next to a stock level.
pub fn stock_status(stock: i64) -> &'static str {
    if stock <= 0 {
        "Out of Stock"
    } else if stock <= LOW_STOCK_THRESHOLD {
        "Low Stock"
    } else {
        "In Stock"
    }
}
