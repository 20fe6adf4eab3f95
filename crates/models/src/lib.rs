//! Storefront entities and the record contract shared by the persistence layer.

pub mod errors;
pub mod collection_type;
pub mod record;
pub mod product;
pub mod category;
pub mod customer;

pub use category::Category;
pub use collection_type::CollectionType;
pub use customer::Customer;
pub use product::Product;
pub use record::{merge_fields, Document, Entity, Fields, Record, RecordId};
