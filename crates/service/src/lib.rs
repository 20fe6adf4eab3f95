//! Persistence core for the storefront admin.
//! - `remote`: whole-document access to the hosted JSON bin service.
//! - `storage`: local cache mirroring every collection.
//! - `client`: remote-first reads and writes with local fallback.
//! - `collection`: per-collection in-memory state with load/add/update/delete/save.

pub mod errors;
pub mod observability;
pub mod remote;
pub mod storage;
pub mod client;
pub mod collection;
pub mod registry;
#[cfg(test)]
pub mod test_support;

pub use client::{BinMap, StorageClient};
pub use collection::{Collection, CollectionSnapshot, LoadPhase};
pub use errors::StoreError;
pub use registry::Collections;
