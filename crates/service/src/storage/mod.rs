//! Local cache mirroring each collection.
//!
//! Every remote write attempt is followed by a write here, and reads fall
//! back here whenever the remote store cannot be reached.

pub mod cache;
pub mod json_file_cache;
pub mod memory_cache;

pub use cache::LocalCache;
pub use json_file_cache::JsonFileCache;
pub use memory_cache::MemoryCache;
