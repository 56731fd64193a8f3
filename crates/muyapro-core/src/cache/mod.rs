//! Durable key-value cache for the local store.
//!
//! This module provides:
//! - `KeyValueStore`: whole-value get/set/remove over string keys
//! - `FileStore`: one JSON file per key in a data directory
//! - `MemoryStore`: in-process map for tests and throwaway sessions
//! - `CacheManager`: typed load/save for each store collection
//!
//! Every value is wrapped in a `CachedData` envelope recording when it was
//! written, so status displays can show how fresh each collection is.

pub mod error;
pub mod kv;
pub mod manager;

pub use error::StorageError;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use manager::{CacheAges, CacheManager, CachedData};
