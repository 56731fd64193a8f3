//! MuyaPro core library.
//!
//! Local state for the MuyaPro services marketplace: the signed-in user,
//! customer service requests, notifications, and chat threads, kept in an
//! `AppStore` and mirrored to a durable key-value cache.
//!
//! All back-end behaviour (OTP login, technician assignment, support replies)
//! is simulated locally with fixed delays.

pub mod cache;
pub mod config;
pub mod models;
pub mod simulation;
pub mod store;
pub mod tasks;
pub mod utils;

pub use cache::{CacheManager, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use config::Config;
pub use store::{AppStore, StoreError, StoreEvent, StoreOptions};
pub use tasks::TaskScope;
