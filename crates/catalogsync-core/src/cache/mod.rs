//! Persistent key-value store with TTL metadata.
//!
//! This module provides the `TtlStore` that the catalog coordinators and the
//! menu loader use as their persistent tier. Entries are stored as JSON
//! `{ payload, written_at, ttl_days }` and expire after 7 days by default.
//!
//! Expiry is checked on read; there is no background sweep. Storage
//! failures are logged and degrade to a miss.

pub mod backend;
pub mod store;

pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{CachedData, PersistentInfo, TtlStore, MAX_TTL_DAYS};
