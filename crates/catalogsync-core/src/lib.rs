//! Catalogsync core library.
//!
//! This crate provides the data layer behind the catalog administration
//! console:
//!
//! - `cache`: Persistent key-value store with TTL metadata
//! - `codec`: Compression codec registry for bulk wire payloads
//! - `catalog`: Tiered cache coordinators and the local filter engine
//! - `menu`: Stale-while-revalidate loader for the navigation menu
//! - `api`: HTTP client and the remote source abstraction
//! - `auth`: Session identity forwarded with every request
//! - `events`: Observer bus for diagnostics
//! - `config`: Application configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod menu;

mod wire;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{
    ArticleCatalog, BrandCatalog, CacheStatus, CatalogContext, CatalogCoordinator, FilterCriteria,
    SubcategoryCatalog,
};
pub use config::Config;
pub use error::{CatalogError, DecodingError, Result};
pub use menu::{MenuItem, MenuLoader};
