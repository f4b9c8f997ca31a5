//! Catalog data: record types, the filter engine, per-catalog coordinators
//! and the typed services consumers use.

pub mod context;
pub mod coordinator;
pub mod filter;
pub mod models;
pub mod services;

pub use context::CatalogContext;
pub use coordinator::{CacheState, CacheStatus, CatalogCoordinator, CatalogRecord, CatalogSpec, LoadPhase};
pub use filter::{Criterion, FilterCriteria, Filterable, QueryScope};
pub use models::{Article, Brand, Subcategory};
pub use services::{ArticleCatalog, BrandCatalog, SubcategoryCatalog};
