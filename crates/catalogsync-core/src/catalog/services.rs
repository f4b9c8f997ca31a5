//! Typed consumer API over one coordinator per catalog.

use std::sync::Arc;

use crate::error::Result;

use super::coordinator::{CacheStatus, CatalogCoordinator, CatalogSpec};
use super::filter::Criterion;
use super::models::{Article, Brand, Subcategory};
use super::{CatalogContext, FilterCriteria};

pub const ARTICLES: CatalogSpec = CatalogSpec {
    name: "articles",
    endpoint_id: "articles",
    storage_key: "articles_catalog",
    required_any: &[
        Criterion::Name,
        Criterion::Brand,
        Criterion::Category,
        Criterion::Id,
    ],
};

pub const BRANDS: CatalogSpec = CatalogSpec {
    name: "brands",
    endpoint_id: "brands",
    storage_key: "brands_catalog",
    required_any: &[Criterion::Name, Criterion::Id],
};

pub const SUBCATEGORIES: CatalogSpec = CatalogSpec {
    name: "subcategories",
    endpoint_id: "subcategories",
    storage_key: "subcategories_catalog",
    required_any: &[Criterion::Category, Criterion::Name, Criterion::Id],
};

/// Generates the consumer methods shared by every catalog service.
macro_rules! catalog_service {
    (
        $service:ident, $record:ty, $spec:expr,
        load_all = $load_all:ident,
        get = $get:ident,
        search = $search:ident,
        get_by_id = $get_by_id:ident $(,)?
    ) => {
        #[derive(Clone)]
        pub struct $service {
            coordinator: CatalogCoordinator<$record>,
        }

        impl $service {
            pub fn new(ctx: CatalogContext) -> Self {
                Self {
                    coordinator: CatalogCoordinator::new($spec, ctx),
                }
            }

            pub fn coordinator(&self) -> &CatalogCoordinator<$record> {
                &self.coordinator
            }

            pub async fn $load_all(&self) -> Result<Arc<Vec<$record>>> {
                self.coordinator.load_all().await
            }

            /// Without criteria this is a full load.
            pub async fn $get(&self, criteria: Option<&FilterCriteria>) -> Result<Vec<$record>> {
                match criteria {
                    Some(criteria) => self.coordinator.query(criteria).await,
                    None => Ok(self.coordinator.load_all().await?.as_ref().clone()),
                }
            }

            /// Free-text search on the record name.
            pub async fn $search(&self, text: &str) -> Result<Vec<$record>> {
                self.coordinator
                    .query(&FilterCriteria::default().with_name(text))
                    .await
            }

            pub async fn $get_by_id(&self, id: i64) -> Result<Option<$record>> {
                self.coordinator.find_by_id(id).await
            }

            pub async fn reload(&self) -> Result<Arc<Vec<$record>>> {
                self.coordinator.reload().await
            }

            pub fn clear_cache(&self) {
                self.coordinator.clear_cache()
            }

            pub fn get_cache_status(&self) -> CacheStatus {
                self.coordinator.get_cache_status()
            }

            pub fn is_cache_loaded(&self) -> bool {
                self.coordinator.is_cache_loaded()
            }
        }
    };
}

catalog_service!(
    ArticleCatalog, Article, ARTICLES,
    load_all = load_all_articles,
    get = get_articles,
    search = search_articles,
    get_by_id = get_article_by_id,
);

catalog_service!(
    BrandCatalog, Brand, BRANDS,
    load_all = load_all_brands,
    get = get_brands,
    search = search_brands,
    get_by_id = get_brand_by_id,
);

catalog_service!(
    SubcategoryCatalog, Subcategory, SUBCATEGORIES,
    load_all = load_all_subcategories,
    get = get_subcategories,
    search = search_subcategories,
    get_by_id = get_subcategory_by_id,
);

impl SubcategoryCatalog {
    pub async fn get_by_category(&self, idcat: i64) -> Result<Vec<Subcategory>> {
        self.coordinator
            .query(&FilterCriteria::default().with_category(idcat))
            .await
    }
}
