//! Catalog record types as the backend sends them.

use serde::{Deserialize, Serialize};

use super::filter::Filterable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    #[serde(default)]
    pub code: String,
    pub name: String,
    pub brand: Option<String>,
    #[serde(rename = "idcat")]
    pub category_id: Option<i64>,
    #[serde(rename = "idscat")]
    pub subcategory_id: Option<i64>,
    pub status: Option<String>,
    pub price: Option<f64>,
}

impl Article {
    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) => format!("{:.2}", price),
            None => "-".to_string(),
        }
    }
}

impl Filterable for Article {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    fn subcategory_id(&self) -> Option<i64> {
        self.subcategory_id
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub status: Option<String>,
}

impl Filterable for Brand {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    // A brand matches a brand filter by its own name.
    fn brand(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: i64,
    #[serde(rename = "idcat")]
    pub category_id: i64,
    pub name: String,
    pub status: Option<String>,
}

impl Filterable for Subcategory {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn category_id(&self) -> Option<i64> {
        Some(self.category_id)
    }

    fn subcategory_id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}
