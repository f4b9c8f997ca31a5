//! Local query/filter engine.
//!
//! Criteria are validated by one function for both the memory path and the
//! remote path, then evaluated as an AND of per-field predicates. Ordering
//! of the input is preserved.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Fields a record exposes to the filter engine.
pub trait Filterable {
    fn record_id(&self) -> i64;

    fn display_name(&self) -> &str;

    fn brand(&self) -> Option<&str> {
        None
    }

    fn category_id(&self) -> Option<i64> {
        None
    }

    fn subcategory_id(&self) -> Option<i64> {
        None
    }

    fn status(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Case-insensitive fragment of the record name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idcat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idscat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl FilterCriteria {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, idcat: i64) -> Self {
        self.idcat = Some(idcat);
        self
    }

    pub fn with_subcategory(mut self, idscat: i64) -> Self {
        self.idscat = Some(idscat);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Blank text fields count as absent.
    pub fn has(&self, criterion: Criterion) -> bool {
        fn present(text: &Option<String>) -> bool {
            text.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        match criterion {
            Criterion::Name => present(&self.name),
            Criterion::Brand => present(&self.brand),
            Criterion::Category => self.idcat.is_some(),
            Criterion::Subcategory => self.idscat.is_some(),
            Criterion::Status => present(&self.status),
            Criterion::Id => self.id.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Criterion::ALL.iter().all(|c| !self.has(*c))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Name,
    Brand,
    Category,
    Subcategory,
    Status,
    Id,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Name,
        Criterion::Brand,
        Criterion::Category,
        Criterion::Subcategory,
        Criterion::Status,
        Criterion::Id,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            Criterion::Name => "name",
            Criterion::Brand => "brand",
            Criterion::Category => "idcat",
            Criterion::Subcategory => "idscat",
            Criterion::Status => "status",
            Criterion::Id => "id",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Where validated criteria are headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Dispatched to the backend, which rejects unconstrained bulk reads.
    Remote,
    /// Evaluated against memory-resident data.
    Local,
}

/// Checks the criteria invariants before any evaluation or dispatch.
///
/// A subcategory filter always needs a category filter. Remote queries must
/// also carry at least one of the `required_any` fields.
pub fn validate(
    criteria: &FilterCriteria,
    required_any: &[Criterion],
    scope: QueryScope,
) -> Result<(), CatalogError> {
    if criteria.has(Criterion::Subcategory) && !criteria.has(Criterion::Category) {
        return Err(CatalogError::invalid_criteria(
            "a subcategory filter (idscat) requires a category filter (idcat)",
        ));
    }

    if scope == QueryScope::Remote
        && !required_any.is_empty()
        && !required_any.iter().any(|c| criteria.has(*c))
    {
        let fields: Vec<&str> = required_any.iter().map(Criterion::field_name).collect();
        return Err(CatalogError::invalid_criteria(format!(
            "at least one of [{}] is required",
            fields.join(", ")
        )));
    }

    Ok(())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn matches<T: Filterable>(record: &T, criteria: &FilterCriteria) -> bool {
    if let Some(name) = criteria.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if !contains_ignore_case(record.display_name(), name) {
            return false;
        }
    }
    if let Some(brand) = criteria.brand.as_deref().filter(|s| !s.trim().is_empty()) {
        if record.brand() != Some(brand) {
            return false;
        }
    }
    if let Some(idcat) = criteria.idcat {
        if record.category_id() != Some(idcat) {
            return false;
        }
    }
    if let Some(idscat) = criteria.idscat {
        if record.subcategory_id() != Some(idscat) {
            return false;
        }
    }
    if let Some(status) = criteria.status.as_deref().filter(|s| !s.trim().is_empty()) {
        if record.status() != Some(status) {
            return false;
        }
    }
    if let Some(id) = criteria.id {
        if record.record_id() != id {
            return false;
        }
    }
    true
}

/// Records matching every present criterion, in input order.
pub fn apply<T: Filterable + Clone>(records: &[T], criteria: &FilterCriteria) -> Vec<T> {
    records
        .iter()
        .filter(|record| matches(*record, criteria))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Article;

    fn article(id: i64, name: &str, brand: &str, idcat: i64, idscat: i64) -> Article {
        Article {
            id,
            code: format!("ART-{}", id),
            name: name.to_string(),
            brand: Some(brand.to_string()),
            category_id: Some(idcat),
            subcategory_id: Some(idscat),
            status: Some("A".to_string()),
            price: None,
        }
    }

    fn sample() -> Vec<Article> {
        vec![
            article(1, "Tornillo M6", "ACME", 5, 10),
            article(2, "Tuerca M6", "Globex", 5, 11),
            article(3, "TORNILLO M8", "ACME", 5, 10),
            article(4, "Taladro", "ACME", 7, 20),
        ]
    }

    const REQUIRED: &[Criterion] = &[Criterion::Name, Criterion::Category, Criterion::Id];

    #[test]
    fn test_empty_remote_query_rejected() {
        let err = validate(&FilterCriteria::default(), REQUIRED, QueryScope::Remote)
            .expect_err("empty criteria");
        assert!(err.is_invalid_criteria());
        assert!(err.to_string().contains("name, idcat, id"));
    }

    #[test]
    fn test_subcategory_requires_category() {
        let criteria = FilterCriteria::default().with_subcategory(5);
        assert!(validate(&criteria, REQUIRED, QueryScope::Remote).is_err());
        assert!(validate(&criteria, REQUIRED, QueryScope::Local).is_err());

        let criteria = criteria.with_category(5);
        assert!(validate(&criteria, REQUIRED, QueryScope::Remote).is_ok());
    }

    #[test]
    fn test_local_scope_allows_empty_criteria() {
        assert!(validate(&FilterCriteria::default(), REQUIRED, QueryScope::Local).is_ok());
    }

    #[test]
    fn test_blank_name_does_not_count() {
        let criteria = FilterCriteria::default().with_name("   ");
        assert!(!criteria.has(Criterion::Name));
        assert!(criteria.is_empty());
        assert!(validate(&criteria, REQUIRED, QueryScope::Remote).is_err());
    }

    #[test]
    fn test_name_is_case_insensitive_substring() {
        let result = apply(&sample(), &FilterCriteria::default().with_name("tornillo"));
        let ids: Vec<i64> = result.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let criteria = FilterCriteria::default()
            .with_name("m6")
            .with_brand("ACME")
            .with_category(5);
        let ids: Vec<i64> = apply(&sample(), &criteria).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_identifier_match_is_exact() {
        let criteria = FilterCriteria::default().with_brand("acme");
        assert!(apply(&sample(), &criteria).is_empty());

        let criteria = FilterCriteria::default().with_category(5).with_subcategory(10);
        let ids: Vec<i64> = apply(&sample(), &criteria).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_empty_criteria_keeps_everything_in_order() {
        let records = sample();
        assert_eq!(apply(&records, &FilterCriteria::default()), records);
    }

    #[test]
    fn test_missing_record_field_does_not_match() {
        let mut records = sample();
        records[0].brand = None;
        let ids: Vec<i64> = apply(&records, &FilterCriteria::default().with_brand("ACME"))
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_criteria_serialization_skips_absent_fields() {
        let criteria = FilterCriteria::default().with_category(5).with_id(9);
        assert_eq!(
            serde_json::to_value(&criteria).expect("serialize"),
            serde_json::json!({"idcat": 5, "id": 9})
        );
    }
}
