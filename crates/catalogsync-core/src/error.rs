//! Error types surfaced by the catalog layer.
//!
//! Storage failures never appear here: the persistent store logs them and
//! degrades to a cache miss.

use thiserror::Error;

use crate::api::TransportError;

#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error(transparent)]
    Decoding(#[from] DecodingError),
}

impl CatalogError {
    pub fn invalid_criteria(reason: impl Into<String>) -> Self {
        CatalogError::InvalidCriteria(reason.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CatalogError::Transport(_))
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, CatalogError::Decoding(_))
    }

    pub fn is_invalid_criteria(&self) -> bool {
        matches!(self, CatalogError::InvalidCriteria(_))
    }
}

/// A payload matched a codec (or the plain path) but could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decode {algorithm} payload: {reason}")]
pub struct DecodingError {
    pub algorithm: String,
    pub reason: String,
}

impl DecodingError {
    pub fn new(algorithm: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
