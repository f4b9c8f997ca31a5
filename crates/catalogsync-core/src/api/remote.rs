use async_trait::async_trait;

use crate::catalog::FilterCriteria;

use super::{ResponseEnvelope, TransportError};

/// Request action tags understood by the backend.
pub mod actions {
    /// Full catalog dump.
    pub const FULL_LOAD: &str = "full-load";
    /// Query scoped by criteria.
    pub const SELECT: &str = "select";
    /// Navigation menu tree.
    pub const LOAD_MENU: &str = "load-menu";
}

/// The remote tier.
///
/// Implementations attach the session identity themselves; callers only
/// provide the endpoint id, the action tag and the criteria.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn send(
        &self,
        endpoint_id: &str,
        action: &str,
        criteria: &FilterCriteria,
    ) -> Result<ResponseEnvelope, TransportError>;
}
