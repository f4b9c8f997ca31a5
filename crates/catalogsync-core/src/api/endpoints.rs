use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
}

/// Resolves catalog endpoint ids (e.g. `"brands"`) to URLs.
pub trait EndpointResolver: Send + Sync {
    fn endpoint_by_id(&self, id: &str) -> Option<Endpoint>;

    /// URL used when no endpoint is configured for `id`.
    fn fallback_url(&self, id: &str) -> String;

    fn resolve(&self, id: &str) -> String {
        self.endpoint_by_id(id)
            .map(|endpoint| endpoint.url)
            .unwrap_or_else(|| self.fallback_url(id))
    }
}
