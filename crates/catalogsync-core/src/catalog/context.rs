use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::RemoteSource;
use crate::cache::TtlStore;
use crate::codec::CompressionRegistry;
use crate::error::{DecodingError, Result};
use crate::events::{CatalogEvent, EventBus};

use super::FilterCriteria;

/// Services shared by every coordinator and the menu loader.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct CatalogContext {
    pub remote: Arc<dyn RemoteSource>,
    pub store: Arc<TtlStore>,
    pub codecs: Arc<CompressionRegistry>,
    pub events: Arc<EventBus>,
}

impl CatalogContext {
    pub fn new(remote: Arc<dyn RemoteSource>, store: Arc<TtlStore>) -> Self {
        Self {
            remote,
            store,
            codecs: Arc::new(CompressionRegistry::default()),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Sends one request and decodes the envelope payload.
    ///
    /// Returns `Ok(None)` when the backend answered without data (non-200
    /// status or empty `data`). Transport and decoding failures are errors.
    pub async fn fetch_payload<T: DeserializeOwned>(
        &self,
        catalog: &str,
        endpoint_id: &str,
        action: &str,
        criteria: &FilterCriteria,
    ) -> Result<Option<T>> {
        let envelope = self.remote.send(endpoint_id, action, criteria).await?;

        self.events.publish(CatalogEvent::RawResponse {
            catalog: catalog.to_string(),
            action: action.to_string(),
            status_code: envelope.status_code,
            message: envelope.message.clone(),
            compressed: envelope.compressed,
        });

        let status_code = envelope.status_code;
        let Some((data, compressed)) = envelope.into_payload() else {
            info!(catalog = catalog, action = action, status_code = status_code, "Backend returned no data");
            return Ok(None);
        };

        if !compressed {
            let records = serde_json::from_value(data).map_err(|e| {
                DecodingError::new(crate::codec::ALGORITHM_NONE, format!("unexpected payload shape: {}", e))
            })?;
            return Ok(Some(records));
        }

        let result = self.codecs.detect_and_decompress::<T>(data)?;
        debug!(
            catalog = catalog,
            algorithm = result.algorithm,
            ratio = result.compression_ratio_percent,
            "Decompressed catalog payload"
        );
        self.events.publish(CatalogEvent::Decompressed {
            catalog: catalog.to_string(),
            stats: result.stats(),
        });
        Ok(Some(result.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{actions, ResponseEnvelope, TransportError};
    use crate::catalog::Brand;
    use crate::codec::{CodecHandler, ZstdBase64Codec};
    use crate::test_support::{test_context, ScriptedRemote};
    use serde_json::json;

    #[tokio::test]
    async fn test_plain_payload() {
        let remote = Arc::new(ScriptedRemote::new());
        remote.push_ok(json!([{"id": 1, "name": "ACME"}]));
        let (ctx, _) = test_context(remote.clone());

        let brands: Option<Vec<Brand>> = ctx
            .fetch_payload("brands", "brands", actions::FULL_LOAD, &FilterCriteria::default())
            .await
            .expect("fetch");
        assert_eq!(brands.expect("data")[0].name, "ACME");
        assert_eq!(remote.requests()[0].action, "full-load");
    }

    #[tokio::test]
    async fn test_compressed_payload_publishes_stats() {
        let value = json!([{"id": 1, "name": "ACME"}, {"id": 2, "name": "Globex"}]);
        let blob = ZstdBase64Codec::default().compress(&value).expect("compress");

        let remote = Arc::new(ScriptedRemote::new());
        remote.push_envelope(ResponseEnvelope::compressed(blob.into_value()));
        let (ctx, _) = test_context(remote);
        let mut sub = ctx.events.subscribe();

        let brands: Vec<Brand> = ctx
            .fetch_payload("brands", "brands", actions::FULL_LOAD, &FilterCriteria::default())
            .await
            .expect("fetch")
            .expect("data");
        assert_eq!(brands.len(), 2);

        assert!(matches!(
            sub.receiver.try_recv(),
            Ok(CatalogEvent::RawResponse { compressed: true, .. })
        ));
        match sub.receiver.try_recv() {
            Ok(CatalogEvent::Decompressed { stats, .. }) => assert_eq!(stats.algorithm, "zstd-base64"),
            other => panic!("expected decompression stats, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_data_is_not_an_error() {
        let remote = Arc::new(ScriptedRemote::new());
        remote.push_envelope(ResponseEnvelope::status(404, "Sin resultados"));
        remote.push_ok(json!([]));
        let (ctx, _) = test_context(remote);

        for _ in 0..2 {
            let brands: Option<Vec<Brand>> = ctx
                .fetch_payload("brands", "brands", actions::SELECT, &FilterCriteria::default())
                .await
                .expect("fetch");
            assert!(brands.is_none());
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let remote = Arc::new(ScriptedRemote::new());
        remote.push_error(TransportError::ServerError("HTTP 502".to_string()));
        let (ctx, _) = test_context(remote);

        let err = ctx
            .fetch_payload::<Vec<Brand>>("brands", "brands", actions::SELECT, &FilterCriteria::default())
            .await
            .expect_err("transport failure");
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_decoding_error() {
        let remote = Arc::new(ScriptedRemote::new());
        remote.push_ok(json!([{"unexpected": true}]));
        let (ctx, _) = test_context(remote);

        let err = ctx
            .fetch_payload::<Vec<Brand>>("brands", "brands", actions::FULL_LOAD, &FilterCriteria::default())
            .await
            .expect_err("shape mismatch");
        assert!(err.is_decoding());
    }
}
