//! Compression codec registry for bulk wire payloads.
//!
//! The backend may compress large array payloads and flag the envelope with
//! `compressed = 1`. The registry classifies the payload shape, picks the
//! first handler (in priority order) whose `detect` matches and reverses the
//! encoding. A payload no handler recognizes is used as-is, so a backend
//! that stops compressing keeps working with older clients.
//!
//! Handlers, highest priority first:
//! - `zstd`: zstd-compressed JSON as a byte array or `Buffer` object
//! - `zstd-base64`: the same, carried as base64 text
//! - `columnar`: `[[header...], [row...], ...]` unpacked into objects

pub mod columnar;
pub mod zstd;

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::DecodingError;

pub use self::columnar::ColumnarCodec;
pub use self::zstd::{ZstdBase64Codec, ZstdCodec};

/// Algorithm name reported for payloads that needed no decoding.
pub const ALGORITHM_NONE: &str = "none";

/// The shapes a compressed payload can take on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum CompressedBlob {
    /// A JSON array that still needs unwrapping.
    RawArray(Vec<Value>),
    Base64Text(String),
    /// Raw bytes, sent as a number array or a `{ "type": "Buffer", "data": [...] }` object.
    BinaryLike(Vec<u8>),
}

impl CompressedBlob {
    /// Returns `None` for shapes no codec can carry (objects, numbers, ...).
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(CompressedBlob::Base64Text(text.clone())),
            Value::Array(items) => match byte_array(items) {
                Some(bytes) => Some(CompressedBlob::BinaryLike(bytes)),
                None => Some(CompressedBlob::RawArray(items.clone())),
            },
            Value::Object(map) => {
                let is_buffer = map.get("type").and_then(Value::as_str) == Some("Buffer");
                if !is_buffer {
                    return None;
                }
                map.get("data")
                    .and_then(Value::as_array)
                    .and_then(|items| byte_array(items))
                    .map(CompressedBlob::BinaryLike)
            }
            _ => None,
        }
    }

    /// Size of the payload as carried on the wire, in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            CompressedBlob::RawArray(items) => json_len(items),
            CompressedBlob::Base64Text(text) => text.len(),
            CompressedBlob::BinaryLike(bytes) => bytes.len(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            CompressedBlob::RawArray(items) => Value::Array(items),
            CompressedBlob::Base64Text(text) => Value::String(text),
            CompressedBlob::BinaryLike(bytes) => {
                Value::Array(bytes.into_iter().map(Value::from).collect())
            }
        }
    }
}

/// A non-empty array of integers in `0..=255`.
fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn json_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

pub trait CodecHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, blob: &CompressedBlob) -> bool;

    fn decompress(&self, blob: &CompressedBlob) -> Result<Value, DecodingError>;

    fn compress(&self, value: &Value) -> anyhow::Result<CompressedBlob>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecompressionResult<T> {
    pub data: T,
    pub algorithm: &'static str,
    pub original_size: usize,
    pub decompressed_size: usize,
    pub compression_ratio_percent: f64,
    pub processing_time_ms: f64,
}

/// Everything in a `DecompressionResult` except the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompressionStats {
    pub algorithm: &'static str,
    pub original_size: usize,
    pub decompressed_size: usize,
    pub compression_ratio_percent: f64,
    pub processing_time_ms: f64,
}

impl<T> DecompressionResult<T> {
    pub fn stats(&self) -> DecompressionStats {
        DecompressionStats {
            algorithm: self.algorithm,
            original_size: self.original_size,
            decompressed_size: self.decompressed_size,
            compression_ratio_percent: self.compression_ratio_percent,
            processing_time_ms: self.processing_time_ms,
        }
    }
}

/// `(1 - decompressed / original) * 100`, clamped to `[0, 100]`.
pub fn compression_ratio_percent(original_size: usize, decompressed_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = (1.0 - decompressed_size as f64 / original_size as f64) * 100.0;
    ratio.clamp(0.0, 100.0)
}

pub struct CompressionRegistry {
    handlers: Vec<Box<dyn CodecHandler>>,
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ZstdCodec::default()),
            Box::new(ZstdBase64Codec::default()),
            Box::new(ColumnarCodec),
        ])
    }
}

impl CompressionRegistry {
    /// Handlers are tried in the given order.
    pub fn new(handlers: Vec<Box<dyn CodecHandler>>) -> Self {
        Self { handlers }
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn handler(&self, name: &str) -> Option<&dyn CodecHandler> {
        self.handlers
            .iter()
            .find(|h| h.name() == name)
            .map(|h| h.as_ref())
    }

    pub fn detect_and_decompress<T: DeserializeOwned>(
        &self,
        payload: Value,
    ) -> Result<DecompressionResult<T>, DecodingError> {
        let blob = CompressedBlob::classify(&payload);
        let handler = blob
            .as_ref()
            .and_then(|blob| self.handlers.iter().find(|h| h.detect(blob)));

        let (algorithm, original_size, decoded, processing_time_ms) = match (handler, blob) {
            (Some(handler), Some(blob)) => {
                let started = Instant::now();
                let decoded = handler.decompress(&blob)?;
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                (handler.name(), blob.encoded_len(), decoded, elapsed_ms)
            }
            _ => {
                let size = json_len(&payload);
                (ALGORITHM_NONE, size, payload, 0.0)
            }
        };

        let decompressed_size = if algorithm == ALGORITHM_NONE {
            original_size
        } else {
            json_len(&decoded)
        };
        let data: T = serde_json::from_value(decoded)
            .map_err(|e| DecodingError::new(algorithm, format!("unexpected payload shape: {}", e)))?;

        let result = DecompressionResult {
            data,
            algorithm,
            original_size,
            decompressed_size,
            compression_ratio_percent: compression_ratio_percent(original_size, decompressed_size),
            processing_time_ms,
        };
        debug!(
            algorithm = result.algorithm,
            original_size = result.original_size,
            decompressed_size = result.decompressed_size,
            ratio = result.compression_ratio_percent,
            elapsed_ms = result.processing_time_ms,
            "Decoded payload"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert_eq!(
            CompressedBlob::classify(&json!("KLUv/Q==")),
            Some(CompressedBlob::Base64Text("KLUv/Q==".to_string()))
        );
        assert_eq!(
            CompressedBlob::classify(&json!([40, 181, 47, 253])),
            Some(CompressedBlob::BinaryLike(vec![40, 181, 47, 253]))
        );
        assert_eq!(
            CompressedBlob::classify(&json!({"type": "Buffer", "data": [1, 2]})),
            Some(CompressedBlob::BinaryLike(vec![1, 2]))
        );
        assert!(matches!(
            CompressedBlob::classify(&json!([{"id": 1}])),
            Some(CompressedBlob::RawArray(_))
        ));
        assert!(matches!(
            CompressedBlob::classify(&json!([1, 300])),
            Some(CompressedBlob::RawArray(_))
        ));
        assert_eq!(CompressedBlob::classify(&json!({"id": 1})), None);
        assert_eq!(CompressedBlob::classify(&json!(42)), None);
    }

    #[test]
    fn test_ratio_is_clamped() {
        assert_eq!(compression_ratio_percent(0, 10), 0.0);
        assert_eq!(compression_ratio_percent(100, 100), 0.0);
        // Expansion would be negative; clamped to 0.
        assert_eq!(compression_ratio_percent(100, 400), 0.0);
        assert!((compression_ratio_percent(400, 100) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uncompressed_payload_passes_through() {
        let registry = CompressionRegistry::default();
        let payload = json!([{"id": 1, "name": "ACME"}]);

        let result: DecompressionResult<Value> =
            registry.detect_and_decompress(payload.clone()).expect("decode");
        assert_eq!(result.algorithm, ALGORITHM_NONE);
        assert_eq!(result.data, payload);
        assert_eq!(result.original_size, result.decompressed_size);
        assert_eq!(result.compression_ratio_percent, 0.0);
    }

    #[test]
    fn test_plain_object_passes_through() {
        let registry = CompressionRegistry::default();
        let result: DecompressionResult<Value> = registry
            .detect_and_decompress(json!({"id": 7}))
            .expect("decode");
        assert_eq!(result.algorithm, ALGORITHM_NONE);
    }

    #[test]
    fn test_priority_order() {
        let registry = CompressionRegistry::default();
        assert_eq!(registry.handler_names(), vec!["zstd", "zstd-base64", "columnar"]);
    }

    #[test]
    fn test_zstd_payload_is_detected_and_measured() {
        let registry = CompressionRegistry::default();
        let records: Vec<Value> = (0..200)
            .map(|i| json!({"id": i, "name": format!("Article {}", i), "status": "A"}))
            .collect();
        let original = Value::Array(records);

        let codec = registry.handler("zstd").expect("zstd handler");
        let blob = codec.compress(&original).expect("compress");

        let result: DecompressionResult<Value> = registry
            .detect_and_decompress(blob.into_value())
            .expect("decode");
        assert_eq!(result.algorithm, "zstd");
        assert_eq!(result.data, original);
        assert!(result.decompressed_size > result.original_size);
        // Decoded output is larger than the wire form, so the ratio clamps to 0.
        assert_eq!(result.compression_ratio_percent, 0.0);
        assert!(result.processing_time_ms >= 0.0);
    }

    #[test]
    fn test_corrupt_payload_surfaces_decoding_error() {
        let registry = CompressionRegistry::default();
        // zstd magic followed by garbage
        let payload = json!([0x28, 0xB5, 0x2F, 0xFD, 1, 2, 3, 4, 5]);
        let err = registry
            .detect_and_decompress::<Value>(payload)
            .expect_err("corrupt frame");
        assert_eq!(err.algorithm, "zstd");
    }

    #[test]
    fn test_shape_mismatch_is_decoding_error() {
        let registry = CompressionRegistry::default();
        let err = registry
            .detect_and_decompress::<Vec<u32>>(json!([{"id": 1}]))
            .expect_err("wrong shape");
        assert_eq!(err.algorithm, ALGORITHM_NONE);
    }
}
