//! zstd-compressed JSON, carried either as raw bytes or as base64 text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::error::DecodingError;

use super::{CodecHandler, CompressedBlob};

/// Every zstd frame starts with these bytes.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression level (higher = better compression)
const DEFAULT_LEVEL: i32 = 3;

fn has_zstd_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZSTD_MAGIC)
}

fn decode_frame(algorithm: &str, bytes: &[u8]) -> Result<Value, DecodingError> {
    let raw = ::zstd::stream::decode_all(bytes).map_err(|e| DecodingError::new(algorithm, e))?;
    serde_json::from_slice(&raw)
        .map_err(|e| DecodingError::new(algorithm, format!("decompressed bytes are not JSON: {}", e)))
}

fn encode_frame(value: &Value, level: i32) -> anyhow::Result<Vec<u8>> {
    let raw = serde_json::to_vec(value)?;
    Ok(::zstd::stream::encode_all(raw.as_slice(), level)?)
}

#[derive(Debug, Clone)]
pub struct ZstdCodec {
    level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl CodecHandler for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn detect(&self, blob: &CompressedBlob) -> bool {
        matches!(blob, CompressedBlob::BinaryLike(bytes) if has_zstd_magic(bytes))
    }

    fn decompress(&self, blob: &CompressedBlob) -> Result<Value, DecodingError> {
        match blob {
            CompressedBlob::BinaryLike(bytes) => decode_frame(self.name(), bytes),
            _ => Err(DecodingError::new(self.name(), "expected binary payload")),
        }
    }

    fn compress(&self, value: &Value) -> anyhow::Result<CompressedBlob> {
        Ok(CompressedBlob::BinaryLike(encode_frame(value, self.level)?))
    }
}

#[derive(Debug, Clone)]
pub struct ZstdBase64Codec {
    level: i32,
}

impl Default for ZstdBase64Codec {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl CodecHandler for ZstdBase64Codec {
    fn name(&self) -> &'static str {
        "zstd-base64"
    }

    fn detect(&self, blob: &CompressedBlob) -> bool {
        match blob {
            // Only the prefix is decoded: 8 base64 chars cover the 4 magic bytes.
            CompressedBlob::Base64Text(text) => text
                .get(..8)
                .and_then(|prefix| STANDARD.decode(prefix).ok())
                .map(|bytes| has_zstd_magic(&bytes))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn decompress(&self, blob: &CompressedBlob) -> Result<Value, DecodingError> {
        match blob {
            CompressedBlob::Base64Text(text) => {
                let bytes = STANDARD
                    .decode(text.trim())
                    .map_err(|e| DecodingError::new(self.name(), e))?;
                decode_frame(self.name(), &bytes)
            }
            _ => Err(DecodingError::new(self.name(), "expected base64 payload")),
        }
    }

    fn compress(&self, value: &Value) -> anyhow::Result<CompressedBlob> {
        let bytes = encode_frame(value, self.level)?;
        Ok(CompressedBlob::Base64Text(STANDARD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Article, Brand};
    use crate::codec::CompressionRegistry;

    fn sample_articles() -> Vec<Article> {
        (1..=25)
            .map(|i| Article {
                id: i,
                code: format!("ART-{:04}", i),
                name: format!("Tornillo hexagonal {}mm", i),
                brand: Some(if i % 2 == 0 { "ACME" } else { "Globex" }.to_string()),
                category_id: Some(i % 3),
                subcategory_id: Some(i % 5),
                status: Some("A".to_string()),
                price: Some(i as f64 * 1.25),
            })
            .collect()
    }

    #[test]
    fn test_zstd_roundtrip_articles() {
        let articles = sample_articles();
        let value = serde_json::to_value(&articles).expect("to value");

        let codec = ZstdCodec::default();
        let blob = codec.compress(&value).expect("compress");
        assert!(codec.detect(&blob));

        let decoded: Vec<Article> =
            serde_json::from_value(codec.decompress(&blob).expect("decompress")).expect("records");
        assert_eq!(decoded, articles);
    }

    #[test]
    fn test_zstd_base64_roundtrip_brands() {
        let brands = vec![
            Brand {
                id: 1,
                name: "ACME".to_string(),
                status: Some("A".to_string()),
            },
            Brand {
                id: 2,
                name: "Globex".to_string(),
                status: None,
            },
        ];
        let value = serde_json::to_value(&brands).expect("to value");

        let codec = ZstdBase64Codec::default();
        let blob = codec.compress(&value).expect("compress");
        assert!(matches!(blob, CompressedBlob::Base64Text(_)));
        assert!(codec.detect(&blob));

        let decoded: Vec<Brand> =
            serde_json::from_value(codec.decompress(&blob).expect("decompress")).expect("records");
        assert_eq!(decoded, brands);
    }

    #[test]
    fn test_base64_registry_path() {
        let articles = sample_articles();
        let value = serde_json::to_value(&articles).expect("to value");
        let blob = ZstdBase64Codec::default().compress(&value).expect("compress");

        let registry = CompressionRegistry::default();
        let result = registry
            .detect_and_decompress::<Vec<Article>>(blob.into_value())
            .expect("decode");
        assert_eq!(result.algorithm, "zstd-base64");
        assert_eq!(result.data, articles);
    }

    #[test]
    fn test_empty_catalog_roundtrips() {
        let empty = serde_json::json!([]);

        let codec = ZstdCodec::default();
        let blob = codec.compress(&empty).expect("compress");
        assert!(codec.detect(&blob));
        assert_eq!(codec.decompress(&blob).expect("decompress"), empty);

        let codec = ZstdBase64Codec::default();
        let blob = codec.compress(&empty).expect("compress");
        assert!(codec.detect(&blob));
        assert_eq!(codec.decompress(&blob).expect("decompress"), empty);
    }

    #[test]
    fn test_detect_rejects_other_shapes() {
        let codec = ZstdCodec::default();
        assert!(!codec.detect(&CompressedBlob::BinaryLike(vec![1, 2, 3, 4])));
        assert!(!codec.detect(&CompressedBlob::Base64Text("KLUv/QAA".to_string())));

        let codec = ZstdBase64Codec::default();
        assert!(!codec.detect(&CompressedBlob::Base64Text("plain text".to_string())));
        assert!(!codec.detect(&CompressedBlob::Base64Text("KLU".to_string())));
    }

    #[test]
    fn test_bad_base64_is_decoding_error() {
        let codec = ZstdBase64Codec::default();
        let err = codec
            .decompress(&CompressedBlob::Base64Text("KLUv/Q**".to_string()))
            .expect_err("invalid base64");
        assert_eq!(err.algorithm, "zstd-base64");
    }
}
