//! Columnar packing: a header row of field names followed by value rows.
//!
//! ```text
//! [["id", "name"], [1, "ACME"], [2, "Globex"]]
//! ```
//!
//! unpacks to `[{"id": 1, "name": "ACME"}, {"id": 2, "name": "Globex"}]`.
//! Null cells are omitted from the unpacked objects. An empty catalog packs
//! to a lone empty header, `[[]]`.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::DecodingError;

use super::{CodecHandler, CompressedBlob};

#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarCodec;

fn header(items: &[Value]) -> Option<Vec<&str>> {
    items.first()?.as_array()?.iter().map(Value::as_str).collect()
}

impl CodecHandler for ColumnarCodec {
    fn name(&self) -> &'static str {
        "columnar"
    }

    fn detect(&self, blob: &CompressedBlob) -> bool {
        let CompressedBlob::RawArray(items) = blob else {
            return false;
        };
        match header(items) {
            Some(fields) => items[1..]
                .iter()
                .all(|row| row.as_array().is_some_and(|cells| cells.len() == fields.len())),
            None => false,
        }
    }

    fn decompress(&self, blob: &CompressedBlob) -> Result<Value, DecodingError> {
        let CompressedBlob::RawArray(items) = blob else {
            return Err(DecodingError::new(self.name(), "expected array payload"));
        };
        let fields = header(items)
            .ok_or_else(|| DecodingError::new(self.name(), "missing header row"))?;

        let mut records = Vec::with_capacity(items.len().saturating_sub(1));
        for (index, row) in items.iter().enumerate().skip(1) {
            let cells = row
                .as_array()
                .filter(|cells| cells.len() == fields.len())
                .ok_or_else(|| {
                    DecodingError::new(
                        self.name(),
                        format!("row {} does not match the {}-column header", index, fields.len()),
                    )
                })?;

            let record: Map<String, Value> = fields
                .iter()
                .zip(cells)
                .filter(|(_, cell)| !cell.is_null())
                .map(|(field, cell)| (field.to_string(), cell.clone()))
                .collect();
            records.push(Value::Object(record));
        }

        Ok(Value::Array(records))
    }

    fn compress(&self, value: &Value) -> anyhow::Result<CompressedBlob> {
        let records = value
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("columnar packing needs an array of objects"))?;

        let mut objects = Vec::with_capacity(records.len());
        for record in records {
            let object = record
                .as_object()
                .ok_or_else(|| anyhow::anyhow!("columnar packing needs an array of objects"))?;
            objects.push(object);
        }

        let fields: BTreeSet<&str> = objects
            .iter()
            .flat_map(|object| object.keys().map(String::as_str))
            .collect();

        let mut rows = Vec::with_capacity(objects.len() + 1);
        rows.push(Value::Array(fields.iter().map(|f| Value::from(*f)).collect()));
        for object in objects {
            let row = fields
                .iter()
                .map(|field| object.get(*field).cloned().unwrap_or(Value::Null))
                .collect();
            rows.push(Value::Array(row));
        }

        Ok(CompressedBlob::RawArray(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Subcategory;
    use crate::codec::CompressionRegistry;
    use serde_json::json;

    #[test]
    fn test_unpack_rows() {
        let blob = CompressedBlob::RawArray(vec![
            json!(["id", "name"]),
            json!([1, "ACME"]),
            json!([2, null]),
        ]);
        let codec = ColumnarCodec;
        assert!(codec.detect(&blob));
        assert_eq!(
            codec.decompress(&blob).expect("decompress"),
            json!([{"id": 1, "name": "ACME"}, {"id": 2}])
        );
    }

    #[test]
    fn test_roundtrip_subcategories() {
        let subcategories = vec![
            Subcategory {
                id: 10,
                category_id: 5,
                name: "Tornillos".to_string(),
                status: Some("A".to_string()),
            },
            Subcategory {
                id: 11,
                category_id: 5,
                name: "Tuercas".to_string(),
                status: None,
            },
        ];
        let value = serde_json::to_value(&subcategories).expect("to value");

        let registry = CompressionRegistry::default();
        let blob = ColumnarCodec.compress(&value).expect("compress");
        let result = registry
            .detect_and_decompress::<Vec<Subcategory>>(blob.into_value())
            .expect("decode");
        assert_eq!(result.algorithm, "columnar");
        assert_eq!(result.data, subcategories);
    }

    #[test]
    fn test_detect_rejects_plain_records() {
        let codec = ColumnarCodec;
        assert!(!codec.detect(&CompressedBlob::RawArray(vec![json!({"id": 1})])));
        assert!(!codec.detect(&CompressedBlob::RawArray(vec![])));
        assert!(!codec.detect(&CompressedBlob::RawArray(vec![json!([1, 2])])));
        assert!(!codec.detect(&CompressedBlob::RawArray(vec![
            json!(["id", "name"]),
            json!([1]),
        ])));
        assert!(!codec.detect(&CompressedBlob::Base64Text("x".to_string())));
    }

    #[test]
    fn test_empty_catalog_roundtrips() {
        let codec = ColumnarCodec;

        let blob = codec.compress(&json!([])).expect("compress empty");
        assert_eq!(blob, CompressedBlob::RawArray(vec![json!([])]));
        assert!(codec.detect(&blob));
        assert_eq!(codec.decompress(&blob).expect("decompress"), json!([]));

        let blob = codec.compress(&json!([{}, {}])).expect("compress fieldless");
        assert_eq!(codec.decompress(&blob).expect("decompress"), json!([{}, {}]));

        let registry = CompressionRegistry::default();
        let empty = codec.compress(&json!([])).expect("compress empty");
        let result = registry
            .detect_and_decompress::<Vec<Subcategory>>(empty.into_value())
            .expect("decode");
        assert_eq!(result.algorithm, "columnar");
        assert!(result.data.is_empty());
    }

    #[test]
    fn test_ragged_row_is_decoding_error() {
        let blob = CompressedBlob::RawArray(vec![json!(["id", "name"]), json!([1])]);
        let err = ColumnarCodec.decompress(&blob).expect_err("ragged row");
        assert_eq!(err.algorithm, "columnar");
    }

    #[test]
    fn test_compress_requires_objects() {
        assert!(ColumnarCodec.compress(&json!([1, 2])).is_err());
        assert!(ColumnarCodec.compress(&json!({"id": 1})).is_err());
    }
}
