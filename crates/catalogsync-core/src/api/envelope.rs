use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::deserialize_flag;

/// Status code the backend uses for a successful reply.
pub const STATUS_OK: i64 = 200;

/// Wire-level wrapper around every backend reply.
///
/// When `compressed` is set, `data` holds a codec-specific encoding and must
/// go through the compression registry before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    #[serde(rename = "statusCode", default)]
    pub status_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub compressed: bool,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status_code: STATUS_OK,
            message: String::new(),
            data: Some(data),
            compressed: false,
        }
    }

    pub fn compressed(data: T) -> Self {
        Self {
            compressed: true,
            ..Self::ok(data)
        }
    }

    pub fn status(status_code: i64, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            data: None,
            compressed: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

impl ResponseEnvelope<Value> {
    /// True when `data` carries something worth decoding.
    pub fn has_data(&self) -> bool {
        match &self.data {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// The payload, or `None` when the reply counts as "no data".
    pub fn into_payload(self) -> Option<(Value, bool)> {
        if !self.is_success() || !self.has_data() {
            return None;
        }
        let compressed = self.compressed;
        self.data.map(|data| (data, compressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope_variants() {
        let env: ResponseEnvelope =
            serde_json::from_value(json!({"statusCode": 200, "message": "ok", "data": [1], "compressed": 1}))
                .expect("envelope");
        assert!(env.is_success());
        assert!(env.compressed);

        let env: ResponseEnvelope =
            serde_json::from_value(json!({"statusCode": 200, "data": [{"id": 1}]})).expect("envelope");
        assert!(!env.compressed);
        assert_eq!(env.message, "");

        let env: ResponseEnvelope =
            serde_json::from_value(json!({"statusCode": 200, "data": "abc", "compressed": "1"}))
                .expect("envelope");
        assert!(env.compressed);
    }

    #[test]
    fn test_no_data_cases() {
        let env: ResponseEnvelope = ResponseEnvelope::status(404, "not found");
        assert!(env.into_payload().is_none());

        let env: ResponseEnvelope = ResponseEnvelope::ok(json!([]));
        assert!(env.into_payload().is_none());

        let env: ResponseEnvelope = serde_json::from_value(json!({"statusCode": 200})).expect("envelope");
        assert!(env.into_payload().is_none());

        let env: ResponseEnvelope = ResponseEnvelope::ok(json!([{"id": 1}]));
        assert!(env.into_payload().is_some());
    }

    #[test]
    fn test_non_200_with_data_is_no_data() {
        let env: ResponseEnvelope =
            serde_json::from_value(json!({"statusCode": 204, "data": [{"id": 1}]})).expect("envelope");
        assert!(env.has_data());
        assert!(env.into_payload().is_none());
    }
}
