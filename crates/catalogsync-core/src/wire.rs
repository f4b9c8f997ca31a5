//! Lenient decoding helpers for backend fields.
//!
//! The backend encodes flags as booleans, numbers (`0`/`1`) or short strings
//! (`"S"`/`"N"`, `"true"`), depending on the endpoint.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "s" | "si" | "y" | "yes" => Some(true),
            "0" | "false" | "n" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Deserialize a flag, treating null or unrecognized values as `false`.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flag_from_value(&value).unwrap_or(false))
}

/// Deserialize a flag, keeping "absent or unrecognized" distinct from `false`.
pub(crate) fn deserialize_optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flag_from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_from_value() {
        assert_eq!(flag_from_value(&json!(true)), Some(true));
        assert_eq!(flag_from_value(&json!(1)), Some(true));
        assert_eq!(flag_from_value(&json!(0)), Some(false));
        assert_eq!(flag_from_value(&json!("S")), Some(true));
        assert_eq!(flag_from_value(&json!("N")), Some(false));
        assert_eq!(flag_from_value(&json!("1")), Some(true));
        assert_eq!(flag_from_value(&json!(null)), None);
        assert_eq!(flag_from_value(&json!("maybe")), None);
    }
}
