//! Tolerant field decoders for JSON written by other programs.
//!
//! A field with an unexpected type decodes as `None` instead of failing the
//! whole record. Use with `#[serde(default, deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings as-is; numbers and booleans in their JSON spelling.
pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Booleans, plus the strings `"true"` and `"false"`.
pub(crate) fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "boolean")]
        flag: Option<bool>,
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_field() {
        assert_eq!(record(json!({"id": "abc"})).id.as_deref(), Some("abc"));
        assert_eq!(record(json!({"id": 12345})).id.as_deref(), Some("12345"));
        assert_eq!(record(json!({"id": true})).id.as_deref(), Some("true"));
        assert_eq!(record(json!({"id": {"nested": 1}})).id, None);
        assert_eq!(record(json!({"id": null})).id, None);
        assert_eq!(record(json!({})).id, None);
    }

    #[test]
    fn test_boolean_field() {
        assert_eq!(record(json!({"flag": true})).flag, Some(true));
        assert_eq!(record(json!({"flag": "true"})).flag, Some(true));
        assert_eq!(record(json!({"flag": "false"})).flag, Some(false));
        assert_eq!(record(json!({"flag": "yes"})).flag, None);
        assert_eq!(record(json!({"flag": 1})).flag, None);
    }
}
