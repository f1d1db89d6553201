//! Databag codec — key → JSON-string maps.
//!
//! The relation transport delivers every payload as a flat string map
//! where each value is itself JSON-encoded. Decoding first parses each
//! value, then deserializes the assembled object into the target type;
//! encoding is the exact inverse. Keys the transport injects on its own
//! are skipped on decode and never emitted on encode.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Keys owned by the relation transport, not part of any payload schema.
pub const BUILTIN_TRANSPORT_KEYS: [&str; 3] =
    ["ingress-address", "private-address", "egress-subnets"];

/// Errors raised while decoding or encoding a databag.
#[derive(Debug, Error)]
pub enum DatabagError {
    #[error("databag value for `{key}` is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("databag does not match the expected schema: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("payload must serialize to a JSON object")]
    NotAnObject,
}

/// Decode a databag into `T`.
pub fn decode_databag<T: DeserializeOwned>(
    bag: &BTreeMap<String, String>,
) -> Result<T, DatabagError> {
    let mut object = serde_json::Map::new();
    for (key, raw) in bag {
        if BUILTIN_TRANSPORT_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value: Value = serde_json::from_str(raw).map_err(|source| DatabagError::Json {
            key: key.clone(),
            source,
        })?;
        object.insert(key.clone(), value);
    }

    serde_json::from_value(Value::Object(object)).map_err(DatabagError::Schema)
}

/// Encode `value` as a databag.
pub fn encode_databag<T: Serialize>(value: &T) -> Result<BTreeMap<String, String>, DatabagError> {
    let Value::Object(object) = serde_json::to_value(value).map_err(DatabagError::Schema)? else {
        return Err(DatabagError::NotAnObject);
    };

    let mut bag = BTreeMap::new();
    for (key, field) in object {
        // Absent optional fields are omitted, not serialized as null.
        if field.is_null() {
            continue;
        }
        let raw = serde_json::to_string(&field).map_err(DatabagError::Schema)?;
        bag.insert(key, raw);
    }
    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        roles: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    }

    fn bag(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decodes_json_string_values() {
        let decoded: Payload = decode_databag(&bag(&[("roles", r#"["read","write"]"#)])).unwrap();
        assert_eq!(decoded.roles, vec!["read", "write"]);
        assert_eq!(decoded.note, None);
    }

    #[test]
    fn builtin_transport_keys_are_skipped() {
        let decoded: Payload = decode_databag(&bag(&[
            ("roles", r#"["read"]"#),
            ("ingress-address", "10.0.0.1"),
            ("egress-subnets", "10.0.0.0/24"),
        ]))
        .unwrap();
        assert_eq!(decoded.roles, vec!["read"]);
    }

    #[test]
    fn invalid_json_value_is_an_error() {
        let err = decode_databag::<Payload>(&bag(&[("roles", "not json")])).unwrap_err();
        assert!(matches!(err, DatabagError::Json { key, .. } if key == "roles"));
    }

    #[test]
    fn schema_violation_is_an_error() {
        let err = decode_databag::<Payload>(&bag(&[("roles", r#""read""#)])).unwrap_err();
        assert!(matches!(err, DatabagError::Schema(_)));
    }

    #[test]
    fn encode_then_decode_roundtrips() {
        let payload = Payload {
            roles: vec!["backend".to_string()],
            note: Some("hello".to_string()),
        };
        let encoded = encode_databag(&payload).unwrap();
        assert_eq!(encoded.get("roles").unwrap(), r#"["backend"]"#);

        let decoded: Payload = decode_databag(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn encode_rejects_non_objects() {
        let err = encode_databag(&vec!["a", "b"]).unwrap_err();
        assert!(matches!(err, DatabagError::NotAnObject));
    }
}
