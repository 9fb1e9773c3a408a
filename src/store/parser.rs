//! Leaf document parser
//!
//! A leaf configuration file is a JSON document whose top level is an
//! object; each member becomes one key in the owning node's map. Anything
//! else is a parse failure the refresh engine absorbs without touching the
//! node's cached contents.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::ConfigValue;

/// Why a leaf document could not be turned into a key/value map
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document root must be an object, found {0}")]
    NotAnObject(&'static str),
}

/// Parse one leaf document into a key/value map
pub fn parse_document(content: &str) -> Result<HashMap<String, ConfigValue>, ParseError> {
    let document: serde_json::Value = serde_json::from_str(content)?;

    let members = match document {
        serde_json::Value::Object(members) => members,
        other => return Err(ParseError::NotAnObject(json_type_name(&other))),
    };

    Ok(members
        .into_iter()
        .map(|(key, value)| (key, ConfigValue::from(value)))
        .collect())
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_document() {
        let entries = parse_document(r#"{"testkey": "testvalue0"}"#).unwrap();
        assert_eq!(entries["testkey"].as_str(), Some("testvalue0"));
    }

    #[test]
    fn test_parse_nested_table() {
        let entries = parse_document(r#"{"aws": {"region": "us-east-1", "zones": 3}}"#).unwrap();
        let table = entries["aws"].as_map().unwrap();
        assert_eq!(table["region"], serde_json::json!("us-east-1"));
        assert_eq!(table["zones"], serde_json::json!(3));
    }

    #[test]
    fn test_parse_mixed_scalars() {
        let entries =
            parse_document(r#"{"enabled": true, "count": 7, "name": "svc", "extra": null}"#)
                .unwrap();
        assert_eq!(entries["enabled"].as_bool(), Some(true));
        assert_eq!(entries["count"].as_i64(), Some(7));
        assert_eq!(entries["name"].as_str(), Some("svc"));
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(matches!(
            parse_document("bad json"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = parse_document(r#"["a", "b"]"#).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_rejects_empty_content() {
        assert!(parse_document("").is_err());
    }
}
