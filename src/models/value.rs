//! Configuration value union
//!
//! Every value visible through the store is exactly one of: a scalar from a
//! leaf document, a nested table from a leaf document, or a shared reference
//! to a child node. Consumers pattern-match the closed set instead of
//! probing runtime types.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::store::ConfigNode;

/// A single value held by a configuration node
#[derive(Debug, Clone)]
pub enum ConfigValue {
    /// Non-object document value: string, number, boolean, null, or array
    Scalar(serde_json::Value),
    /// Nested table from a leaf document
    Map(serde_json::Map<String, serde_json::Value>),
    /// Child configuration node, shared by reference
    Node(Arc<ConfigNode>),
}

impl ConfigValue {
    /// String contents, if this is a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(value) => value.as_str(),
            _ => None,
        }
    }

    /// Integer contents, if this is an integer scalar
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Scalar(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Boolean contents, if this is a boolean scalar
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Scalar(value) => value.as_bool(),
            _ => None,
        }
    }

    /// The nested table, if this is a map value
    pub fn as_map(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            ConfigValue::Map(members) => Some(members),
            _ => None,
        }
    }

    /// The child node, if this value is a node reference
    pub fn as_node(&self) -> Option<&Arc<ConfigNode>> {
        match self {
            ConfigValue::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Whether this value is a child node reference
    pub fn is_node(&self) -> bool {
        matches!(self, ConfigValue::Node(_))
    }
}

/// Scalars and maps compare by contents; node references compare by
/// identity, the same guarantee the refresh engine preserves for
/// unchanged subtrees.
impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigValue::Scalar(a), ConfigValue::Scalar(b)) => a == b,
            (ConfigValue::Map(a), ConfigValue::Map(b)) => a == b,
            (ConfigValue::Node(a), ConfigValue::Node(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(members) => ConfigValue::Map(members),
            other => ConfigValue::Scalar(other),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Scalar(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Scalar(serde_json::Value::String(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Scalar(serde_json::Value::Bool(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Scalar(serde_json::Value::Number(value.into()))
    }
}

impl From<Arc<ConfigNode>> for ConfigValue {
    fn from(node: Arc<ConfigNode>) -> Self {
        ConfigValue::Node(node)
    }
}

/// Node references render as their current contents, so serializing a
/// snapshot deep-renders the subtree it spans.
impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Scalar(value) => value.serialize(serializer),
            ConfigValue::Map(members) => members.serialize(serializer),
            ConfigValue::Node(node) => {
                let snapshot = node.to_map();
                let mut map = serializer.serialize_map(Some(snapshot.len()))?;
                for (key, value) in &snapshot {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_values_become_maps() {
        let value = ConfigValue::from(json!({"region": "us-east-1"}));
        assert!(value.as_map().is_some());
        assert_eq!(value.as_map().unwrap()["region"], json!("us-east-1"));
    }

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(ConfigValue::from("testvalue0").as_str(), Some("testvalue0"));
        assert_eq!(ConfigValue::from(42i64).as_i64(), Some(42));
        assert_eq!(ConfigValue::from(true).as_bool(), Some(true));
        assert_eq!(ConfigValue::from("text").as_i64(), None);
    }

    #[test]
    fn test_scalars_compare_by_contents() {
        assert_eq!(ConfigValue::from("a"), ConfigValue::from("a"));
        assert_ne!(ConfigValue::from("a"), ConfigValue::from("b"));
        assert_ne!(ConfigValue::from("1"), ConfigValue::from(1i64));
    }

    #[test]
    fn test_scalar_serialization() {
        let rendered = serde_json::to_string(&ConfigValue::from("testvalue0")).unwrap();
        assert_eq!(rendered, "\"testvalue0\"");
    }
}
