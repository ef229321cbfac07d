//! # Value Adapter — The Document Tree Contract
//!
//! The binding engine reads and writes documents exclusively through the
//! [`Node`] trait. It inspects nodes during reads and only constructs new
//! nodes during writes; it never mutates a tree in place.
//!
//! `serde_json::Value` is the tree representation. The workspace enables
//! serde_json's `preserve_order` feature, so [`Node::make_object`] keeps the
//! key order it is given and writes follow schema field order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ErrorKind;

/// Kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// Any JSON number.
    Number,
    /// A JSON string.
    String,
    /// An ordered sequence of nodes.
    Array,
    /// A key → node mapping.
    Object,
}

impl NodeKind {
    /// Lowercase JSON name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal surface the engine needs from a JSON document tree.
///
/// Extraction methods are strict: they never coerce between kinds and
/// report [`ErrorKind::TypeMismatch`] (scalars) or
/// [`ErrorKind::MalformedStructure`] (containers) on the wrong kind.
///
/// Scalar accessors are named `*_value` so that method resolution never
/// picks `Value`'s inherent `as_bool`/`as_number`, which return `Option`.
pub trait Node: Sized {
    /// Kind of this node.
    fn node_kind(&self) -> NodeKind;

    /// Boolean payload.
    fn bool_value(&self) -> Result<bool, ErrorKind>;

    /// Numeric payload.
    fn number_value(&self) -> Result<&Number, ErrorKind>;

    /// String payload.
    fn string_value(&self) -> Result<&str, ErrorKind>;

    /// Children of an array node, in document order.
    fn array_children(&self) -> Result<&[Self], ErrorKind>;

    /// Member of an object node. `None` when the key is absent or the node
    /// is not an object.
    fn object_member(&self, key: &str) -> Option<&Self>;

    /// All members of an object node, in document order.
    fn object_members(&self) -> Result<Vec<(&str, &Self)>, ErrorKind>;

    /// `null`.
    fn make_null() -> Self;

    /// Boolean node.
    fn make_bool(value: bool) -> Self;

    /// Number node.
    fn make_number(value: Number) -> Self;

    /// String node.
    fn make_string(value: String) -> Self;

    /// Array node with children in the given order.
    fn make_array(children: Vec<Self>) -> Self;

    /// Object node with members in the given order.
    fn make_object(members: Vec<(String, Self)>) -> Self;

    /// Whether this node is `null`.
    fn is_null(&self) -> bool {
        self.node_kind() == NodeKind::Null
    }

    /// Floating-point node; non-finite values become `null`.
    fn make_f64(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => Self::make_number(n),
            None => Self::make_null(),
        }
    }
}

impl Node for Value {
    fn node_kind(&self) -> NodeKind {
        match self {
            Value::Null => NodeKind::Null,
            Value::Bool(_) => NodeKind::Bool,
            Value::Number(_) => NodeKind::Number,
            Value::String(_) => NodeKind::String,
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
        }
    }

    fn bool_value(&self) -> Result<bool, ErrorKind> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ErrorKind::type_mismatch("bool", other.node_kind())),
        }
    }

    fn number_value(&self) -> Result<&Number, ErrorKind> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(ErrorKind::type_mismatch("number", other.node_kind())),
        }
    }

    fn string_value(&self) -> Result<&str, ErrorKind> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ErrorKind::type_mismatch("string", other.node_kind())),
        }
    }

    fn array_children(&self) -> Result<&[Self], ErrorKind> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(ErrorKind::malformed("array", other.node_kind())),
        }
    }

    fn object_member(&self, key: &str) -> Option<&Self> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn object_members(&self) -> Result<Vec<(&str, &Self)>, ErrorKind> {
        match self {
            Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
            other => Err(ErrorKind::malformed("object", other.node_kind())),
        }
    }

    fn make_null() -> Self {
        Value::Null
    }

    fn make_bool(value: bool) -> Self {
        Value::Bool(value)
    }

    fn make_number(value: Number) -> Self {
        Value::Number(value)
    }

    fn make_string(value: String) -> Self {
        Value::String(value)
    }

    fn make_array(children: Vec<Self>) -> Self {
        Value::Array(children)
    }

    fn make_object(members: Vec<(String, Self)>) -> Self {
        let mut map = Map::with_capacity(members.len());
        for (key, value) in members {
            map.insert(key, value);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kinds() {
        assert_eq!(json!(null).node_kind(), NodeKind::Null);
        assert_eq!(json!(true).node_kind(), NodeKind::Bool);
        assert_eq!(json!(1.5).node_kind(), NodeKind::Number);
        assert_eq!(json!("s").node_kind(), NodeKind::String);
        assert_eq!(json!([]).node_kind(), NodeKind::Array);
        assert_eq!(json!({}).node_kind(), NodeKind::Object);
    }

    #[test]
    fn test_strict_scalar_extraction() {
        assert_eq!(json!(true).bool_value(), Ok(true));
        assert_eq!(
            json!("true").bool_value(),
            Err(ErrorKind::type_mismatch("bool", NodeKind::String))
        );
        assert!(json!(1).string_value().is_err());
        assert!(json!("1").number_value().is_err());
    }

    #[test]
    fn test_container_access() {
        let doc = json!({"a": [1, 2], "b": null});
        assert!(doc.object_member("a").is_some());
        assert!(doc.object_member("b").is_some_and(|n| n.is_null()));
        assert!(doc.object_member("c").is_none());
        assert_eq!(doc["a"].array_children().map(|c| c.len()), Ok(2));
        assert_eq!(
            doc.array_children().map(|c| c.len()),
            Err(ErrorKind::malformed("array", NodeKind::Object))
        );
        assert!(json!([1]).object_member("a").is_none());
    }

    #[test]
    fn test_make_object_preserves_order() {
        let node = Value::make_object(vec![
            ("z".to_string(), Value::make_bool(true)),
            ("a".to_string(), Value::make_null()),
            ("m".to_string(), Value::make_string("x".to_string())),
        ]);
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"z":true,"a":null,"m":"x"}"#
        );
        let keys: Vec<&str> = node
            .object_members()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_make_f64_non_finite_is_null() {
        assert!(Value::make_f64(f64::NAN).is_null());
        assert!(Value::make_f64(f64::INFINITY).is_null());
        assert_eq!(Value::make_f64(2.5), json!(2.5));
    }
}
