// src/attributes/value.rs

//! A single attribute value.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of one system purpose attribute
///
/// Known fields only ever hold `Null`, `Text` or `List`. `Other` keeps
/// whatever a newer tool wrote under a key this crate doesn't know, so it
/// survives a read/write cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Null,
    Text(String),
    List(Vec<String>),
    Other(serde_json::Value),
}

impl Value {
    /// Whether this value means "known, but unset"
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Other(json) => match json {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(b) => !b,
                serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
            },
        }
    }

    /// Semantic equality used for change detection
    ///
    /// Two falsy values are equal regardless of representation, and lists
    /// are compared as sets.
    pub fn same_as(&self, other: &Value) -> bool {
        if self.is_falsy() && other.is_falsy() {
            return true;
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            (a, b) => a == b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) if items.iter().all(|i| i.is_string()) => Value::List(
                items
                    .into_iter()
                    .filter_map(|i| match i {
                        serde_json::Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Value::Other(other),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::String).collect())
            }
            Value::Other(json) => json,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<&[&str]> for Value {
    fn from(items: &[&str]) -> Self {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "{}", items.join(", ")),
            Value::Other(json) => write!(f, "{}", json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        assert!(Value::Null.is_falsy());
        assert!(Value::from("").is_falsy());
        assert!(Value::List(vec![]).is_falsy());
        assert!(Value::Other(json!({})).is_falsy());
        assert!(Value::Other(json!(false)).is_falsy());
        assert!(!Value::from("Server").is_falsy());
        assert!(!Value::Other(json!(3)).is_falsy());
    }

    #[test]
    fn test_lists_compare_as_sets() {
        let a = Value::from(&["a", "b"][..]);
        let b = Value::from(&["b", "a"][..]);
        assert!(a.same_as(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_falsy_values_are_the_same() {
        assert!(Value::Null.same_as(&Value::from("")));
        assert!(Value::List(vec![]).same_as(&Value::Null));
        assert!(!Value::Null.same_as(&Value::from("x")));
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(Value::from(json!(null)), Value::Null);
        assert_eq!(Value::from(json!(["x", "y"])), Value::from(&["x", "y"][..]));
        assert_eq!(Value::from(json!([1, "y"])), Value::Other(json!([1, "y"])));
        assert_eq!(serde_json::Value::from(Value::from("Ρόλος")), json!("Ρόλος"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(&["ADDON1", "ADDON2"][..]).to_string(), "ADDON1, ADDON2");
        assert_eq!(Value::Null.to_string(), "");
    }
}
