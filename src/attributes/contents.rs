// src/attributes/contents.rs

//! The attribute map held by each sync participant.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Field, Value};
use crate::error::{Error, Result};

/// Mapping from attribute name to value
///
/// Backed by a `BTreeMap` so serialized output always has sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contents(BTreeMap<String, Value>);

impl Contents {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of these contents without falsy entries
    pub fn truthy(&self) -> Contents {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_falsy())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether the entry under `key` exists and is not falsy
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_falsy())
    }

    /// Union of the keys of several maps
    pub fn union_keys<'a>(maps: &[&'a Contents]) -> BTreeSet<&'a str> {
        maps.iter().flat_map(|m| m.keys()).collect()
    }

    /// Check that known fields hold values of the right shape
    ///
    /// Scalar fields must be strings or null. `addons` may also be a
    /// single string, which `add` promotes to a list.
    pub fn check_known_fields(&self) -> std::result::Result<(), String> {
        for field in Field::ALL {
            let Some(value) = self.get(field.as_ref()) else {
                continue;
            };
            let ok = match value {
                Value::Null | Value::Text(_) => true,
                Value::List(_) => field.is_list(),
                Value::Other(_) => false,
            };
            if !ok {
                return Err(format!("field '{}' has an unexpected value: {}", field, value));
            }
        }
        Ok(())
    }

    /// Set `key` to `value`; returns whether anything changed
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        check_key(key)?;
        let value = value.into();
        let changed = self.get(key) != Some(&value);
        self.insert(key, value);
        Ok(changed)
    }

    /// Clear `key`, keeping it present with an empty value
    ///
    /// Returns whether the key previously held a value.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        check_key(key)?;
        let was_set = self.is_set(key);
        let empty = match Field::from_local_name(key) {
            Some(field) => field.empty_value(),
            None => Value::Null,
        };
        self.insert(key, empty);
        Ok(was_set)
    }

    /// Append `value` to the list under `key`
    ///
    /// A scalar already stored under `key` is kept as the first element of
    /// a new list rather than overwritten. Adding a value that is already
    /// present is not a change.
    pub fn add(&mut self, key: &str, value: impl Into<String>) -> Result<bool> {
        check_key(key)?;
        let value = value.into();
        let entry = self.0.entry(key.to_string()).or_insert(Value::Null);

        let mut items = match std::mem::replace(entry, Value::Null) {
            Value::Null => Vec::new(),
            Value::Text(s) if s.is_empty() => Vec::new(),
            Value::Text(s) => vec![s],
            Value::List(items) => items,
            Value::Other(json) => {
                *entry = Value::Other(json);
                return Err(Error::InvalidArgument(format!(
                    "cannot add to '{}': it does not hold a string or list",
                    key
                )));
            }
        };

        let added = !items.contains(&value);
        if added {
            items.push(value);
        }
        *entry = Value::List(items);
        Ok(added)
    }

    /// Remove `value` from the list under `key`
    ///
    /// A scalar equal to `value` is cleared to null. Returns whether the
    /// value was found.
    pub fn remove_value(&mut self, key: &str, value: &str) -> Result<bool> {
        check_key(key)?;
        let Some(entry) = self.0.get_mut(key) else {
            return Ok(false);
        };
        match entry {
            Value::Text(s) if s == value => {
                *entry = Value::Null;
                Ok(true)
            }
            Value::List(items) => match items.iter().position(|i| i == value) {
                Some(idx) => {
                    items.remove(idx);
                    Ok(true)
                }
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidArgument("attribute name must not be empty".to_string()));
    }
    Ok(())
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Contents {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Contents {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Contents {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
