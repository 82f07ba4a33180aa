// src/attributes/record.rs

//! Typed view of the known attributes.

use std::collections::BTreeMap;

use super::{Contents, Field, Value};
use crate::error::Error;

/// The four known attributes plus anything else found in the map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyspurposeAttributes {
    pub role: Option<String>,
    pub usage: Option<String>,
    pub service_level_agreement: Option<String>,
    pub addons: Vec<String>,

    /// Keys this crate doesn't know, kept for forward compatibility
    pub extra: BTreeMap<String, Value>,
}

impl SyspurposeAttributes {
    /// Get a scalar field; empty strings read as unset
    pub fn scalar(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Role => &self.role,
            Field::Usage => &self.usage,
            Field::ServiceLevelAgreement => &self.service_level_agreement,
            Field::Addons => return None,
        };
        value.as_deref().filter(|s| !s.is_empty())
    }

    /// Convert back into a map, leaving unset fields out
    pub fn to_contents(&self) -> Contents {
        let mut contents: Contents = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for field in [Field::Role, Field::Usage, Field::ServiceLevelAgreement] {
            if let Some(v) = self.scalar(field) {
                contents.insert(field.as_ref(), v);
            }
        }
        if !self.addons.is_empty() {
            contents.insert(Field::Addons.as_ref(), self.addons.clone());
        }
        contents
    }
}

impl TryFrom<&Contents> for SyspurposeAttributes {
    type Error = Error;

    fn try_from(contents: &Contents) -> Result<Self, Self::Error> {
        let mut attrs = SyspurposeAttributes::default();

        for (key, value) in contents {
            let Some(field) = Field::from_local_name(key) else {
                attrs.extra.insert(key.clone(), value.clone());
                continue;
            };
            let wrong_type = || {
                Error::InvalidArgument(format!("'{}' cannot hold the value {}", key, value))
            };
            match field {
                Field::Addons => {
                    attrs.addons = match value {
                        Value::Null => Vec::new(),
                        Value::Text(s) if s.is_empty() => Vec::new(),
                        Value::Text(s) => vec![s.clone()],
                        Value::List(items) => items.clone(),
                        Value::Other(_) => return Err(wrong_type()),
                    };
                }
                scalar => {
                    let text = match value {
                        Value::Null => None,
                        Value::Text(s) => Some(s.clone()),
                        _ => return Err(wrong_type()),
                    };
                    match scalar {
                        Field::Role => attrs.role = text,
                        Field::Usage => attrs.usage = text,
                        _ => attrs.service_level_agreement = text,
                    }
                }
            }
        }

        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_contents() {
        let mut c = Contents::new();
        c.insert("role", "Server");
        c.insert("addons", vec!["a".to_string()]);
        c.insert("service_level_agreement", Value::Null);
        c.insert("future_field", "kept");

        let attrs = SyspurposeAttributes::try_from(&c).unwrap();
        assert_eq!(attrs.role.as_deref(), Some("Server"));
        assert_eq!(attrs.addons, vec!["a"]);
        assert_eq!(attrs.service_level_agreement, None);
        assert_eq!(attrs.extra.get("future_field"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_wrong_type_is_invalid_argument() {
        let mut c = Contents::new();
        c.insert("usage", vec!["Production".to_string()]);
        assert!(matches!(
            SyspurposeAttributes::try_from(&c),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_to_contents_skips_unset() {
        let attrs = SyspurposeAttributes {
            role: Some("Server".to_string()),
            usage: Some(String::new()),
            ..Default::default()
        };
        let c = attrs.to_contents();
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("role"), Some(&Value::from("Server")));
    }
}
