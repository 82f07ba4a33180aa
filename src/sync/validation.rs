// src/sync/validation.rs

//! Advisory checks of edits against the server's valid fields.

use std::fmt;

use crate::remote::ValidFields;

/// An edit the server's organization may not recognise
///
/// Warnings never block the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Some values are not in the advertised list
    InvalidValues {
        key: String,
        values: Vec<String>,
        valid: Vec<String>,
    },
    /// The organization advertises no values for the field
    NoValidValues { key: String },
    /// The field is not in the advertised schema
    UnknownKey { key: String },
}

impl ValidationWarning {
    pub fn key(&self) -> &str {
        match self {
            ValidationWarning::InvalidValues { key, .. }
            | ValidationWarning::NoValidValues { key }
            | ValidationWarning::UnknownKey { key } => key,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::InvalidValues { key, values, valid } => {
                let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                let (noun, verb) = if values.len() == 1 {
                    ("value", "is")
                } else {
                    ("values", "are")
                };
                write!(
                    f,
                    "Provided {} {} {} not included in the list of valid values for \"{}\"",
                    noun,
                    friendly_join(&quoted),
                    verb,
                    key
                )?;
                if !valid.is_empty() {
                    write!(f, ": {}", valid.join(", "))?;
                }
                Ok(())
            }
            ValidationWarning::NoValidValues { key } => write!(
                f,
                "This organization does not have any subscriptions that provide a system purpose \"{key}\". \
                 This setting will not influence auto-attaching subscriptions."
            ),
            ValidationWarning::UnknownKey { key } => write!(
                f,
                "\"{key}\" is not a system purpose attribute known to the entitlement server"
            ),
        }
    }
}

/// Check `values` for `key` against the advertised valid fields
///
/// Comparison is case-insensitive.
pub fn check_values(valid: &ValidFields, key: &str, values: &[String]) -> Option<ValidationWarning> {
    let Some(accepted) = valid.get(key) else {
        return Some(ValidationWarning::UnknownKey { key: key.to_string() });
    };

    if accepted.is_empty() {
        return Some(ValidationWarning::NoValidValues { key: key.to_string() });
    }

    let invalid: Vec<String> = values
        .iter()
        .filter(|v| !valid.accepts(key, v))
        .cloned()
        .collect();

    (!invalid.is_empty()).then(|| ValidationWarning::InvalidValues {
        key: key.to_string(),
        values: invalid,
        valid: accepted.to_vec(),
    })
}

/// Join items as "a", "a and b" or "a, b and c"
fn friendly_join(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn valid_fields() -> ValidFields {
        let mut raw = BTreeMap::new();
        raw.insert("role".to_string(), vec!["Server".to_string(), "Desktop".to_string()]);
        raw.insert("usage".to_string(), vec![]);
        ValidFields::new(raw)
    }

    #[test]
    fn test_valid_value_case_insensitive() {
        assert_eq!(check_values(&valid_fields(), "role", &["SERVER".to_string()]), None);
    }

    #[test]
    fn test_invalid_value() {
        let warning = check_values(&valid_fields(), "role", &["Laptop".to_string()]).unwrap();
        assert_eq!(warning.key(), "role");
        assert!(warning.to_string().starts_with("Provided value \"Laptop\" is not included"));
    }

    #[test]
    fn test_multiple_invalid_values() {
        let values = ["a".to_string(), "Server".to_string(), "b".to_string()];
        let warning = check_values(&valid_fields(), "role", &values).unwrap();
        match &warning {
            ValidationWarning::InvalidValues { values, .. } => assert_eq!(values, &["a", "b"]),
            other => panic!("unexpected warning {other:?}"),
        }
        assert!(warning.to_string().contains("\"a\" and \"b\" are not"));
    }

    #[test]
    fn test_no_valid_values() {
        assert_eq!(
            check_values(&valid_fields(), "usage", &["Production".to_string()]),
            Some(ValidationWarning::NoValidValues { key: "usage".to_string() })
        );
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            check_values(&valid_fields(), "flavor", &["x".to_string()]),
            Some(ValidationWarning::UnknownKey { key: "flavor".to_string() })
        );
    }

    #[test]
    fn test_friendly_join() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(friendly_join(&items), "a, b and c");
        assert_eq!(friendly_join(&items[..1]), "a");
    }
}
