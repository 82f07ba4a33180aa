// src/attributes/mod.rs

//! System purpose attributes
//!
//! System purpose is a handful of business-facing attributes describing
//! the intended use of a subscribed system. Each participant in a sync
//! (local file, cache, entitlement server) holds them as a [`Contents`]
//! map, where every key is in one of three states:
//!
//! - absent: the participant does not know about the field at all
//! - falsy: the field is known and explicitly unset (`null`, `""`, `[]`)
//! - set: a concrete string or list of strings
//!
//! The distinction between "absent" and "falsy" is what lets the merge
//! tell an old server that never heard of a field apart from a user who
//! cleared it.

mod contents;
mod record;
mod value;

pub use contents::Contents;
pub use record::SyspurposeAttributes;
pub use value::Value;

use strum_macros::{AsRefStr, Display, EnumString};

/// The attributes the entitlement server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Role,
    Usage,
    ServiceLevelAgreement,
    Addons,
}

impl Field {
    /// Every known field, in display order
    pub const ALL: [Field; 4] = [
        Field::Role,
        Field::Usage,
        Field::ServiceLevelAgreement,
        Field::Addons,
    ];

    /// Name used by the entitlement server for this field
    pub fn server_name(self) -> &'static str {
        match self {
            Field::Role => "role",
            Field::Usage => "usage",
            Field::ServiceLevelAgreement => "serviceLevel",
            Field::Addons => "addOns",
        }
    }

    /// Look up a field by its server-side name
    pub fn from_server_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.server_name() == name)
    }

    /// Look up a field by its local name
    pub fn from_local_name(name: &str) -> Option<Field> {
        name.parse().ok()
    }

    /// Whether the field holds a list of values
    pub fn is_list(self) -> bool {
        matches!(self, Field::Addons)
    }

    /// The value written when the field is unset
    pub fn empty_value(self) -> Value {
        if self.is_list() {
            Value::List(Vec::new())
        } else {
            Value::Null
        }
    }
}
