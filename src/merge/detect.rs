// src/merge/detect.rs

//! Per-field change detection against the merge base.

use strum_macros::{AsRefStr, Display, EnumString};

use crate::attributes::{Contents, Value};

/// Which participant the compared map came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeSource {
    /// The local syspurpose file
    Local,
    /// The entitlement server
    Server,
}

/// Outcome of comparing one field against the base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Changed {
    Unchanged,
    Changed,
    /// The server doesn't report this field, so it has no opinion on it
    Unsupported,
}

impl Changed {
    /// True only for a definite change
    pub fn is_changed(self) -> bool {
        self == Changed::Changed
    }
}

impl From<bool> for Changed {
    fn from(changed: bool) -> Self {
        if changed {
            Changed::Changed
        } else {
            Changed::Unchanged
        }
    }
}

/// Classify whether `other[key]` differs from `base[key]`
///
/// A key missing from a server map is [`Changed::Unsupported`]. A key
/// missing from the local map means the user deleted it, which counts as
/// a change only if the base held a real value. Lists compare as sets and
/// all falsy values compare equal.
pub fn detect_changed(base: &Contents, other: &Contents, key: &str, source: ChangeSource) -> Changed {
    let Some(other_val) = other.get(key) else {
        return match source {
            ChangeSource::Server => Changed::Unsupported,
            ChangeSource::Local => base.is_set(key).into(),
        };
    };

    let base_val = base.get(key).unwrap_or(&Value::Null);
    (!base_val.same_as(other_val)).into()
}
