// src/merge/mod.rs

//! Reconciliation of local and remote system purpose
//!
//! The merge treats the cache (the last state both sides agreed on) as
//! the common ancestor. Comparing each side against it tells which side
//! actually changed a field, so a stale local copy never overwrites a
//! fresh server-side edit and vice versa. Only when both sides changed
//! the same field to different values does [`ConflictPolicy`] decide.

mod detect;
mod three_way;

pub use detect::{detect_changed, ChangeSource, Changed};
pub use three_way::{three_way_merge, ChangeOrigin, DiffChange, MergeOutcome};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{Error, Result};

/// Which side wins when both changed the same field
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictPolicy {
    /// The entitlement server's value wins (default)
    #[default]
    Remote,
    /// The local file's value wins
    Local,
}

impl ConflictPolicy {
    /// Parse a policy name, accepting only "remote" and "local"
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| {
            Error::InvalidArgument(format!(
                "invalid conflict policy '{}': expected 'remote' or 'local'",
                name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names() {
        assert_eq!(ConflictPolicy::from_name("remote").unwrap(), ConflictPolicy::Remote);
        assert_eq!(ConflictPolicy::from_name("local").unwrap(), ConflictPolicy::Local);
        assert_eq!(ConflictPolicy::Local.to_string(), "local");
    }

    #[test]
    fn test_invalid_policy() {
        assert!(matches!(
            ConflictPolicy::from_name("server"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
