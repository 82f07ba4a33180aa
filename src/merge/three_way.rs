// src/merge/three_way.rs

//! Three-way merge of local, cached and remote attributes.

use std::fmt;

use strum_macros::{AsRefStr, Display};
use tracing::debug;

use super::detect::{detect_changed, ChangeSource, Changed};
use super::ConflictPolicy;
use crate::attributes::{Contents, Value};

/// Where the merged value of a field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeOrigin {
    Local,
    Remote,
}

/// A field whose merged value moved away from the base
#[derive(Debug, Clone, PartialEq)]
pub struct DiffChange {
    pub key: String,
    pub source: ChangeOrigin,
    pub previous_value: Option<Value>,
    pub new_value: Option<Value>,
    pub in_base: bool,
    pub in_result: bool,
}

impl DiffChange {
    /// Whether the field ended up with a different value than the base
    pub fn is_effective(&self) -> bool {
        match (&self.previous_value, &self.new_value) {
            (Some(prev), Some(new)) => !prev.same_as(new),
            (None, None) => false,
            _ => true,
        }
    }
}

impl fmt::Display for DiffChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<Value>| match v {
            Some(v) => format!("'{}'", v),
            None => "<absent>".to_string(),
        };
        write!(
            f,
            "{}: {} -> {} (from {})",
            self.key,
            show(&self.previous_value),
            show(&self.new_value),
            self.source
        )
    }
}

/// Result of [`three_way_merge`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// The reconciled attributes
    pub result: Contents,

    /// Fields changed on either side, with their provenance
    pub changes: Vec<DiffChange>,

    /// Fields where local and remote changed to different values
    pub conflicts: Vec<String>,
}

/// Merge `local` and `remote` using `base` as the common ancestor
///
/// For every key seen in any of the three maps:
///
/// - a side that left the field equal to the base has no opinion on it
/// - a field the remote doesn't report is owned by local
/// - a field changed on one side takes that side's value
/// - a field cleared on both sides keeps the remote's empty value, so the
///   result still records "explicitly cleared"
/// - a field changed to different values on both sides is a conflict,
///   settled by `on_conflict`; if the winner lacks the key it is dropped
///
/// Lists are never merged element-wise: the winning list replaces the
/// other wholesale.
pub fn three_way_merge(
    local: &Contents,
    base: &Contents,
    remote: &Contents,
    on_conflict: ConflictPolicy,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for key in Contents::union_keys(&[local, base, remote]) {
        let local_changed = detect_changed(base, local, key, ChangeSource::Local);
        let remote_changed = detect_changed(base, remote, key, ChangeSource::Server);

        let (origin, value) = match (local_changed, remote_changed) {
            (Changed::Changed, Changed::Changed) => {
                let local_val = local.get(key);
                let remote_val = remote.get(key);
                let local_cleared = local_val.is_none_or(Value::is_falsy);
                let remote_cleared = remote_val.is_some_and(Value::is_falsy);

                if local_cleared && remote_cleared {
                    (ChangeOrigin::Remote, remote_val)
                } else if local_val.zip(remote_val).is_some_and(|(l, r)| l.same_as(r)) {
                    (ChangeOrigin::Remote, remote_val)
                } else {
                    debug!("Conflicting changes to '{}', {} wins", key, on_conflict);
                    outcome.conflicts.push(key.to_string());
                    match on_conflict {
                        ConflictPolicy::Remote => (ChangeOrigin::Remote, remote_val),
                        ConflictPolicy::Local => (ChangeOrigin::Local, local_val),
                    }
                }
            }
            (_, Changed::Unsupported) => (ChangeOrigin::Local, local.get(key)),
            (_, Changed::Changed) => (ChangeOrigin::Remote, remote.get(key)),
            (Changed::Changed, Changed::Unchanged) => (ChangeOrigin::Local, local.get(key)),
            (_, Changed::Unchanged) => match remote.get(key) {
                Some(value) => (ChangeOrigin::Remote, Some(value)),
                None => (ChangeOrigin::Local, local.get(key).or_else(|| base.get(key))),
            },
        };

        if let Some(value) = value {
            outcome.result.insert(key, value.clone());
        }

        if local_changed.is_changed() || remote_changed.is_changed() {
            outcome.changes.push(DiffChange {
                key: key.to_string(),
                source: origin,
                previous_value: base.get(key).cloned(),
                new_value: value.cloned(),
                in_base: base.contains_key(key),
                in_result: value.is_some(),
            });
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(pairs: &[(&str, &str)]) -> Contents {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_empty_merge() {
        let empty = Contents::new();
        let outcome = three_way_merge(&empty, &empty, &empty, ConflictPolicy::Remote);
        assert!(outcome.result.is_empty());
        assert!(outcome.changes.is_empty());
    }

    #[test]
    fn test_merge_without_conflict() {
        let local = contents(&[("B", "local")]);
        let base = contents(&[("C", "base")]);
        let remote = contents(&[("A", "remote"), ("C", "remote")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        assert_eq!(
            outcome.result,
            contents(&[("A", "remote"), ("B", "local"), ("C", "remote")])
        );
    }

    #[test]
    fn test_concurrent_change_remote_wins_by_default() {
        let local = contents(&[("C", "local")]);
        let base = contents(&[("C", "base")]);
        let remote = contents(&[("C", "remote")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::default());
        assert_eq!(outcome.result, contents(&[("C", "remote")]));
        assert_eq!(outcome.conflicts, vec!["C"]);
    }

    #[test]
    fn test_concurrent_change_local_policy() {
        let local = contents(&[("C", "local")]);
        let base = contents(&[("C", "base")]);
        let remote = contents(&[("C", "remote")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Local);
        assert_eq!(outcome.result, contents(&[("C", "local")]));
        assert_eq!(outcome.changes[0].source, ChangeOrigin::Local);
    }

    #[test]
    fn test_local_change_wins_over_unchanged_remote() {
        let local = contents(&[("role", "Bar")]);
        let base = contents(&[("role", "Foo")]);
        let remote = contents(&[("role", "Foo")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        assert_eq!(outcome.result, contents(&[("role", "Bar")]));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_remote_change_wins_over_unchanged_local() {
        let local = contents(&[("role", "Foo")]);
        let base = contents(&[("role", "Foo")]);
        let remote = contents(&[("role", "Baz")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Local);
        assert_eq!(outcome.result, contents(&[("role", "Baz")]));
        assert_eq!(outcome.changes[0].source, ChangeOrigin::Remote);
    }

    #[test]
    fn test_cleared_on_both_sides_keeps_remote_falsy() {
        let local = Contents::new();
        let base = contents(&[("usage", "Production")]);
        let remote = contents(&[("usage", "")]);

        for policy in [ConflictPolicy::Remote, ConflictPolicy::Local] {
            let outcome = three_way_merge(&local, &base, &remote, policy);
            assert_eq!(outcome.result, contents(&[("usage", "")]));
            assert!(outcome.conflicts.is_empty());
        }
    }

    #[test]
    fn test_unsupported_field_is_controlled_by_local() {
        let local = contents(&[("addons", "x")]);
        let base = contents(&[("addons", "y")]);
        let remote = contents(&[("role", "Server")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        assert_eq!(outcome.result.get("addons"), Some(&Value::from("x")));

        let outcome = three_way_merge(&Contents::new(), &base, &remote, ConflictPolicy::Remote);
        assert!(!outcome.result.contains_key("addons"));
    }

    #[test]
    fn test_lists_replaced_wholesale() {
        let mut local = Contents::new();
        local.insert("addons", vec!["a".to_string(), "local".to_string()]);
        let mut base = Contents::new();
        base.insert("addons", vec!["a".to_string()]);
        let mut remote = Contents::new();
        remote.insert("addons", vec!["a".to_string(), "remote".to_string()]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        assert_eq!(
            outcome.result.get("addons"),
            Some(&Value::List(vec!["a".to_string(), "remote".to_string()]))
        );
    }

    #[test]
    fn test_reordered_list_is_not_a_change() {
        let mut local = Contents::new();
        local.insert("addons", vec!["b".to_string(), "a".to_string()]);
        let mut base = Contents::new();
        base.insert("addons", vec!["a".to_string(), "b".to_string()]);

        let outcome = three_way_merge(&local, &base, &base.clone(), ConflictPolicy::Remote);
        assert!(outcome.changes.is_empty());
        assert!(outcome.result.contains_key("addons"));
    }

    #[test]
    fn test_conflict_with_missing_winner_drops_key() {
        let local = Contents::new();
        let base = contents(&[("role", "Foo")]);
        let remote = contents(&[("role", "Bar")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Local);
        assert!(!outcome.result.contains_key("role"));
        assert!(!outcome.changes[0].in_result);
    }

    #[test]
    fn test_same_change_on_both_sides_is_not_a_conflict() {
        let local = contents(&[("role", "New")]);
        let remote = contents(&[("role", "New")]);

        let outcome = three_way_merge(&local, &Contents::new(), &remote, ConflictPolicy::Local);
        assert_eq!(outcome.result, contents(&[("role", "New")]));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_changes_record_provenance() {
        let local = contents(&[("B", "local")]);
        let base = contents(&[("C", "base")]);
        let remote = contents(&[("A", "remote"), ("C", "remote")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        let a = outcome.changes.iter().find(|c| c.key == "A").unwrap();
        assert_eq!(a.source, ChangeOrigin::Remote);
        assert!(!a.in_base && a.in_result);

        let b = outcome.changes.iter().find(|c| c.key == "B").unwrap();
        assert_eq!(b.source, ChangeOrigin::Local);
        assert!(b.is_effective());
    }

    #[test]
    fn test_unchanged_fields_record_no_change() {
        let local = contents(&[("role", "Server"), ("usage", "Dev")]);
        let base = contents(&[("role", "Server"), ("usage", "Production")]);
        let remote = contents(&[("role", "Server"), ("usage", "Production")]);

        let outcome = three_way_merge(&local, &base, &remote, ConflictPolicy::Remote);
        assert_eq!(outcome.result.get("role"), Some(&Value::from("Server")));
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].key, "usage");
        assert_eq!(outcome.changes[0].source, ChangeOrigin::Local);
    }
}
