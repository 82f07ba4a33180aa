// src/sync/report.rs

//! Human-readable summary of a sync.

use std::fmt;

use super::SyncResult;
use crate::attributes::Value;
use crate::merge::{ChangeOrigin, DiffChange};

/// Label used for changes that came from the entitlement server
pub const SERVER_SOURCE: &str = "Entitlement Server";

/// One line per field a sync changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    messages: Vec<String>,
}

impl SyncReport {
    pub fn from_result(result: &SyncResult) -> Self {
        let local_source = result.local_path.display().to_string();
        let messages = result
            .changes
            .iter()
            .filter(|change| change.is_effective())
            .map(|change| {
                let source = match change.source {
                    ChangeOrigin::Remote => SERVER_SOURCE,
                    ChangeOrigin::Local => local_source.as_str(),
                };
                describe(change, source)
            })
            .collect();
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

fn describe(change: &DiffChange, source: &str) -> String {
    let show = |v: &Option<Value>| v.as_ref().map(ToString::to_string).unwrap_or_default();

    if !change.in_result {
        format!("'{}' removed by change from {}", change.key, source)
    } else if !change.in_base {
        format!(
            "'{}' added with value '{}' from change in {}",
            change.key,
            show(&change.new_value),
            source
        )
    } else {
        format!(
            "'{}' updated from '{}' to '{}' due to change in {}",
            change.key,
            show(&change.previous_value),
            show(&change.new_value),
            source
        )
    }
}
