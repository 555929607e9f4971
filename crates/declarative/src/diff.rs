//! Diff computation between desired configuration and recorded state

use crate::state::StateRecord;
use crate::types::{Action, Address};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes never compared; they are computed, not configured
const COMPUTED_ATTRIBUTES: &[&str] = &["id"];

/// One attribute that differs between state and configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    /// Recorded value, `None` if the attribute is not recorded
    pub before: Option<serde_json::Value>,
    /// Configured value, `None` if the attribute is being removed
    pub after: Option<serde_json::Value>,
    /// Whether the value must be masked when displayed
    pub sensitive: bool,
}

/// A planned change to one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub address: Address,
    pub action: Action,
    /// Identifier of the recorded resource, if there is one
    pub id: Option<String>,
    /// Attribute-level changes, for display
    pub changes: Vec<AttributeChange>,
    /// Desired attribute document; `None` for deletes
    pub desired: Option<serde_json::Value>,
}

impl ResourceDiff {
    /// Diff a declared resource against its state record
    pub fn compare(
        address: &Address,
        desired: &serde_json::Value,
        recorded: Option<&StateRecord>,
        sensitive: &[&str],
    ) -> Self {
        let Some(record) = recorded else {
            return Self {
                address: address.clone(),
                action: Action::Create,
                id: None,
                changes: configured(desired)
                    .map(|(name, value)| AttributeChange {
                        name: name.clone(),
                        before: None,
                        after: Some(value.clone()),
                        sensitive: sensitive.contains(&name.as_str()),
                    })
                    .collect(),
                desired: Some(desired.clone()),
            };
        };

        let changes: Vec<AttributeChange> = configured(desired)
            .filter_map(|(name, value)| {
                let before = record.attributes.get(name).filter(|v| !v.is_null());
                (before != Some(value)).then(|| AttributeChange {
                    name: name.clone(),
                    before: before.cloned(),
                    after: Some(value.clone()),
                    sensitive: sensitive.contains(&name.as_str()),
                })
            })
            .collect();

        let action = if changes.is_empty() {
            Action::NoOp
        } else {
            Action::Replace
        };

        Self {
            address: address.clone(),
            action,
            id: Some(record.id.clone()),
            changes,
            desired: Some(desired.clone()),
        }
    }

    /// Diff for a state record that is no longer declared
    pub fn removal(record: &StateRecord, sensitive: &[&str]) -> Self {
        Self {
            address: record.address(),
            action: Action::Delete,
            id: Some(record.id.clone()),
            changes: configured(&record.attributes)
                .map(|(name, value)| AttributeChange {
                    name: name.clone(),
                    before: Some(value.clone()),
                    after: None,
                    sensitive: sensitive.contains(&name.as_str()),
                })
                .collect(),
            desired: None,
        }
    }

    /// Check if the diff changes anything
    pub fn is_change(&self) -> bool {
        self.action.is_change()
    }
}

/// Non-null, non-computed attributes of a document
fn configured(
    document: &serde_json::Value,
) -> impl Iterator<Item = (&String, &serde_json::Value)> {
    document
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(name, value)| !value.is_null() && !COMPUTED_ATTRIBUTES.contains(&name.as_str()))
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub create: usize,
    pub replace: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.create += 1,
                Action::Replace => summary.replace += 1,
                Action::Delete => summary.delete += 1,
                Action::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.create + self.replace + self.delete
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.address.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
