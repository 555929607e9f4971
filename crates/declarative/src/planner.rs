//! Execution planner - turns desired configuration and state into diffs

use crate::diff::{DiffSummary, ResourceDiff};
use crate::error::ReconcileError;
use crate::resource::Registry;
use crate::state::StateDocument;
use crate::types::{Address, ResourceConfig};
use std::collections::HashSet;

/// An ordered list of per-resource diffs
///
/// Declared resources come first in declaration order, followed by state
/// records that are no longer declared.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub diffs: Vec<ResourceDiff>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan converging `state` towards `desired`
    ///
    /// Every desired resource is validated first; the plan is only returned
    /// when all of them pass, so no remote call happens on bad configuration.
    pub fn build<C: ?Sized>(
        registry: &Registry<C>,
        desired: &[ResourceConfig],
        state: &StateDocument,
    ) -> Result<Self, Vec<(Address, ReconcileError)>> {
        let mut errors = Vec::new();
        let mut diffs = Vec::with_capacity(desired.len());
        let mut declared = HashSet::new();

        for config in desired {
            if !declared.insert(&config.address) {
                errors.push((
                    config.address.clone(),
                    ReconcileError::InvalidAttributes {
                        resource_type: config.address.resource_type.clone(),
                        message: format!("{} is declared more than once", config.address),
                    },
                ));
                continue;
            }

            let reconciler = match registry.get(&config.address.resource_type) {
                Ok(reconciler) => reconciler,
                Err(e) => {
                    errors.push((config.address.clone(), e));
                    continue;
                }
            };
            if let Err(e) = reconciler.validate(&config.attributes) {
                errors.push((config.address.clone(), e));
                continue;
            }

            diffs.push(ResourceDiff::compare(
                &config.address,
                &config.attributes,
                state.get(&config.address),
                reconciler.sensitive_attributes(),
            ));
        }

        for record in &state.resources {
            let address = record.address();
            if declared.contains(&address) {
                continue;
            }
            match registry.get(&record.resource_type) {
                Ok(reconciler) => {
                    diffs.push(ResourceDiff::removal(record, reconciler.sensitive_attributes()));
                }
                Err(e) => errors.push((address, e)),
            }
        }

        if errors.is_empty() {
            Ok(Self { diffs })
        } else {
            Err(errors)
        }
    }

    /// Plan deleting every recorded resource
    pub fn destroy<C: ?Sized>(
        registry: &Registry<C>,
        state: &StateDocument,
    ) -> Result<Self, Vec<(Address, ReconcileError)>> {
        let mut errors = Vec::new();
        let mut diffs = Vec::with_capacity(state.len());

        for record in &state.resources {
            match registry.get(&record.resource_type) {
                Ok(reconciler) => {
                    diffs.push(ResourceDiff::removal(record, reconciler.sensitive_attributes()));
                }
                Err(e) => errors.push((record.address(), e)),
            }
        }

        if errors.is_empty() {
            Ok(Self { diffs })
        } else {
            Err(errors)
        }
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ResourceDiff) -> bool,
    {
        Self {
            diffs: self.diffs.into_iter().filter(|d| predicate(d)).collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let target = Target::parse(t);
                self.filter(|d| target.matches(&d.address))
            }
        }
    }

    /// Diffs that change something
    pub fn changes(&self) -> impl Iterator<Item = &ResourceDiff> {
        self.diffs.iter().filter(|d| d.is_change())
    }

    /// Check if the plan changes anything
    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Summary counts
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(&self.diffs)
    }

    /// Total number of resources in the plan
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }
}

/// A `type` or `type.name` resource selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub resource_type: String,
    pub name: Option<String>,
}

impl Target {
    /// Parse a target string
    pub fn parse(target: &str) -> Self {
        match target.split_once('.') {
            Some((resource_type, name)) => Self {
                resource_type: resource_type.to_string(),
                name: Some(name.to_string()),
            },
            None => Self {
                resource_type: target.to_string(),
                name: None,
            },
        }
    }

    /// Check if an address is selected
    pub fn matches(&self, address: &Address) -> bool {
        address.resource_type == self.resource_type
            && self.name.as_ref().is_none_or(|n| *n == address.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::registry;
    use crate::state::StateRecord;
    use crate::types::Action;
    use serde_json::json;

    fn config(name: &str, attributes: serde_json::Value) -> ResourceConfig {
        ResourceConfig::new(Address::new("widget", name), attributes)
    }

    fn record(name: &str, left: &str) -> StateRecord {
        StateRecord {
            resource_type: "widget".into(),
            name: name.into(),
            id: format!("w-{name}"),
            attributes: json!({ "id": format!("w-{name}"), "left": left }),
        }
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            Target::parse("widget"),
            Target {
                resource_type: "widget".into(),
                name: None
            }
        );
        assert_eq!(Target::parse("widget.a").name.as_deref(), Some("a"));
        assert!(Target::parse("widget.a").matches(&Address::new("widget", "a")));
        assert!(!Target::parse("widget.a").matches(&Address::new("widget", "b")));
        assert!(Target::parse("widget").matches(&Address::new("widget", "b")));
        assert!(!Target::parse("gadget").matches(&Address::new("widget", "b")));
    }

    #[test]
    fn test_build_plan_actions() {
        let mut state = StateDocument::new();
        state.upsert(record("same", "x"));
        state.upsert(record("changed", "x"));
        state.upsert(record("orphan", "x"));

        let desired = vec![
            config("new", json!({ "left": "x" })),
            config("same", json!({ "left": "x" })),
            config("changed", json!({ "left": "y" })),
        ];

        let plan = ExecutionPlan::build(&registry(), &desired, &state).unwrap();
        let actions: Vec<Action> = plan.diffs.iter().map(|d| d.action).collect();
        assert_eq!(
            actions,
            vec![Action::Create, Action::NoOp, Action::Replace, Action::Delete]
        );
        assert_eq!(plan.diffs[3].address, Address::new("widget", "orphan"));

        let summary = plan.summary();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.unchanged, 1);
    }

    #[test]
    fn test_build_rejects_invalid_configuration() {
        let desired = vec![
            config("ok", json!({ "left": "x" })),
            config("both", json!({ "left": "x", "right": "y" })),
            ResourceConfig::new(Address::new("gadget", "g"), json!({})),
        ];

        let errors = ExecutionPlan::build(&registry(), &desired, &StateDocument::new()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].1, ReconcileError::Validation(_)));
        assert!(matches!(errors[1].1, ReconcileError::UnknownResourceType(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_addresses() {
        let desired = vec![
            config("a", json!({ "left": "x" })),
            config("a", json!({ "left": "y" })),
        ];
        let errors = ExecutionPlan::build(&registry(), &desired, &StateDocument::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_destroy_and_target_filter() {
        let mut state = StateDocument::new();
        state.upsert(record("a", "x"));
        state.upsert(record("b", "x"));

        let plan = ExecutionPlan::destroy(&registry(), &state).unwrap();
        assert!(plan.diffs.iter().all(|d| d.action == Action::Delete));
        assert_eq!(plan.len(), 2);

        let plan = plan.filter_by_target(Some("widget.b"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.diffs[0].address.name, "b");
        assert!(plan.has_changes());
    }
}
