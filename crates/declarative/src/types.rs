//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a resource: its type plus the name given in configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    pub resource_type: String,
    pub name: String,
}

impl Address {
    /// Create an address
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Parse `type.name`
    pub fn parse(s: &str) -> Option<Self> {
        let (resource_type, name) = s.split_once('.')?;
        if resource_type.is_empty() || name.is_empty() || name.contains('.') {
            return None;
        }
        Some(Self::new(resource_type, name))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Desired state of one resource, as declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub address: Address,
    /// Attribute document (a JSON object)
    pub attributes: serde_json::Value,
}

impl ResourceConfig {
    /// Create a resource config
    pub fn new(address: Address, attributes: serde_json::Value) -> Self {
        Self {
            address,
            attributes,
        }
    }
}

/// What a plan will do to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Declared but not in state
    Create,
    /// In state but a configured attribute differs; destroy then recreate
    Replace,
    /// In state but no longer declared
    Delete,
    /// Up to date
    NoOp,
}

impl Action {
    /// Check if the action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Plan symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Replace => "-/+",
            Self::Delete => "-",
            Self::NoOp => " ",
        }
    }
}

/// Result of applying or refreshing a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was destroyed and recreated
    Replaced,
    /// Resource was removed
    Removed,
    /// State was refreshed from the remote entity
    Refreshed,
    /// Remote entity no longer exists; state entry dropped
    Gone,
    /// Operation failed
    Failed { error: String },
    /// Operation was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change to remote entities
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Replaced | Self::Removed)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub replaced: usize,
    pub removed: usize,
    pub refreshed: usize,
    pub gone: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created
            + self.replaced
            + self.removed
            + self.refreshed
            + self.gone
            + self.skipped
            + self.failed
            + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.replaced += other.replaced;
        self.removed += other.removed;
        self.refreshed += other.refreshed;
        self.gone += other.gone;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Refreshed => self.refreshed += 1,
            ApplyResult::Gone => self.gone += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of resources reconciled in parallel
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let address = Address::parse("source_control.root").unwrap();
        assert_eq!(address.resource_type, "source_control");
        assert_eq!(address.name, "root");
        assert_eq!(address.to_string(), "source_control.root");

        assert!(Address::parse("source_control").is_none());
        assert!(Address::parse(".root").is_none());
        assert!(Address::parse("a.b.c").is_none());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::Gone);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());

        let mut other = ExecuteSummary::default();
        other.add_result(&ApplyResult::Removed);
        summary.merge(&other);
        assert_eq!(summary.removed, 1);
    }

    #[test]
    fn test_action_symbols() {
        assert_eq!(Action::Create.symbol(), "+");
        assert_eq!(Action::Replace.symbol(), "-/+");
        assert!(!Action::NoOp.is_change());
        assert!(Action::Delete.is_change());
    }
}
