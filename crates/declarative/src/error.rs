//! Error types for reconciliation
//!
//! Validation failures are raised before any remote call. Everything the
//! remote side reports is carried as a [`Diagnostic`] so the user sees the
//! same summary/detail pair regardless of which entity type failed.

use std::fmt;

/// A user-facing error attached to one operation on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Short headline, e.g. "Error creating source control entry"
    pub summary: String,
    /// Full explanation, including the server's response body when there is one
    pub detail: String,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Desired-state record violates a configuration constraint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// None of a set of mutually exclusive attributes is set
    #[error("exactly one of [{}] must be set, none was", .fields.join(", "))]
    NoneSet { fields: Vec<String> },

    /// More than one of a set of mutually exclusive attributes is set
    #[error("exactly one of [{}] must be set, got {}", .fields.join(", "), .set.join(" and "))]
    MultipleSet { fields: Vec<String>, set: Vec<String> },

    /// A required attribute is missing or empty
    #[error("attribute \"{0}\" is required")]
    Missing(String),
}

/// Errors raised by reconcilers and the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Configuration constraint violated; no remote call was made
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// Remote operation failed
    #[error("{0}")]
    Diagnostic(Diagnostic),

    /// Attributes do not decode into the resource type's model
    #[error("invalid attributes for {resource_type}: {message}")]
    InvalidAttributes {
        resource_type: String,
        message: String,
    },

    /// No reconciler registered for this resource type
    #[error("unknown resource type \"{0}\"")]
    UnknownResourceType(String),
}

impl From<Diagnostic> for ReconcileError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Diagnostic(diagnostic)
    }
}
