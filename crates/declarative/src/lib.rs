//! # Declarative
//!
//! A framework for reconciling declared resources against a remote system.
//!
//! This crate knows nothing about any particular remote API. Resource types
//! plug in through the [`Reconciler`] trait and are looked up by name in a
//! [`Registry`]; the engine takes care of diffing, planning, parallel
//! execution and state bookkeeping.
//!
//! ## Core Concepts
//!
//! - **Reconciler**: Creates, reads and deletes one entity type, given a client
//! - **StateDocument**: The last known view of every managed resource
//! - **ExecutionPlan**: Per-resource diffs (create, replace, delete, no-op)
//! - **Executor**: Applies a plan with bounded parallelism, then updates state
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{AutoConfirm, ExecuteOptions, ExecutionPlan, NoProgress, Registry, execute};
//!
//! let registry = Registry::new().with(WidgetReconciler);
//! let plan = ExecutionPlan::build(&registry, &desired, &state)?;
//! let summary = execute(
//!     &plan,
//!     &registry,
//!     &client,
//!     &mut state,
//!     &ExecuteOptions::default(),
//!     &NoProgress,
//!     &mut AutoConfirm,
//! )?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates from worker threads
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod state;
pub mod types;
pub mod validate;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{AttributeChange, DiffSummary, ResourceDiff, group_by_type};
pub use error::{Diagnostic, ReconcileError, ValidationError};
pub use executor::{StateChange, execute, refresh};
pub use planner::{ExecutionPlan, Target};
pub use resource::{ErasedReconciler, ReadOutcome, Reconciler, Registry};
pub use state::{StateDocument, StateRecord};
pub use types::{
    Action, Address, ApplyResult, ExecuteOptions, ExecuteSummary, ResourceConfig,
};
