//! Execution engine - applies plans and refreshes state with bounded parallelism
//!
//! Workers never touch the [`StateDocument`]. Each one returns its result
//! together with the [`StateChange`] it implies, and the changes are applied
//! in plan order once the pool has drained.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::error::ReconcileError;
use crate::planner::{ExecutionPlan, Target};
use crate::resource::{ErasedReconciler, ReadOutcome, Registry};
use crate::state::{StateDocument, StateRecord};
use crate::types::{Action, Address, ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Mutation of the state document produced by one worker
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Record (or replace) this resource
    Upsert(StateRecord),
    /// Forget this resource
    Remove(Address),
    /// Leave state untouched
    Keep,
}

impl StateChange {
    fn apply(self, state: &mut StateDocument) {
        match self {
            Self::Upsert(record) => state.upsert(record),
            Self::Remove(address) => {
                state.remove(&address);
            }
            Self::Keep => {}
        }
    }
}

/// Execute a plan with the given options and callbacks
///
/// Asks `confirm` once before the first change. Returns an error only when
/// the run itself cannot proceed; per-resource failures are counted in the
/// summary.
pub fn execute<C, P, F>(
    plan: &ExecutionPlan,
    registry: &Registry<C>,
    client: &C,
    state: &mut StateDocument,
    opts: &ExecuteOptions,
    progress: &P,
    confirm: &mut F,
) -> Result<ExecuteSummary>
where
    C: ?Sized + Sync,
    P: ProgressCallback + ?Sized,
    F: ConfirmCallback + ?Sized,
{
    let mut summary = ExecuteSummary {
        no_change: plan.diffs.len() - plan.changes().count(),
        ..Default::default()
    };

    let work: Vec<(&ResourceDiff, Option<StateRecord>)> = plan
        .changes()
        .map(|diff| (diff, state.get(&diff.address).cloned()))
        .collect();

    if work.is_empty() {
        return Ok(summary);
    }

    let prompt = format!(
        "Apply {} change{}?",
        work.len(),
        if work.len() == 1 { "" } else { "s" }
    );
    if !confirm.confirm(&prompt)? {
        summary.skipped = work.len();
        return Ok(summary);
    }

    progress.on_start(work.len());
    let outcomes = run_pool(opts.jobs, || {
        work.par_iter()
            .map(|(diff, prior)| {
                let description = describe(diff.action);
                progress.on_resource_start(&diff.address, description);
                let outcome = apply_diff(registry, client, diff, prior.as_ref());
                progress.on_resource_complete(&diff.address, &outcome.0);
                outcome
            })
            .collect::<Vec<_>>()
    })?;
    progress.on_complete();

    for ((diff, _), (result, change)) in work.iter().zip(outcomes) {
        report(&diff.address, &result, opts.verbose);
        summary.add_result(&result);
        change.apply(state);
    }

    Ok(summary)
}

/// Re-read recorded resources from the remote system
///
/// `Found` replaces the record, `Gone` removes it, and errors leave the
/// record untouched. Only records matching `target` are read.
pub fn refresh<C, P>(
    registry: &Registry<C>,
    client: &C,
    state: &mut StateDocument,
    target: Option<&str>,
    jobs: usize,
    progress: &P,
) -> Result<ExecuteSummary>
where
    C: ?Sized + Sync,
    P: ProgressCallback + ?Sized,
{
    let target = target.map(Target::parse);
    let records: Vec<StateRecord> = state
        .resources
        .iter()
        .filter(|r| target.as_ref().is_none_or(|t| t.matches(&r.address())))
        .cloned()
        .collect();

    let mut summary = ExecuteSummary::default();
    if records.is_empty() {
        return Ok(summary);
    }

    progress.on_start(records.len());
    let outcomes = run_pool(jobs, || {
        records
            .par_iter()
            .map(|record| {
                let address = record.address();
                progress.on_resource_start(&address, "Refreshing");
                let outcome = refresh_record(registry, client, record);
                progress.on_resource_complete(&address, &outcome.0);
                outcome
            })
            .collect::<Vec<_>>()
    })?;
    progress.on_complete();

    for (record, (result, change)) in records.iter().zip(outcomes) {
        report(&record.address(), &result, false);
        summary.add_result(&result);
        change.apply(state);
    }

    Ok(summary)
}

/// Run `op` on a dedicated pool of `jobs` threads
fn run_pool<T, OP>(jobs: usize, op: OP) -> Result<T>
where
    OP: FnOnce() -> T + Send,
    T: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create thread pool")?;
    Ok(pool.install(op))
}

/// Apply a single diff
fn apply_diff<C: ?Sized>(
    registry: &Registry<C>,
    client: &C,
    diff: &ResourceDiff,
    prior: Option<&StateRecord>,
) -> (ApplyResult, StateChange) {
    let reconciler = match registry.get(&diff.address.resource_type) {
        Ok(reconciler) => reconciler,
        Err(e) => return failed(e),
    };

    match diff.action {
        Action::NoOp => (ApplyResult::NoChange, StateChange::Keep),
        Action::Create => match create(reconciler, client, diff) {
            Ok(record) => (ApplyResult::Created, StateChange::Upsert(record)),
            Err(e) => failed(e),
        },
        Action::Delete => {
            let Some(prior) = prior else {
                return skipped(&diff.address);
            };
            match reconciler.delete(client, prior) {
                Ok(()) => (
                    ApplyResult::Removed,
                    StateChange::Remove(diff.address.clone()),
                ),
                Err(e) => failed(e),
            }
        }
        Action::Replace => {
            let Some(prior) = prior else {
                return skipped(&diff.address);
            };
            if let Err(e) = reconciler.delete(client, prior) {
                return failed(e);
            }
            match create(reconciler, client, diff) {
                Ok(record) => (ApplyResult::Replaced, StateChange::Upsert(record)),
                Err(e) => (
                    ApplyResult::Failed {
                        error: e.to_string(),
                    },
                    StateChange::Remove(diff.address.clone()),
                ),
            }
        }
    }
}

fn create<C: ?Sized>(
    reconciler: &dyn ErasedReconciler<C>,
    client: &C,
    diff: &ResourceDiff,
) -> Result<StateRecord, ReconcileError> {
    let desired = diff.desired.as_ref().ok_or_else(|| {
        ReconcileError::InvalidAttributes {
            resource_type: diff.address.resource_type.clone(),
            message: format!("no desired attributes for {}", diff.address),
        }
    })?;
    reconciler.create(client, &diff.address, desired)
}

fn refresh_record<C: ?Sized>(
    registry: &Registry<C>,
    client: &C,
    record: &StateRecord,
) -> (ApplyResult, StateChange) {
    let reconciler = match registry.get(&record.resource_type) {
        Ok(reconciler) => reconciler,
        Err(e) => return failed(e),
    };

    match reconciler.read(client, record) {
        Ok(ReadOutcome::Found(current)) if current == *record => {
            (ApplyResult::NoChange, StateChange::Keep)
        }
        Ok(ReadOutcome::Found(current)) => (ApplyResult::Refreshed, StateChange::Upsert(current)),
        Ok(ReadOutcome::Gone) => (ApplyResult::Gone, StateChange::Remove(record.address())),
        Err(e) => failed(e),
    }
}

fn failed(error: impl std::fmt::Display) -> (ApplyResult, StateChange) {
    (
        ApplyResult::Failed {
            error: error.to_string(),
        },
        StateChange::Keep,
    )
}

fn skipped(address: &Address) -> (ApplyResult, StateChange) {
    (
        ApplyResult::Skipped {
            reason: format!("{address} is not recorded in state"),
        },
        StateChange::Keep,
    )
}

fn describe(action: Action) -> &'static str {
    match action {
        Action::Create => "Creating",
        Action::Replace => "Replacing",
        Action::Delete => "Destroying",
        Action::NoOp => "Checking",
    }
}

fn report(address: &Address, result: &ApplyResult, verbose: bool) {
    match result {
        ApplyResult::Failed { error } => log::error!("{address}: {error}"),
        ApplyResult::Skipped { reason } => log::warn!("{address}: skipped ({reason})"),
        other if verbose => log::info!("{address}: {other:?}"),
        other => log::debug!("{address}: {other:?}"),
    }
}
