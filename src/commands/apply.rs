//! `apply` and `destroy` - converge the server and record the outcome

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteSummary, ExecutionPlan};

use super::plan::render;
use super::refresh::refresh_before_plan;
use super::{build_plan, config_errors, connect, load_desired};
use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs};
use crate::progress::BarProgress;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let target = args.target.target.as_deref();
    let desired = load_desired(ctx)?;
    let mut state = StateFile::load(&ctx.state)?;
    let loaded_serial = state.document.serial;

    // Validate before anything talks to the server
    build_plan(&desired, &state.document)?;

    let client = connect(ctx)?;
    if args.refresh && !state.document.is_empty() {
        refresh_before_plan(ctx, &client, &mut state.document, target)?;
    }

    let plan = build_plan(&desired, &state.document)?.filter_by_target(target);
    run_plan(
        ctx,
        &plan,
        &client,
        &mut state,
        loaded_serial,
        args.auto_approve,
        args.jobs,
    )
}

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let mut state = StateFile::load(&ctx.state)?;
    let loaded_serial = state.document.serial;

    let plan = ExecutionPlan::destroy(&resource::registry(), &state.document)
        .map_err(config_errors)?
        .filter_by_target(args.target.target.as_deref());
    if !plan.has_changes() {
        render(&plan);
        return Ok(());
    }

    let client = connect(ctx)?;
    run_plan(
        ctx,
        &plan,
        &client,
        &mut state,
        loaded_serial,
        args.auto_approve,
        args.jobs,
    )
}

fn run_plan(
    ctx: &Context,
    plan: &ExecutionPlan,
    client: &iqclient::Client,
    state: &mut StateFile,
    loaded_serial: u64,
    auto_approve: bool,
    jobs: u16,
) -> Result<()> {
    render(plan);
    if !plan.has_changes() {
        state.save_if_changed(&ctx.state, loaded_serial)?;
        return Ok(());
    }
    println!();

    let mut confirm: Box<dyn ConfirmCallback> = if auto_approve {
        Box::new(AutoConfirm)
    } else {
        Box::new(ui::Prompt)
    };
    let opts = ExecuteOptions {
        jobs: usize::from(jobs),
        verbose: ctx.verbose > 0,
    };
    let progress = BarProgress::new(ctx.quiet);

    let result = declarative::execute(
        plan,
        &resource::registry(),
        client,
        &mut state.document,
        &opts,
        &progress,
        confirm.as_mut(),
    );

    // Persist whatever succeeded, even if the run as a whole failed
    state.save_if_changed(&ctx.state, loaded_serial)?;
    let summary = result?;

    print_summary(&summary);
    if !summary.is_success() {
        bail!("{} resources failed", summary.failed);
    }
    Ok(())
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.skipped > 0 && summary.total_changes() == 0 && summary.failed == 0 {
        ui::warn("Cancelled, no changes made");
        return;
    }
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} resources destroyed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
