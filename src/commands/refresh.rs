//! `refresh` - update recorded state from the server

use anyhow::{Result, bail};
use declarative::{ExecuteSummary, StateDocument};
use iqclient::Client;

use super::connect;
use crate::Context;
use crate::cli::TargetArgs;
use crate::progress::BarProgress;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

/// Jobs used for reads
const REFRESH_JOBS: usize = 4;

pub fn run(ctx: &Context, args: &TargetArgs) -> Result<()> {
    let mut state = StateFile::load(&ctx.state)?;
    if state.document.is_empty() {
        ui::info("State is empty, nothing to refresh");
        return Ok(());
    }

    let loaded_serial = state.document.serial;
    let client = connect(ctx)?;
    let summary = refresh_document(ctx, &client, &mut state.document, args.target.as_deref())?;
    state.save_if_changed(&ctx.state, loaded_serial)?;

    print_summary(&summary);
    if !summary.is_success() {
        bail!("{} resources could not be refreshed", summary.failed);
    }
    Ok(())
}

/// Refresh ahead of a plan; any read failure aborts
pub fn refresh_before_plan(
    ctx: &Context,
    client: &Client,
    document: &mut StateDocument,
    target: Option<&str>,
) -> Result<()> {
    let summary = refresh_document(ctx, client, document, target)?;
    if !summary.is_success() {
        bail!(
            "{} resources could not be refreshed; rerun with --refresh=false to plan against recorded state",
            summary.failed
        );
    }
    Ok(())
}

fn refresh_document(
    ctx: &Context,
    client: &Client,
    document: &mut StateDocument,
    target: Option<&str>,
) -> Result<ExecuteSummary> {
    if !ctx.quiet {
        ui::info("Refreshing state...");
    }
    let progress = BarProgress::new(ctx.quiet);
    declarative::refresh(
        &resource::registry(),
        client,
        document,
        target,
        REFRESH_JOBS,
        &progress,
    )
}

fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        ui::success("State refreshed");
    } else {
        ui::warn("State refreshed with errors");
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.refreshed > 0 {
        println!("    • {} resources updated", summary.refreshed);
    }
    if summary.gone > 0 {
        println!("    • {} resources removed from state", summary.gone);
    }
    if summary.failed > 0 {
        println!("    • {} resources failed", summary.failed);
    }
}
