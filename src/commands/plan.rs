//! `plan` - preview what apply would change

use anyhow::Result;
use colored::Colorize;
use declarative::{Action, ExecutionPlan, ResourceDiff};

use super::refresh::refresh_before_plan;
use super::{build_plan, connect, load_desired};
use crate::Context;
use crate::cli::PlanArgs;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let target = args.target.target.as_deref();
    let desired = load_desired(ctx)?;
    let mut state = StateFile::load(&ctx.state)?;

    // Refreshed state is only shown, never written, by plan
    if args.refresh && !state.document.is_empty() {
        let client = connect(ctx)?;
        refresh_before_plan(ctx, &client, &mut state.document, target)?;
    }

    let plan = build_plan(&desired, &state.document)?.filter_by_target(target);
    render(&plan);
    Ok(())
}

/// Print every change of a plan and the summary line
pub fn render(plan: &ExecutionPlan) {
    ui::header("Plan");

    if !plan.has_changes() {
        ui::success("No changes. Remote entities match the configuration.");
        return;
    }

    for diff in plan.changes() {
        render_diff(diff);
    }

    let summary = plan.summary();
    println!();
    println!(
        "{} {} to create, {} to replace, {} to destroy.",
        "Plan:".bold(),
        summary.create.to_string().green(),
        summary.replace.to_string().yellow(),
        summary.delete.to_string().red()
    );
}

fn render_diff(diff: &ResourceDiff) {
    let symbol = match diff.action {
        Action::Create => diff.action.symbol().green(),
        Action::Replace => diff.action.symbol().yellow(),
        Action::Delete => diff.action.symbol().red(),
        Action::NoOp => diff.action.symbol().normal(),
    };
    let id = diff
        .id
        .as_deref()
        .map(|id| format!("(id: {id})").dimmed().to_string())
        .unwrap_or_default();

    println!();
    println!("  {} {} {}", symbol, diff.address.to_string().bold(), id);

    for change in &diff.changes {
        let before = ui::value(change.before.as_ref(), change.sensitive);
        let after = ui::value(change.after.as_ref(), change.sensitive);
        match diff.action {
            Action::Create => println!("      {} = {}", change.name, after),
            Action::Delete => ui::dim(&format!("    {} = {}", change.name, before)),
            _ => println!(
                "      {}: {} {} {}",
                change.name,
                before.red(),
                "→".dimmed(),
                after.green()
            ),
        }
    }
}
