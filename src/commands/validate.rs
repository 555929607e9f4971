//! `validate` - check the resource file offline

use anyhow::Result;
use declarative::{StateDocument, group_by_type};

use super::{build_plan, load_desired};
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let desired = load_desired(ctx)?;
    // An empty state plans every declared resource as a create
    let plan = build_plan(&desired, &StateDocument::new())?;

    if !ctx.quiet {
        for (resource_type, diffs) in group_by_type(&plan.diffs) {
            ui::kv(&resource_type, &diffs.len().to_string());
        }
    }
    ui::success(&format!(
        "{} is valid ({} resources)",
        ctx.file.display(),
        plan.len()
    ));
    Ok(())
}
