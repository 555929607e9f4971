//! `state` - inspect or edit recorded state without contacting the server

use anyhow::{Result, anyhow};
use colored::Colorize;
use declarative::StateRecord;

use super::parse_address;
use crate::Context;
use crate::cli::StateCommand;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, cmd: &StateCommand) -> Result<()> {
    match cmd {
        StateCommand::List => list(ctx),
        StateCommand::Show { address } => show(ctx, address),
        StateCommand::Rm { address } => rm(ctx, address),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let state = StateFile::load(&ctx.state)?;
    if state.document.is_empty() {
        ui::info("No resources in state");
        return Ok(());
    }

    for record in &state.document.resources {
        println!(
            "{} {}",
            record.address(),
            format!("(id: {})", record.id).dimmed()
        );
    }
    Ok(())
}

fn show(ctx: &Context, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let state = StateFile::load(&ctx.state)?;
    let record = state
        .document
        .get(&address)
        .ok_or_else(|| anyhow!("{address} is not in state"))?;

    ui::header(&address.to_string());
    ui::kv("id", &record.id);
    for (name, value) in masked_attributes(record) {
        ui::kv(&name, &value);
    }
    Ok(())
}

fn rm(ctx: &Context, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let mut state = StateFile::load(&ctx.state)?;
    if state.document.remove(&address).is_none() {
        return Err(anyhow!("{address} is not in state"));
    }
    state.save(&ctx.state)?;
    ui::success(&format!("Removed {address} from state"));
    Ok(())
}

/// Attribute name/value pairs with sensitive values masked
fn masked_attributes(record: &StateRecord) -> Vec<(String, String)> {
    let registry = resource::registry();
    let sensitive = registry
        .get(&record.resource_type)
        .map(|r| r.sensitive_attributes())
        .unwrap_or_default();

    record
        .attributes
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(name, _)| name.as_str() != "id")
        .map(|(name, value)| {
            let masked = sensitive.contains(&name.as_str());
            (name.clone(), ui::value(Some(value), masked))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_masked_attributes_hide_token() {
        let record = StateRecord {
            resource_type: "source_control".into(),
            name: "root".into(),
            id: "sc-1".into(),
            attributes: json!({
                "id": "sc-1",
                "token": "ghp_secret",
                "provider": "github",
                "base_branch": null,
            }),
        };

        let attributes = masked_attributes(&record);
        assert_eq!(
            attributes,
            vec![
                ("base_branch".to_string(), "null".to_string()),
                ("provider".to_string(), "\"github\"".to_string()),
                ("token".to_string(), "(sensitive)".to_string()),
            ]
        );
    }
}
