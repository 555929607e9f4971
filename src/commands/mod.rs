// Reconciliation commands
pub mod apply;
pub mod plan;
pub mod refresh;
pub mod validate;

// State inspection
pub mod state;

use anyhow::{Context as AnyhowContext, Result, anyhow};
use declarative::{Address, ExecutionPlan, ReconcileError, ResourceConfig, StateDocument};
use iqclient::Client;

use crate::Context;
use crate::config::ProviderConfig;
use crate::resource;
use crate::schema::ResourceFile;
use crate::ui;

/// Load the declared resources
fn load_desired(ctx: &Context) -> Result<Vec<ResourceConfig>> {
    Ok(ResourceFile::load(&ctx.file)?.resources)
}

/// Build a client from the resolved provider config
fn connect(ctx: &Context) -> Result<Client> {
    let config = ProviderConfig::load(ctx.config.as_deref())?;
    let credentials = config.credentials()?;
    log::info!("Connecting to {} as {}", config.url, credentials.username);
    Client::connect(&config.url, credentials)
        .with_context(|| format!("Invalid server URL: {}", config.url))
}

/// Build a plan, printing every configuration error
fn build_plan(desired: &[ResourceConfig], state: &StateDocument) -> Result<ExecutionPlan> {
    ExecutionPlan::build(&resource::registry(), desired, state).map_err(config_errors)
}

/// Print configuration errors and fold them into one error
fn config_errors(errors: Vec<(Address, ReconcileError)>) -> anyhow::Error {
    for (address, error) in &errors {
        ui::error(&format!("{address}: {error}"));
    }
    anyhow!(
        "{} configuration error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    )
}

/// Parse a `type.name` address argument
fn parse_address(address: &str) -> Result<Address> {
    Address::parse(address)
        .ok_or_else(|| anyhow!("Invalid address `{address}`, expected <type>.<name>"))
}
