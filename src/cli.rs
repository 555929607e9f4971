use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iqform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative management of IQ Server source control and role memberships", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Resource file
    #[arg(short, long, global = true, default_value = "iqform.toml", env = "IQFORM_FILE")]
    pub file: PathBuf,

    /// State file
    #[arg(long, global = true, default_value = "iqform.state.json", env = "IQFORM_STATE")]
    pub state: PathBuf,

    /// Provider config file (default: ~/.config/iqform/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the resource file without contacting the server
    Validate,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the server match the resource file
    Apply(ApplyArgs),

    /// Update state from the server
    Refresh(TargetArgs),

    /// Delete every managed resource
    Destroy(DestroyArgs),

    /// Inspect or edit recorded state
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Limit to a resource type or a single resource (e.g. source_control.root)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Refresh state from the server before planning
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub refresh: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Refresh state from the server before planning
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub refresh: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub auto_approve: bool,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub auto_approve: bool,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List recorded resources
    List,

    /// Show one recorded resource
    Show {
        /// Resource address (type.name)
        address: String,
    },

    /// Forget a resource without deleting it on the server
    Rm {
        /// Resource address (type.name)
        address: String,
    },
}
