// Command module routing
//
// Each subcommand lives in its own file with a `handle_*` entry point that
// receives the shared context, plus the prompter when it asks questions.

pub mod cleanup;
pub mod debug_inventory;
pub mod provision;

use crate::cli_types::Commands;
use crate::context::ProvisionContext;
use crate::prompt::Prompter;
use crate::provisioner::TargetKind;
use anyhow::{Context, Result};

/// Dispatch command to appropriate handler
pub fn handle_command(
    ctx: &ProvisionContext,
    prompter: &mut dyn Prompter,
    command: &Commands,
) -> Result<()> {
    match command {
        Commands::Provision => provision::handle_provision(ctx, prompter),
        Commands::Cleanup => cleanup::handle_cleanup(ctx, prompter),
        Commands::DebugInventory => debug_inventory::handle_debug_inventory(ctx),
    }
}

/// Headline printed in front of the error when `command` fails.
pub fn failure_message(command: &Commands) -> &'static str {
    match command {
        Commands::Provision => "Provisioning failed",
        Commands::Cleanup => "Cleanup failed",
        Commands::DebugInventory => "Inventory check failed",
    }
}

/// Ask which cluster kind to act on.
fn select_target(prompter: &mut dyn Prompter, message: &str) -> Result<TargetKind> {
    let labels: Vec<&str> = TargetKind::ALL.iter().map(|kind| kind.label()).collect();
    let choice = prompter.select(message, &labels)?;
    TargetKind::from_label(&choice).with_context(|| format!("Invalid choice: {}", choice))
}
