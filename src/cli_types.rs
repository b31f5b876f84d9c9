// CLI types for the provision binary

use crate::config_manager::{REPO_ROOT_ENV, RESOURCES_ENV, ResourceMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provision")]
#[command(version)]
#[command(
    about = "Infrastructure provisioning tool",
    long_about = "Interactive CLI for provisioning and cleaning up local clusters \
                  (Kubernetes, rqlite) on Multipass VMs with Ansible and shell scripts."
)]
pub struct Cli {
    /// Where playbooks, defaults and scripts are read from
    #[arg(long, global = true, value_enum, env = RESOURCES_ENV)]
    pub resources: Option<ResourceMode>,

    /// Repository root to use instead of searching upward (repository mode)
    #[arg(long, global = true, env = REPO_ROOT_ENV)]
    pub repo_root: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Provision infrastructure components interactively
    Provision,
    /// Clean up provisioned resources
    Cleanup,
    /// Check that the inventory directory is writable and preview the inventory
    DebugInventory,
}
