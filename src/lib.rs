// Provision library
// Interactive cluster provisioning: prompts for parameters, writes the
// configuration and hands it to ansible-playbook or a provisioning script.

pub mod ansible;
pub mod cli_types;
pub mod commands;
pub mod config;
pub mod config_manager;
pub mod context;
pub mod embedded;
pub mod error;
pub mod exec;
pub mod inventory;
pub mod multipass;
pub mod prompt;
pub mod provisioner;

pub use cli_types::{Cli, Commands};
pub use commands::handle_command;
pub use error::ProvisionError;
