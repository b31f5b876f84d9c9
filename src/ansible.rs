use crate::exec;
use anyhow::Result;
use std::path::Path;
use std::process::ExitStatus;

pub const ANSIBLE_PLAYBOOK: &str = "ansible-playbook";

/// `-i <inventory> [extra...] <playbook>`
pub fn playbook_args(inventory: &Path, extra_args: &[String], playbook: &Path) -> Vec<String> {
    let mut args = vec!["-i".to_string(), inventory.display().to_string()];
    args.extend(extra_args.iter().cloned());
    args.push(playbook.display().to_string());
    args
}

/// Extra vars file argument pair: `-e @<path>`
pub fn extra_vars_file(path: &Path) -> Vec<String> {
    vec!["-e".to_string(), format!("@{}", path.display())]
}

/// Execute an Ansible playbook with the given inventory
///
/// stdio is shared with the terminal so `become` password prompts reach the user.
pub fn run_playbook(playbook: &Path, inventory: &Path, extra_args: &[String]) -> Result<ExitStatus> {
    let args = playbook_args(inventory, extra_args, playbook);
    println!("Running: {} {}", ANSIBLE_PLAYBOOK, args.join(" "));
    exec::run_inherited(ANSIBLE_PLAYBOOK, &args)
}
