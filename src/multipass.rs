//! Multipass VM helpers and the artifacts VMs are launched with.

use crate::context::{ProvisionContext, SSH_KEY_NAME};
use crate::error::ProvisionError;
use crate::exec;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MULTIPASS: &str = "multipass";

const CLOUD_INIT_TEMPLATE: &str = "common.yaml";
const CLOUD_INIT_PROCESSED: &str = "common_processed.yaml";
const SSH_KEY_PLACEHOLDER: &str = "$SSH_PUBLIC_KEY";

/// Parameters for `multipass launch`.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub name: String,
    pub cpus: u32,
    pub memory: String,
    pub disk: String,
    pub cloud_init: PathBuf,
}

impl LaunchSpec {
    pub fn args(&self) -> Vec<String> {
        vec![
            "launch".to_string(),
            "--name".to_string(),
            self.name.clone(),
            "--cpus".to_string(),
            self.cpus.to_string(),
            "--memory".to_string(),
            self.memory.clone(),
            "--disk".to_string(),
            self.disk.clone(),
            "--cloud-init".to_string(),
            self.cloud_init.display().to_string(),
        ]
    }
}

pub fn create_vm(spec: &LaunchSpec) -> Result<()> {
    println!("Launching VM {}...", spec.name);
    exec::run_checked(MULTIPASS, &spec.args())
        .with_context(|| format!("Failed to launch VM {}", spec.name))
}

pub fn delete_vm(name: &str) -> Result<()> {
    exec::run_checked(MULTIPASS, &["delete", name])
        .with_context(|| format!("Failed to delete VM {}", name))
}

/// Permanently remove deleted VMs
pub fn purge_vms() -> Result<()> {
    exec::run_checked(MULTIPASS, &["purge"]).context("Failed to purge VMs")
}

/// `multipass info <name> --format json`
#[derive(Debug, Deserialize)]
pub struct MultipassInfo {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub info: HashMap<String, VmInfo>,
}

#[derive(Debug, Deserialize)]
pub struct VmInfo {
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub state: String,
}

/// First IPv4 address reported for `name`.
pub fn parse_vm_ip(json: &str, name: &str) -> Result<String> {
    let info: MultipassInfo = serde_json::from_str(json)
        .map_err(|e| ProvisionError::VmInfo(format!("invalid JSON for {}: {}", name, e)))?;

    let vm = info
        .info
        .get(name)
        .ok_or_else(|| ProvisionError::VmInfo(format!("no entry for VM {}", name)))?;

    vm.ipv4.first().cloned().ok_or_else(|| {
        ProvisionError::VmInfo(format!("VM {} has no IPv4 address (state: {})", name, vm.state))
            .into()
    })
}

pub fn vm_ip(name: &str) -> Result<String> {
    let output = exec::execute(MULTIPASS, &["info", name, "--format", "json"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProvisionError::VmInfo(format!("{}: {}", name, stderr.trim())).into());
    }
    parse_vm_ip(&String::from_utf8_lossy(&output.stdout), name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyPair {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Private key the inventory points at. A key configured in settings is used
/// as given; otherwise the provisioning key in the context's SSH directory is
/// generated on first use.
pub fn ensure_ssh_key(ctx: &ProvisionContext) -> Result<PathBuf> {
    let key = ctx.ssh_private_key_file()?;
    if ctx.settings.ssh_private_key_file.is_some() || key.is_file() {
        return Ok(key);
    }

    let dir = ctx.ssh_dir()?;
    println!("Generating SSH key pair in {}...", dir.display());
    let pair = create_ssh_key(&dir)?;
    info!(key = %pair.private_key.display(), "generated provisioning SSH key");
    Ok(pair.private_key)
}

/// Generate a fresh RSA key pair in `dir` with ssh-keygen.
pub fn create_ssh_key(dir: &Path) -> Result<SshKeyPair> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create SSH directory: {}", dir.display()))?;
    exec::set_permissions(dir, 0o700)?;

    let private_key = dir.join(SSH_KEY_NAME);
    let public_key = dir.join(format!("{}.pub", SSH_KEY_NAME));

    // ssh-keygen asks before overwriting, and nobody is there to answer
    for path in [&private_key, &public_key] {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove old key: {}", path.display()))?;
        }
    }

    let key_arg = private_key.display().to_string();
    let output = exec::execute(
        "ssh-keygen",
        &["-t", "rsa", "-b", "4096", "-N", "", "-C", "provision", "-q", "-f", key_arg.as_str()],
    )?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Failed to generate SSH key: {}", stderr.trim());
    }

    info!(path = %private_key.display(), "generated SSH key pair");
    Ok(SshKeyPair {
        private_key,
        public_key,
    })
}

pub fn render_cloud_init(template: &str, public_key: &str) -> String {
    template.replace(SSH_KEY_PLACEHOLDER, public_key.trim())
}

/// Fill the public key into the cloud-init template; returns the new file.
pub fn prepare_cloud_init(ctx: &ProvisionContext, public_key_path: &Path) -> Result<PathBuf> {
    let template_path = ctx.cloud_init_path(CLOUD_INIT_TEMPLATE)?;
    let template = std::fs::read_to_string(&template_path).with_context(|| {
        format!("Failed to read cloud-init template: {}", template_path.display())
    })?;
    let public_key = std::fs::read_to_string(public_key_path).with_context(|| {
        format!("Failed to read SSH public key: {}", public_key_path.display())
    })?;

    let dir = ctx.work_dir()?.join(crate::config::CLOUD_INIT_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let processed = dir.join(CLOUD_INIT_PROCESSED);
    std::fs::write(&processed, render_cloud_init(&template, &public_key)).with_context(|| {
        format!("Failed to write processed cloud-init file: {}", processed.display())
    })?;
    Ok(processed)
}
