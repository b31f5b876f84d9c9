use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::info;
use yaml_rust::yaml::Hash;
use yaml_rust::{Yaml, YamlEmitter};

pub const INVENTORY_FILE: &str = "kubernetes.yml";

/// Addresses used until the VMs report their real ones
const CONTROL_PLANE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 64, 10);
const WORKER_IPS: [Ipv4Addr; 3] = [
    Ipv4Addr::new(192, 168, 64, 11),
    Ipv4Addr::new(192, 168, 64, 12),
    Ipv4Addr::new(192, 168, 64, 13),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryHost {
    pub name: String,
    pub ansible_host: Ipv4Addr,
}

impl InventoryHost {
    pub fn new(name: &str, ansible_host: Ipv4Addr) -> Self {
        Self {
            name: name.to_string(),
            ansible_host,
        }
    }
}

/// Ansible inventory for one control-plane node and its workers.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub control_plane: InventoryHost,
    pub workers: Vec<InventoryHost>,
    pub ssh_private_key_file: PathBuf,
}

fn key(name: &str) -> Yaml {
    Yaml::String(name.to_string())
}

fn hosts(entries: &[InventoryHost]) -> Yaml {
    let mut hosts = Hash::new();
    for host in entries {
        let mut vars = Hash::new();
        vars.insert(key("ansible_host"), Yaml::String(host.ansible_host.to_string()));
        hosts.insert(key(&host.name), Yaml::Hash(vars));
    }
    let mut group = Hash::new();
    group.insert(key("hosts"), Yaml::Hash(hosts));
    Yaml::Hash(group)
}

impl Inventory {
    /// The static four node layout: `controlplane` plus `node01..node03`.
    pub fn placeholder(ssh_private_key_file: impl Into<PathBuf>) -> Self {
        let workers = WORKER_IPS
            .iter()
            .enumerate()
            .map(|(i, ip)| InventoryHost::new(&format!("node{:02}", i + 1), *ip))
            .collect();

        Self {
            control_plane: InventoryHost::new("controlplane", CONTROL_PLANE_IP),
            workers,
            ssh_private_key_file: ssh_private_key_file.into(),
        }
    }

    pub fn to_yaml(&self) -> Yaml {
        let mut cluster_children = Hash::new();
        cluster_children.insert(
            key("control_plane"),
            hosts(std::slice::from_ref(&self.control_plane)),
        );
        cluster_children.insert(key("workers"), hosts(&self.workers));

        let mut cluster = Hash::new();
        cluster.insert(key("children"), Yaml::Hash(cluster_children));

        let mut children = Hash::new();
        children.insert(key("k8s_cluster"), Yaml::Hash(cluster));

        let mut vars = Hash::new();
        vars.insert(key("ansible_user"), key("ubuntu"));
        vars.insert(key("ansible_become"), Yaml::Boolean(true));
        vars.insert(
            key("ansible_ssh_private_key_file"),
            Yaml::String(self.ssh_private_key_file.display().to_string()),
        );
        vars.insert(
            key("ansible_ssh_common_args"),
            key("-o StrictHostKeyChecking=no"),
        );

        let mut all = Hash::new();
        all.insert(key("children"), Yaml::Hash(children));
        all.insert(key("vars"), Yaml::Hash(vars));

        let mut root = Hash::new();
        root.insert(key("all"), Yaml::Hash(all));
        Yaml::Hash(root)
    }

    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        YamlEmitter::new(&mut out)
            .dump(&self.to_yaml())
            .context("Failed to render inventory")?;
        out.push('\n');
        Ok(out)
    }

    /// Write the inventory into `dir` (created if needed) and read it back.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create inventory directory: {}", dir.display()))?;

        let path = dir.join(INVENTORY_FILE);
        let content = self.render()?;
        std::fs::write(&path, &content)
            .with_context(|| format!("Failed to write inventory file: {}", path.display()))?;

        let written = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read back inventory file: {}", path.display()))?;
        if written != content {
            anyhow::bail!("Inventory file at {} does not match what was written", path.display());
        }

        info!(path = %path.display(), bytes = written.len(), "wrote inventory");
        Ok(path)
    }
}
