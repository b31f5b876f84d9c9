use super::kubernetes::cpus;
use super::{ClusterSpec, RunStrategy, Target};
use crate::prompt::{Prompter, prompt_int_with_range};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RqliteConfig {
    pub rqlite_version: String,
    pub rqlite_http_port: u16,
    pub rqlite_raft_port: u16,
    pub rqlite_data_dir: String,
    pub rqlite_extract_dir: String,
    pub node_cpus: u32,
    pub node_memory: String,
    pub node_disk: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

impl RqliteConfig {
    /// Values used when the defaults file cannot be loaded.
    pub fn builtin() -> Self {
        Self {
            rqlite_version: "8.36.11".to_string(),
            rqlite_http_port: 4001,
            rqlite_raft_port: 4002,
            rqlite_data_dir: "/home/ubuntu/data".to_string(),
            rqlite_extract_dir: "/opt/rqlite".to_string(),
            node_cpus: 2,
            node_memory: "2G".to_string(),
            node_disk: "10G".to_string(),
            dns_servers: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
        }
    }
}

fn port(prompter: &mut dyn Prompter, message: &str, current: u16) -> Result<u16> {
    let value = prompt_int_with_range(prompter, message, i64::from(current), 1, 65535)?;
    Ok(u16::try_from(value)?)
}

impl ClusterSpec for RqliteConfig {
    const TARGET: Target = Target {
        key: "rqlite",
        display_name: "rqlite cluster",
        defaults_file: "defaults/rqlite.yml",
        config_file: "rqlite.yml",
        run: RunStrategy::Script {
            script: "provision-rqlite.sh",
        },
        cleanup_script: "cleanup-rqlite.sh",
    };

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("RQLite Version", self.rqlite_version.clone()),
            ("HTTP Port", self.rqlite_http_port.to_string()),
            ("Raft Port", self.rqlite_raft_port.to_string()),
            ("Data Directory", self.rqlite_data_dir.clone()),
            (
                "Node Resources",
                format!(
                    "{} CPUs, {} Memory, {} Disk",
                    self.node_cpus, self.node_memory, self.node_disk
                ),
            ),
        ]
    }

    fn configure(&mut self, prompter: &mut dyn Prompter) -> Result<()> {
        self.rqlite_version = prompter.text("RQLite Version", &self.rqlite_version)?;
        self.rqlite_http_port = port(prompter, "HTTP Port", self.rqlite_http_port)?;
        self.rqlite_raft_port = port(prompter, "Raft Port", self.rqlite_raft_port)?;
        self.node_cpus = cpus(prompter, "Node CPUs", self.node_cpus)?;
        self.node_memory = prompter.text("Node Memory (e.g., 2G)", &self.node_memory)?;
        self.node_disk = prompter.text("Node Disk (e.g., 10G)", &self.node_disk)?;
        Ok(())
    }

    fn builtin_defaults() -> Option<Self> {
        Some(Self::builtin())
    }
}
