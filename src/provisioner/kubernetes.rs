use super::{ClusterSpec, RunStrategy, Target, ordered_options};
use crate::prompt::{Prompter, prompt_int_with_range, prompt_list};
use anyhow::Result;
use serde::{Deserialize, Serialize};

const CNI_PLUGINS: &[&str] = &["calico", "flannel"];

/// Variables consumed by the Kubernetes playbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub kubernetes_version: String,
    pub pod_cidr: String,
    pub service_cidr: String,
    pub cni_plugin: String,
    pub calico_version: String,
    pub control_plane_cpus: u32,
    pub control_plane_memory: String,
    pub control_plane_disk: String,
    pub worker_cpus: u32,
    pub worker_memory: String,
    pub worker_disk: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    #[serde(default)]
    pub kubernetes_packages: Vec<String>,
}

impl ClusterSpec for KubernetesConfig {
    const TARGET: Target = Target {
        key: "kubernetes",
        display_name: "Kubernetes cluster",
        defaults_file: "defaults/kubernetes.yml",
        config_file: "kubernetes.yml",
        run: RunStrategy::Playbook {
            playbook: "playbooks/kubernetes.yml",
        },
        cleanup_script: "cleanup-kubernetes.sh",
    };

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Kubernetes Version", self.kubernetes_version.clone()),
            ("Pod CIDR", self.pod_cidr.clone()),
            ("Service CIDR", self.service_cidr.clone()),
            ("CNI Plugin", self.cni_plugin.clone()),
            (
                "Control Plane",
                format!(
                    "{} CPUs, {} Memory, {} Disk",
                    self.control_plane_cpus, self.control_plane_memory, self.control_plane_disk
                ),
            ),
            (
                "Worker Nodes",
                format!(
                    "{} CPUs, {} Memory, {} Disk",
                    self.worker_cpus, self.worker_memory, self.worker_disk
                ),
            ),
            ("DNS Servers", self.dns_servers.join(", ")),
        ]
    }

    fn configure(&mut self, prompter: &mut dyn Prompter) -> Result<()> {
        self.kubernetes_version = prompter.text("Kubernetes Version", &self.kubernetes_version)?;
        self.pod_cidr = prompter.text("Pod CIDR", &self.pod_cidr)?;
        self.service_cidr = prompter.text("Service CIDR", &self.service_cidr)?;

        let plugins = ordered_options(&self.cni_plugin, CNI_PLUGINS);
        self.cni_plugin = prompter.select("CNI Plugin", &plugins)?;
        if self.cni_plugin == "calico" {
            self.calico_version = prompter.text("Calico Version", &self.calico_version)?;
        }

        self.control_plane_cpus = cpus(prompter, "Control Plane CPUs", self.control_plane_cpus)?;
        self.control_plane_memory =
            prompter.text("Control Plane Memory (e.g., 4G)", &self.control_plane_memory)?;
        self.control_plane_disk =
            prompter.text("Control Plane Disk (e.g., 20G)", &self.control_plane_disk)?;

        self.worker_cpus = cpus(prompter, "Worker CPUs", self.worker_cpus)?;
        self.worker_memory = prompter.text("Worker Memory (e.g., 2G)", &self.worker_memory)?;
        self.worker_disk = prompter.text("Worker Disk (e.g., 20G)", &self.worker_disk)?;

        self.dns_servers = prompt_list(prompter, "DNS Servers (comma separated)", &self.dns_servers)?;
        Ok(())
    }
}

/// CPU count prompt limited to 1..=16.
pub(super) fn cpus(prompter: &mut dyn Prompter, message: &str, current: u32) -> Result<u32> {
    let value = prompt_int_with_range(prompter, message, i64::from(current), 1, 16)?;
    Ok(u32::try_from(value)?)
}
