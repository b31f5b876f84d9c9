//! Cluster provisioning.
//!
//! A single [`Provisioner`] drives every cluster kind. Each parameter set
//! implements [`ClusterSpec`] and names its [`Target`]: where its defaults
//! live and how a run is launched.

pub mod kubernetes;
pub mod rqlite;

use crate::ansible;
use crate::context::ProvisionContext;
use crate::error::ProvisionError;
use crate::exec;
use crate::inventory::Inventory;
use crate::multipass;
use crate::prompt::Prompter;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub use kubernetes::KubernetesConfig;
pub use rqlite::RqliteConfig;

/// A cluster parameter set that can be shown, edited and written out.
pub trait ClusterSpec: Serialize + DeserializeOwned + Clone + Debug {
    /// Where this cluster kind's files live and how it is run.
    const TARGET: Target;

    /// Label/value pairs shown before asking whether to keep the defaults.
    fn summary(&self) -> Vec<(&'static str, String)>;

    /// Ask for every editable field, offering the current value as default.
    fn configure(&mut self, prompter: &mut dyn Prompter) -> Result<()>;

    /// Used instead of failing when the defaults file cannot be loaded.
    fn builtin_defaults() -> Option<Self> {
        None
    }
}

/// How a persisted configuration is acted on.
#[derive(Debug, Clone, Copy)]
pub enum RunStrategy {
    /// `ansible-playbook` with the config as extra vars; path under `ansible/`
    Playbook { playbook: &'static str },
    /// A script under `scripts/` given the config path as its argument
    Script { script: &'static str },
}

impl RunStrategy {
    fn program(&self) -> &'static str {
        match self {
            RunStrategy::Playbook { .. } => ansible::ANSIBLE_PLAYBOOK,
            RunStrategy::Script { script } => *script,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub key: &'static str,
    pub display_name: &'static str,
    /// Relative to `ansible/`
    pub defaults_file: &'static str,
    /// File name of the persisted config
    pub config_file: &'static str,
    pub run: RunStrategy,
    pub cleanup_script: &'static str,
}

/// Cluster kinds offered by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Kubernetes,
    Rqlite,
}

impl TargetKind {
    pub const ALL: [TargetKind; 2] = [TargetKind::Kubernetes, TargetKind::Rqlite];

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Kubernetes => "Kubernetes Cluster",
            TargetKind::Rqlite => "RQLite Cluster",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    pub fn provision(self, ctx: &ProvisionContext, prompter: &mut dyn Prompter) -> Result<()> {
        match self {
            TargetKind::Kubernetes => {
                Provisioner::<KubernetesConfig>::new(ctx).provision_interactive(prompter)
            }
            TargetKind::Rqlite => {
                Provisioner::<RqliteConfig>::new(ctx).provision_interactive(prompter)
            }
        }
    }

    pub fn cleanup(self, ctx: &ProvisionContext) -> Result<ExitStatus> {
        match self {
            TargetKind::Kubernetes => Provisioner::<KubernetesConfig>::new(ctx).cleanup(),
            TargetKind::Rqlite => Provisioner::<RqliteConfig>::new(ctx).cleanup(),
        }
    }

    pub fn cleanup_program(self) -> &'static str {
        match self {
            TargetKind::Kubernetes => KubernetesConfig::TARGET.cleanup_script,
            TargetKind::Rqlite => RqliteConfig::TARGET.cleanup_script,
        }
    }
}

/// A configuration written to its own temp directory.
///
/// The directory and file are removed when this is dropped.
#[derive(Debug)]
pub struct PersistedConfig {
    _dir: TempDir,
    path: PathBuf,
}

impl PersistedConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `current` first, followed by the remaining `options` in order.
pub fn ordered_options<'a>(current: &'a str, options: &[&'a str]) -> Vec<&'a str> {
    let mut ordered = Vec::with_capacity(options.len() + 1);
    if !current.is_empty() {
        ordered.push(current);
    }
    ordered.extend(options.iter().copied().filter(|option| *option != current));
    ordered
}

pub struct Provisioner<'a, C> {
    ctx: &'a ProvisionContext,
    target: Target,
    _spec: PhantomData<C>,
}

impl<'a, C: ClusterSpec> Provisioner<'a, C> {
    pub fn new(ctx: &'a ProvisionContext) -> Self {
        Self {
            ctx,
            target: C::TARGET,
            _spec: PhantomData,
        }
    }

    /// Read the defaults file for this target.
    pub fn load_defaults(&self) -> Result<C> {
        let path = self.ctx.ansible_path(self.target.defaults_file)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read defaults file: {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse defaults file: {}", path.display()))?;
        debug!(cluster = self.target.key, path = %path.display(), "loaded defaults");
        Ok(config)
    }

    /// Defaults file, or the built-in values for targets that have them.
    fn starting_config(&self) -> Result<C> {
        match (self.load_defaults(), C::builtin_defaults()) {
            (Ok(config), _) => Ok(config),
            (Err(err), Some(builtin)) => {
                warn!(
                    cluster = self.target.key,
                    error = %format!("{:#}", err),
                    "using built-in defaults"
                );
                println!("⚠️  Could not load defaults ({:#}), using built-in values", err);
                Ok(builtin)
            }
            (Err(err), None) => Err(err.context("Failed to load default configuration")),
        }
    }

    /// Show the defaults, then either keep them or ask for each field.
    pub fn interactive_configure(&self, prompter: &mut dyn Prompter, defaults: C) -> Result<C> {
        println!("\nCurrent default settings:");
        for (label, value) in defaults.summary() {
            println!("  {}: {}", label, value);
        }
        println!();

        if prompter.confirm("Do you want to use these default settings?", true)? {
            return Ok(defaults);
        }

        let mut config = defaults;
        config.configure(prompter)?;
        Ok(config)
    }

    /// Write `config` as YAML into a new temp directory.
    pub fn persist(&self, config: &C) -> Result<PersistedConfig> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-provision-", self.target.key))
            .tempdir()
            .context("Failed to create temp directory")?;

        let path = dir.path().join(self.target.config_file);
        let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
        std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(cluster = self.target.key, path = %path.display(), "persisted configuration");
        Ok(PersistedConfig { _dir: dir, path })
    }

    /// Launch the run for a persisted configuration.
    pub fn run(&self, config_path: &Path) -> Result<ExitStatus> {
        match self.target.run {
            RunStrategy::Playbook { playbook } => {
                let playbook = self.ctx.ansible_path(playbook)?;
                require(&playbook, "playbook file")?;

                let key = multipass::ensure_ssh_key(self.ctx)?;
                let inventory = Inventory::placeholder(key).write(&self.ctx.inventory_dir()?)?;
                ansible::run_playbook(
                    &playbook,
                    &inventory,
                    &ansible::extra_vars_file(config_path),
                )
            }
            RunStrategy::Script { script } => {
                let script = self.ctx.script_path(script)?;
                require(&script, "provisioning script")?;
                exec::run_inherited(&script, &[config_path])
            }
        }
    }

    /// Run the cleanup script for this target.
    pub fn cleanup(&self) -> Result<ExitStatus> {
        let script = self.ctx.script_path(self.target.cleanup_script)?;
        require(&script, "cleanup script")?;
        println!("Cleaning up {}...", self.target.display_name);
        exec::run_inherited::<_, &str>(&script, &[])
    }

    /// Full flow: defaults, optional edits, persist, confirm, run.
    pub fn provision_interactive(&self, prompter: &mut dyn Prompter) -> Result<()> {
        let defaults = self.starting_config()?;
        let config = self.interactive_configure(prompter, defaults)?;
        let persisted = self.persist(&config)?;

        println!(
            "\nReady to provision {} with the selected settings.",
            self.target.display_name
        );
        if !prompter.confirm("Do you want to proceed?", true)? {
            println!("Provisioning cancelled.");
            return Ok(());
        }

        println!("Provisioning {}...", self.target.display_name);
        let status = self.run(persisted.path())?;
        exec::ensure_success(self.target.run.program(), status)
            .with_context(|| format!("Failed to provision {}", self.target.display_name))?;

        println!("✓ {} provisioned", self.target.display_name);
        Ok(())
    }
}

fn require(path: &Path, kind: &'static str) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(ProvisionError::ResourceMissing {
        kind,
        path: path.to_path_buf(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{embedded_context, repository_context};
    use crate::prompt::scripted::{Answer, ScriptedPrompter};
    use std::fs;

    fn kubernetes_sample() -> KubernetesConfig {
        KubernetesConfig {
            kubernetes_version: "1.24".into(),
            pod_cidr: "192.168.0.0/16".into(),
            service_cidr: "10.96.0.0/16".into(),
            cni_plugin: "calico".into(),
            calico_version: "v3.24.1".into(),
            control_plane_cpus: 2,
            control_plane_memory: "4G".into(),
            control_plane_disk: "20G".into(),
            worker_cpus: 2,
            worker_memory: "2G".into(),
            worker_disk: "20G".into(),
            dns_servers: vec!["8.8.8.8".into()],
            kubernetes_packages: vec![],
        }
    }

    /// Repository with an `ansible/defaults` directory and optional files.
    fn repo_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let repo = tempfile::tempdir().unwrap();
        fs::create_dir_all(repo.path().join("ansible/defaults")).unwrap();
        fs::create_dir_all(repo.path().join("scripts")).unwrap();
        for (path, content) in files {
            let full = repo.path().join(path);
            fs::write(&full, content).unwrap();
            if path.ends_with(".sh") {
                exec::set_permissions(&full, 0o755).unwrap();
            }
        }
        repo
    }

    fn missing_kind(err: &anyhow::Error) -> Option<&'static str> {
        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::ResourceMissing { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    #[test]
    fn test_ordered_options_puts_current_first() {
        assert_eq!(ordered_options("flannel", &["calico", "flannel"]), vec!["flannel", "calico"]);
        assert_eq!(ordered_options("calico", &["calico", "flannel"]), vec!["calico", "flannel"]);
        assert_eq!(ordered_options("", &["calico", "flannel"]), vec!["calico", "flannel"]);
    }

    #[test]
    fn test_target_labels() {
        assert_eq!(TargetKind::from_label("RQLite Cluster"), Some(TargetKind::Rqlite));
        assert_eq!(TargetKind::from_label("Kubernetes Cluster"), Some(TargetKind::Kubernetes));
        assert_eq!(TargetKind::from_label("Nomad"), None);
        assert_eq!(TargetKind::Rqlite.cleanup_program(), "cleanup-rqlite.sh");
    }

    #[test]
    fn test_bundled_defaults_load() {
        let ctx = embedded_context();
        let k8s = Provisioner::<KubernetesConfig>::new(&ctx).load_defaults().unwrap();
        assert_eq!(k8s.cni_plugin, "calico");
        assert_eq!(k8s.kubernetes_packages.len(), 3);

        let rqlite = Provisioner::<RqliteConfig>::new(&ctx).load_defaults().unwrap();
        assert_eq!(rqlite.rqlite_http_port, 4001);
    }

    #[test]
    fn test_persist_round_trip() {
        let ctx = embedded_context();
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);
        let config = kubernetes_sample();

        let persisted = provisioner.persist(&config).unwrap();
        let path = persisted.path().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "kubernetes.yml");
        let dir_name = path.parent().unwrap().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with("kubernetes-provision-"));

        let text = fs::read_to_string(&path).unwrap();
        let back: KubernetesConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.kubernetes_version, "1.24");
        assert_eq!(back.service_cidr, "10.96.0.0/16");

        drop(persisted);
        assert!(!path.exists());
    }

    #[test]
    fn test_kubernetes_defaults_missing_or_malformed() {
        let repo = repo_with(&[]);
        let ctx = repository_context(repo.path());
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);

        assert!(provisioner.load_defaults().is_err());
        assert!(provisioner.starting_config().is_err());

        fs::write(
            repo.path().join("ansible/defaults/kubernetes.yml"),
            "kubernetes_version: [unclosed\n",
        )
        .unwrap();
        let err = provisioner.load_defaults().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse defaults file"));
    }

    #[test]
    fn test_rqlite_falls_back_to_builtin() {
        let repo = repo_with(&[]);
        let ctx = repository_context(repo.path());
        let provisioner = Provisioner::<RqliteConfig>::new(&ctx);

        assert!(provisioner.load_defaults().is_err());
        assert_eq!(provisioner.starting_config().unwrap(), RqliteConfig::builtin());
    }

    #[test]
    fn test_keeping_defaults_asks_nothing_else() {
        let ctx = embedded_context();
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(true)]);

        let config = provisioner
            .interactive_configure(&mut prompter, kubernetes_sample())
            .unwrap();
        assert_eq!(config, kubernetes_sample());
        assert_eq!(prompter.asked, vec!["Do you want to use these default settings?"]);
    }

    #[test]
    fn test_rqlite_defaults_flow_persists_file_values() {
        let defaults = "rqlite_version: \"8.0.0\"\nrqlite_http_port: 4001\nrqlite_raft_port: 4002\n\
                        rqlite_data_dir: /data\nrqlite_extract_dir: /opt/rqlite\n\
                        node_cpus: 1\nnode_memory: 1G\nnode_disk: 5G\n";
        let repo = repo_with(&[("ansible/defaults/rqlite.yml", defaults)]);
        let ctx = repository_context(repo.path());
        let provisioner = Provisioner::<RqliteConfig>::new(&ctx);

        let mut prompter = ScriptedPrompter::new([Answer::Confirm(true)]);
        let loaded = provisioner.starting_config().unwrap();
        let config = provisioner.interactive_configure(&mut prompter, loaded).unwrap();
        let persisted = provisioner.persist(&config).unwrap();

        let back: RqliteConfig =
            serde_yaml::from_str(&fs::read_to_string(persisted.path()).unwrap()).unwrap();
        assert_eq!(back.rqlite_http_port, 4001);
        assert_eq!(back.rqlite_version, "8.0.0");
    }

    #[test]
    fn test_run_requires_playbook() {
        let repo = repo_with(&[]);
        let ctx = repository_context(repo.path());
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);

        let err = provisioner.run(Path::new("/tmp/kubernetes.yml")).unwrap_err();
        assert_eq!(missing_kind(&err), Some("playbook file"));
        assert!(!ctx.inventory_dir().unwrap().exists());
    }

    #[test]
    fn test_run_requires_script() {
        let repo = repo_with(&[]);
        let ctx = repository_context(repo.path());

        let err = Provisioner::<RqliteConfig>::new(&ctx)
            .run(Path::new("/tmp/rqlite.yml"))
            .unwrap_err();
        assert_eq!(missing_kind(&err), Some("provisioning script"));

        let err = Provisioner::<RqliteConfig>::new(&ctx).cleanup().unwrap_err();
        assert_eq!(missing_kind(&err), Some("cleanup script"));
    }

    #[test]
    fn test_playbook_run_writes_inventory_first() {
        if exec::check_command_exists(ansible::ANSIBLE_PLAYBOOK) {
            return;
        }
        let mut ctx = embedded_context();
        ctx.settings.ssh_private_key_file = Some(PathBuf::from("/keys/cluster"));
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);
        let persisted = provisioner.persist(&kubernetes_sample()).unwrap();

        let err = provisioner.run(persisted.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ToolNotFound { .. })
        ));
        let inventory = ctx.inventory_dir().unwrap().join("kubernetes.yml");
        assert!(fs::read_to_string(inventory).unwrap().contains("/keys/cluster"));
    }

    #[test]
    fn test_playbook_run_generates_default_key() {
        if exec::check_command_exists(ansible::ANSIBLE_PLAYBOOK)
            || !exec::check_command_exists("ssh-keygen")
        {
            return;
        }
        let ctx = embedded_context();
        let provisioner = Provisioner::<KubernetesConfig>::new(&ctx);
        let persisted = provisioner.persist(&kubernetes_sample()).unwrap();

        provisioner.run(persisted.path()).unwrap_err();

        let key = ctx.ssh_private_key_file().unwrap();
        assert!(key.is_file());
        let inventory = ctx.inventory_dir().unwrap().join("kubernetes.yml");
        let rendered = fs::read_to_string(inventory).unwrap();
        assert!(rendered.contains(&key.display().to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_receives_config_path() {
        let script = "#!/bin/sh\ncp \"$1\" \"$(dirname \"$0\")/received.yml\"\n";
        let repo = repo_with(&[("scripts/provision-rqlite.sh", script)]);
        let ctx = repository_context(repo.path());
        let provisioner = Provisioner::<RqliteConfig>::new(&ctx);

        let persisted = provisioner.persist(&RqliteConfig::builtin()).unwrap();
        let status = provisioner.run(persisted.path()).unwrap();
        assert!(status.success());

        let received = fs::read_to_string(repo.path().join("scripts/received.yml")).unwrap();
        assert_eq!(received, fs::read_to_string(persisted.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_cleanup_returns_script_status() {
        let repo = repo_with(&[("scripts/cleanup-rqlite.sh", "#!/bin/sh\nexit 4\n")]);
        let ctx = repository_context(repo.path());

        let status = TargetKind::Rqlite.cleanup(&ctx).unwrap();
        assert_eq!(status.code(), Some(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_cleanup_script_without_execute_bit() {
        let repo = repo_with(&[("scripts/cleanup-rqlite.sh", "#!/bin/sh\nexit 0\n")]);
        exec::set_permissions(repo.path().join("scripts/cleanup-rqlite.sh"), 0o644).unwrap();
        let ctx = repository_context(repo.path());

        let err = Provisioner::<RqliteConfig>::new(&ctx).cleanup().unwrap_err();
        assert!(!matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ToolNotFound { .. })
        ));
        assert_eq!(
            err.downcast_ref::<std::io::Error>().map(|e| e.kind()),
            Some(std::io::ErrorKind::PermissionDenied)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_declining_to_proceed_runs_nothing() {
        let script = "#!/bin/sh\ntouch \"$(dirname \"$0\")/ran\"\n";
        let repo = repo_with(&[("scripts/provision-rqlite.sh", script)]);
        let ctx = repository_context(repo.path());

        let mut prompter = ScriptedPrompter::new([Answer::Confirm(true), Answer::Confirm(false)]);
        TargetKind::Rqlite.provision(&ctx, &mut prompter).unwrap();

        assert_eq!(prompter.remaining(), 0);
        assert!(!repo.path().join("scripts/ran").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_script_is_reported() {
        let repo = repo_with(&[("scripts/provision-rqlite.sh", "#!/bin/sh\nexit 2\n")]);
        let ctx = repository_context(repo.path());

        let mut prompter = ScriptedPrompter::new([Answer::Default, Answer::Default]);
        let err = TargetKind::Rqlite.provision(&ctx, &mut prompter).unwrap_err();
        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::ToolFailed { program, code }) => {
                assert_eq!(program, "provision-rqlite.sh");
                assert_eq!(*code, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
