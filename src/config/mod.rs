//! Repository root discovery.
//!
//! The CLI can run against a checked-out infrastructure repository instead
//! of its embedded resources. The root is found by walking up from the
//! working directory until a directory carries one of the known markers.

use crate::error::ProvisionError;
use anyhow::{Context, Result};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ANSIBLE_DIR: &str = "ansible";
pub const SCRIPTS_DIR: &str = "scripts";
pub const CLOUD_INIT_DIR: &str = "multipass/cloud-init";

const KUBERNETES_DEFAULTS: &str = "ansible/defaults/kubernetes.yml";
const KUBERNETES_PROVISION_SCRIPT: &str = "provision-kubernetes.sh";

/// Which marker identified a directory as the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMarker {
    AnsibleDefaults,
    ProvisionScript,
    DefaultsFile,
    GitCheckout,
}

/// Finds and remembers the repository root for one context.
#[derive(Debug)]
pub struct RepoLocator {
    start: PathBuf,
    explicit: Option<PathBuf>,
    root: OnceCell<PathBuf>,
}

impl RepoLocator {
    /// Search upward from the current working directory.
    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Ok(Self::new(cwd))
    }

    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
            explicit: None,
            root: OnceCell::new(),
        }
    }

    /// Prefer an explicitly configured root when it carries a marker.
    pub fn with_explicit_root(mut self, root: Option<PathBuf>) -> Self {
        self.explicit = root;
        self
    }

    /// Resolve the repository root. The first successful answer is kept, so
    /// every later call returns the same path.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(root) = self.root.get() {
            return Ok(root.clone());
        }

        let found = self.find()?;
        Ok(self.root.get_or_init(|| found).clone())
    }

    /// `ansible/<relative>` under the resolved root
    pub fn ansible_path(&self, relative: &str) -> Result<PathBuf> {
        Ok(self.resolve()?.join(ANSIBLE_DIR).join(relative))
    }

    /// `scripts/<name>` under the resolved root
    pub fn scripts_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.resolve()?.join(SCRIPTS_DIR).join(name))
    }

    /// `multipass/cloud-init/<name>` under the resolved root
    pub fn cloud_init_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.resolve()?.join(CLOUD_INIT_DIR).join(name))
    }

    fn find(&self) -> Result<PathBuf> {
        if let Some(explicit) = &self.explicit {
            debug!(root = %explicit.display(), "checking configured repository root");
            if let Some(marker) = root_marker(explicit) {
                info!(root = %explicit.display(), ?marker, "using configured repository root");
                return Ok(explicit.clone());
            }
            warn!(root = %explicit.display(), "configured repository root has no markers, searching instead");
        }

        let mut current = self.start.clone();
        debug!(start_dir = %self.start.display(), "searching for repository root");

        loop {
            if let Some(marker) = root_marker(&current) {
                info!(root = %current.display(), ?marker, "found repository root");
                return Ok(current);
            }

            if !current.pop() {
                break;
            }
        }

        warn!(start_dir = %self.start.display(), "repository root not found");
        Err(ProvisionError::RootNotFound(self.start.clone()).into())
    }
}

/// Test a directory against the root markers, in priority order.
pub fn root_marker(dir: &Path) -> Option<RootMarker> {
    let ansible = dir.join(ANSIBLE_DIR);
    let scripts = dir.join(SCRIPTS_DIR);

    if dir_exists(&ansible) && dir_exists(&ansible.join("defaults")) {
        return Some(RootMarker::AnsibleDefaults);
    }

    if dir_exists(&scripts) && file_exists(&scripts.join(KUBERNETES_PROVISION_SCRIPT)) {
        return Some(RootMarker::ProvisionScript);
    }

    if file_exists(&dir.join(KUBERNETES_DEFAULTS)) {
        return Some(RootMarker::DefaultsFile);
    }

    // A bare .git is not enough, it has to look like our repository
    if dir_exists(&dir.join(".git"))
        && (file_exists(&dir.join("README.md")) || dir_exists(&ansible) || dir_exists(&scripts))
    {
        return Some(RootMarker::GitCheckout);
    }

    None
}

pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}
