//! Provisioning context shared by every command.
//!
//! Holds the resource tree the run reads from (extracted embedded resources,
//! or a discovered repository) together with the user settings, and derives
//! every resource path from it.

use crate::config::{ANSIBLE_DIR, CLOUD_INIT_DIR, RepoLocator, SCRIPTS_DIR};
use crate::config_manager::{ResourceMode, Settings};
use crate::embedded::{self, ExtractedResources};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tempfile::TempDir;

pub(crate) const SSH_KEY_NAME: &str = "id_rsa_provisioning";

pub enum ResourceTree {
    Extracted(ExtractedResources),
    Repository {
        locator: RepoLocator,
        /// Generated artifacts never go into the repository checkout
        scratch: TempDir,
    },
}

pub struct ProvisionContext {
    tree: ResourceTree,
    pub settings: Settings,
}

impl ProvisionContext {
    /// Build the context the settings ask for.
    pub fn new(settings: Settings) -> Result<Self> {
        match settings.resources {
            ResourceMode::Embedded => {
                let resources =
                    embedded::extract().context("Failed to initialize resources")?;
                Ok(Self::embedded(resources, settings))
            }
            ResourceMode::Repository => {
                let locator = RepoLocator::from_current_dir()?
                    .with_explicit_root(settings.repo_root.clone());
                Self::repository(locator, settings)
            }
        }
    }

    pub fn embedded(resources: ExtractedResources, settings: Settings) -> Self {
        Self {
            tree: ResourceTree::Extracted(resources),
            settings,
        }
    }

    pub fn repository(locator: RepoLocator, settings: Settings) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("provision-work-")
            .tempdir()
            .context("Failed to create temp directory")?;
        Ok(Self {
            tree: ResourceTree::Repository { locator, scratch },
            settings,
        })
    }

    /// Directory holding `ansible/`, `scripts/` and `multipass/`.
    pub fn resource_root(&self) -> Result<PathBuf> {
        match &self.tree {
            ResourceTree::Extracted(resources) => resources
                .path()
                .map(|p| p.to_path_buf())
                .context("Embedded resources have already been removed"),
            ResourceTree::Repository { locator, .. } => locator.resolve(),
        }
    }

    pub fn ansible_path(&self, relative: &str) -> Result<PathBuf> {
        match &self.tree {
            ResourceTree::Repository { locator, .. } => locator.ansible_path(relative),
            ResourceTree::Extracted(_) => Ok(self.resource_root()?.join(ANSIBLE_DIR).join(relative)),
        }
    }

    pub fn script_path(&self, name: &str) -> Result<PathBuf> {
        match &self.tree {
            ResourceTree::Repository { locator, .. } => locator.scripts_path(name),
            ResourceTree::Extracted(_) => Ok(self.resource_root()?.join(SCRIPTS_DIR).join(name)),
        }
    }

    pub fn cloud_init_path(&self, name: &str) -> Result<PathBuf> {
        match &self.tree {
            ResourceTree::Repository { locator, .. } => locator.cloud_init_path(name),
            ResourceTree::Extracted(_) => {
                Ok(self.resource_root()?.join(CLOUD_INIT_DIR).join(name))
            }
        }
    }

    /// Writable directory for generated files (inventories, keys).
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.tree {
            ResourceTree::Extracted(_) => self.resource_root(),
            ResourceTree::Repository { scratch, .. } => Ok(scratch.path().to_path_buf()),
        }
    }

    pub fn inventory_dir(&self) -> Result<PathBuf> {
        Ok(self.work_dir()?.join(ANSIBLE_DIR).join("inventories"))
    }

    pub fn ssh_dir(&self) -> Result<PathBuf> {
        Ok(self.work_dir()?.join("ssh"))
    }

    /// Private key written into the inventory.
    pub fn ssh_private_key_file(&self) -> Result<PathBuf> {
        match &self.settings.ssh_private_key_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.ssh_dir()?.join(SSH_KEY_NAME)),
        }
    }

    pub fn mode(&self) -> ResourceMode {
        match self.tree {
            ResourceTree::Extracted(_) => ResourceMode::Embedded,
            ResourceTree::Repository { .. } => ResourceMode::Repository,
        }
    }

    /// Remove extracted resources now instead of at drop.
    pub fn teardown(&mut self) -> Result<()> {
        match &mut self.tree {
            ResourceTree::Extracted(resources) => resources.teardown(),
            ResourceTree::Repository { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Context over a freshly extracted copy of the bundled resources.
    pub fn embedded_context() -> ProvisionContext {
        let resources = embedded::extract().unwrap();
        ProvisionContext::embedded(resources, Settings::default())
    }

    /// Context over a repository rooted at `root`.
    pub fn repository_context(root: &std::path::Path) -> ProvisionContext {
        ProvisionContext::repository(RepoLocator::new(root), Settings::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::fs;

    #[test]
    fn test_embedded_paths() {
        let ctx = embedded_context();
        let root = ctx.resource_root().unwrap();

        assert_eq!(ctx.mode(), ResourceMode::Embedded);
        assert!(ctx.ansible_path("defaults/kubernetes.yml").unwrap().is_file());
        assert!(ctx.script_path("cleanup-rqlite.sh").unwrap().is_file());
        assert!(ctx.cloud_init_path("common.yaml").unwrap().is_file());
        assert_eq!(ctx.inventory_dir().unwrap(), root.join("ansible/inventories"));
        assert_eq!(
            ctx.ssh_private_key_file().unwrap(),
            root.join("ssh/id_rsa_provisioning")
        );
    }

    #[test]
    fn test_teardown_removes_embedded_tree() {
        let mut ctx = embedded_context();
        let root = ctx.resource_root().unwrap();

        ctx.teardown().unwrap();
        assert!(!root.exists());
        assert!(ctx.resource_root().is_err());
        ctx.teardown().unwrap();
    }

    #[test]
    fn test_repository_writes_outside_checkout() {
        let repo = tempfile::tempdir().unwrap();
        fs::create_dir_all(repo.path().join("ansible/defaults")).unwrap();

        let ctx = repository_context(repo.path());
        assert_eq!(ctx.mode(), ResourceMode::Repository);
        assert_eq!(ctx.resource_root().unwrap(), repo.path());
        assert!(!ctx.inventory_dir().unwrap().starts_with(repo.path()));

        assert_eq!(
            ctx.ansible_path("defaults/rqlite.yml").unwrap(),
            repo.path().join("ansible/defaults/rqlite.yml")
        );
        assert_eq!(
            ctx.script_path("cleanup-rqlite.sh").unwrap(),
            repo.path().join("scripts/cleanup-rqlite.sh")
        );
        assert_eq!(
            ctx.cloud_init_path("common.yaml").unwrap(),
            repo.path().join("multipass/cloud-init/common.yaml")
        );
    }

    #[test]
    fn test_configured_ssh_key_wins() {
        let mut ctx = embedded_context();
        ctx.settings.ssh_private_key_file = Some(PathBuf::from("/keys/cluster"));
        assert_eq!(
            ctx.ssh_private_key_file().unwrap(),
            PathBuf::from("/keys/cluster")
        );
    }
}
