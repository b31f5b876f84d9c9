//! Resources bundled into the binary at build time.
//!
//! Playbooks, defaults, scripts and cloud-init templates are compiled in so
//! the CLI works outside the repository. They are written to a fresh temp
//! directory at startup and removed when the handle goes away.

use crate::exec;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const TEMP_PREFIX: &str = "provision-resources-";

/// A file compiled into the binary, addressed by its path relative to the
/// resource root.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFile {
    pub path: &'static str,
    pub contents: &'static str,
}

macro_rules! bundle {
    ($path:literal) => {
        EmbeddedFile {
            path: $path,
            contents: include_str!(concat!("../resources/", $path)),
        }
    };
}

pub const RESOURCES: &[EmbeddedFile] = &[
    bundle!("ansible/defaults/kubernetes.yml"),
    bundle!("ansible/defaults/rqlite.yml"),
    bundle!("ansible/playbooks/kubernetes.yml"),
    bundle!("scripts/provision-kubernetes.sh"),
    bundle!("scripts/cleanup-kubernetes.sh"),
    bundle!("scripts/provision-rqlite.sh"),
    bundle!("scripts/cleanup-rqlite.sh"),
    bundle!("multipass/cloud-init/common.yaml"),
];

/// Handle to an extracted resource tree.
#[derive(Debug)]
pub struct ExtractedResources {
    dir: Option<TempDir>,
}

impl ExtractedResources {
    /// Root of the extracted tree, `None` after teardown.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }

    /// Remove the extracted tree. Calling it again is a no-op.
    pub fn teardown(&mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            dir.close()
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            debug!(path = %path.display(), "removed extracted resources");
        }
        Ok(())
    }
}

/// Extract the bundled resources into a new temp directory.
pub fn extract() -> Result<ExtractedResources> {
    extract_files_in(&std::env::temp_dir(), RESOURCES)
}

/// Extract `files` into a new unique directory under `base`.
///
/// If any file fails to copy, the partially written tree is removed before
/// the error is returned.
pub fn extract_files_in(base: &Path, files: &[EmbeddedFile]) -> Result<ExtractedResources> {
    let dir = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempdir_in(base)
        .with_context(|| format!("Failed to create temp directory in {}", base.display()))?;

    // `dir` is dropped on the error path, which deletes the tree
    for file in files {
        write_file(dir.path(), file)
            .with_context(|| format!("Failed to extract embedded file {}", file.path))?;
    }

    info!(path = %dir.path().display(), files = files.len(), "extracted embedded resources");
    Ok(ExtractedResources { dir: Some(dir) })
}

fn write_file(root: &Path, file: &EmbeddedFile) -> Result<PathBuf> {
    let dest = root.join(file.path);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory for {}", dest.display()))?;
    }

    std::fs::write(&dest, file.contents)
        .with_context(|| format!("Failed to write file {}", dest.display()))?;

    if dest.extension().is_some_and(|ext| ext == "sh") {
        exec::set_permissions(&dest, 0o755)?;
    }

    Ok(dest)
}
