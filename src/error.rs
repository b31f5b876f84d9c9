use std::path::PathBuf;
use thiserror::Error;

/// Failures the provisioning flow can report on its own.
///
/// I/O and YAML errors are not listed here; they travel as their source
/// error wrapped in `anyhow` context naming the path involved.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(
        "repository root not found (searched upward from {0})\nRun the command from inside the infrastructure repository that contains ansible/defaults/kubernetes.yml, or use the embedded resources"
    )]
    RootNotFound(PathBuf),

    #[error("{kind} does not exist: {path}")]
    ResourceMissing { kind: &'static str, path: PathBuf },

    #[error("{program} command not found on PATH")]
    ToolNotFound { program: String },

    #[error("{program} exited with status {code}")]
    ToolFailed { program: String, code: i32 },

    #[error("input aborted: {0}")]
    Input(String),

    #[error("failed to read VM info: {0}")]
    VmInfo(String),
}
