use crate::error::ProvisionError;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::{debug, info};

/// Resolve a program on the search path.
///
/// A program given as a path (anything with more than one component) is
/// returned as is. Its existence is checked by the caller, and spawning it
/// reports permission problems as they are.
pub fn resolve_program(program: impl AsRef<OsStr>) -> Result<PathBuf> {
    let path = Path::new(program.as_ref());
    if path.components().count() > 1 {
        return Ok(path.to_path_buf());
    }

    which::which(path).map_err(|err| {
        debug!(program = %path.display(), error = %err, "program lookup failed");
        ProvisionError::ToolNotFound {
            program: path.display().to_string(),
        }
        .into()
    })
}

/// Check if a command exists using the which crate
pub fn check_command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}

/// Run a program with stdin, stdout and stderr connected to ours.
///
/// A bare program name must resolve on the search path first; nothing is
/// spawned otherwise. The exit status is returned verbatim.
pub fn run_inherited<P, S>(program: P, args: &[S]) -> Result<ExitStatus>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr> + Debug,
{
    let program = Path::new(program.as_ref());
    let resolved = resolve_program(program)?;
    info!(program = %program.display(), path = %resolved.display(), ?args, "spawning");

    let status = Command::new(&resolved)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute command: {}", program.display()))?;

    debug!(program = %program.display(), ?status, "finished");
    Ok(status)
}

/// Run a program and capture its output (stdin closed).
pub fn execute<P, S>(program: P, args: &[S]) -> Result<Output>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr> + Debug,
{
    let program = Path::new(program.as_ref());
    let resolved = resolve_program(program)?;
    debug!(program = %program.display(), ?args, "executing");

    Command::new(&resolved)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute command: {}", program.display()))
}

/// Turn a non-zero exit status into a `ToolFailed` error.
pub fn ensure_success(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    // Killed by a signal: no code, report as 1 like a shell would for "failed"
    Err(ProvisionError::ToolFailed {
        program: program.to_string(),
        code: status.code().unwrap_or(1),
    }
    .into())
}

/// Run with inherited stdio and fail on a non-zero exit.
pub fn run_checked<S>(program: &str, args: &[S]) -> Result<()>
where
    S: AsRef<OsStr> + Debug,
{
    let status = run_inherited(program, args)?;
    ensure_success(program, status)
}

/// Set file permissions (Unix only)
#[cfg(unix)]
pub fn set_permissions(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let path_ref = path.as_ref();
    std::fs::set_permissions(path_ref, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions for: {}", path_ref.display()))
}

#[cfg(not(unix))]
pub fn set_permissions(_path: impl AsRef<Path>, _mode: u32) -> Result<()> {
    Ok(())
}
