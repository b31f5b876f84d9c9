use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR_NAME: &str = "provision";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const RESOURCES_ENV: &str = "PROVISION_RESOURCES";
pub const REPO_ROOT_ENV: &str = "PROVISION_REPO_ROOT";
pub const SSH_KEY_ENV: &str = "PROVISION_SSH_KEY";

/// Where playbooks, defaults and scripts are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// Resources bundled into the binary, extracted to a temp directory
    #[default]
    Embedded,
    /// Resources from a checked-out repository found by marker search
    #[value(alias = "repo")]
    #[serde(alias = "repo")]
    Repository,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub resources: ResourceMode,
    pub repo_root: Option<PathBuf>,
    pub ssh_private_key_file: Option<PathBuf>,
}

/// Overrides from the command line; `None` leaves the lower layers alone.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub resources: Option<ResourceMode>,
    pub repo_root: Option<PathBuf>,
}

pub fn get_home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE")) // Windows fallback
        .map(PathBuf::from)
        .with_context(|| "Could not determine home directory")
}

pub fn get_config_file_path() -> Result<PathBuf> {
    let home = get_home_dir()?;
    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

/// Read a settings file. A missing file yields the defaults.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(settings)
}

/// Apply `PROVISION_*` variables on top of file settings.
pub fn apply_env<F>(mut settings: Settings, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = lookup(RESOURCES_ENV) {
        settings.resources = match mode.trim().to_lowercase().as_str() {
            "embedded" => ResourceMode::Embedded,
            "repository" | "repo" => ResourceMode::Repository,
            other => anyhow::bail!(
                "Invalid {} value '{}': expected 'embedded' or 'repository'",
                RESOURCES_ENV,
                other
            ),
        };
    }
    if let Some(root) = lookup(REPO_ROOT_ENV).filter(|v| !v.trim().is_empty()) {
        settings.repo_root = Some(PathBuf::from(root));
    }
    if let Some(key) = lookup(SSH_KEY_ENV).filter(|v| !v.trim().is_empty()) {
        settings.ssh_private_key_file = Some(PathBuf::from(key));
    }
    Ok(settings)
}

impl Settings {
    pub fn apply_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(mode) = overrides.resources {
            self.resources = mode;
        }
        if let Some(root) = &overrides.repo_root {
            self.repo_root = Some(root.clone());
        }
        self
    }
}

/// Load settings: defaults < config file < environment (.env included) < flags.
pub fn load_settings(overrides: &SettingsOverrides) -> Result<Settings> {
    // A .env next to the invocation may carry PROVISION_* values
    if let Ok(path) = dotenv::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }

    let file = match get_config_file_path() {
        Ok(path) => load_settings_file(&path)?,
        Err(_) => Settings::default(),
    };
    let settings = apply_env(file, |key| std::env::var(key).ok())?;
    Ok(settings.apply_overrides(overrides))
}
