use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{OpsworksSshError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 1;

/// Optional tool settings for opsworks-ssh
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// AWS config file to read accounts from
    #[serde(default)]
    pub aws_config: Option<PathBuf>,

    /// SSH config file rewritten by `--update`
    #[serde(default)]
    pub ssh_config: Option<PathBuf>,

    /// Per-call timeout for AWS requests
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra SDK attempts after a transient AWS failure
    #[serde(default)]
    pub retries: Option<u32>,

    /// Always back up the SSH config before updating
    #[serde(default)]
    pub backup: bool,
}

impl Settings {
    /// Get the path to the settings file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "opsworks-ssh")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load settings from the settings file, defaults if it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            OpsworksSshError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(settings)
    }

    /// AWS config path: explicit value (flag or AWS_CONFIG_FILE), settings, ~/.aws/config
    pub fn resolve_aws_config(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit.or_else(|| self.aws_config.clone()) {
            return Ok(path);
        }
        Ok(home_dir()?.join(".aws").join("config"))
    }

    /// SSH config path: explicit flag, settings, ~/.ssh/config
    pub fn resolve_ssh_config(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit.or_else(|| self.ssh_config.clone()) {
            return Ok(path);
        }
        Ok(home_dir()?.join(".ssh").join("config"))
    }

    pub fn timeout(&self, explicit: Option<u64>) -> Duration {
        Duration::from_secs(
            explicit
                .or(self.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn retries(&self, explicit: Option<u32>) -> u32 {
        explicit.or(self.retries).unwrap_or(DEFAULT_RETRIES)
    }
}

fn home_dir() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(OpsworksSshError::HomeDir)
}
