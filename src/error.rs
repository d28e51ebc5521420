use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsworksSshError {
    // Credentials file
    #[error("AWS config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Cannot determine home directory")]
    HomeDir,

    #[error("Configuration error: {0}")]
    Config(String),

    // Discovery
    #[error("Discovery failed for {target}: {message}")]
    Discovery { target: String, message: String },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // SSH config target
    #[error("SSH config file not found: {} (create it first)", .0.display())]
    TargetFileMissing(PathBuf),

    #[error("SSH config {} has a start marker without an end marker", .0.display())]
    CorruptSection(PathBuf),

    // File/IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpsworksSshError {
    pub fn ec2(region: &str, err: impl std::fmt::Display) -> Self {
        OpsworksSshError::Discovery {
            target: format!("EC2 region {}", region),
            message: err.to_string(),
        }
    }

    pub fn opsworks(target: &str, err: impl std::fmt::Display) -> Self {
        OpsworksSshError::Discovery {
            target: format!("OpsWorks {}", target),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsworksSshError>;
