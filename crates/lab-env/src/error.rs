//! Error types for lab-env

use std::path::PathBuf;

use crate::record::EnvironmentStatus;

/// Result type for lab-env operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in environment lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem error from lab-fs
    #[error(transparent)]
    Fs(#[from] lab_fs::Error),

    #[error("Environment {name:?} not found")]
    NotFound { name: String },

    #[error("Environment {name:?} already exists")]
    AlreadyExists { name: String },

    #[error("{name:?} is reserved for the physical production cluster")]
    ReservedName { name: String },

    #[error("Invalid environment name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Environment {name:?} is already running")]
    AlreadyRunning { name: String },

    #[error("Environment {name:?} is not running (status: {status})")]
    NotRunning {
        name: String,
        status: EnvironmentStatus,
    },

    /// The provisioner ran and exited unsuccessfully
    #[error("`{command}` failed: {stderr}")]
    Provisioner { command: String, stderr: String },

    /// The provisioner binary could not be started at all
    #[error("Failed to run {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render cluster topology for {name:?}: {message}")]
    Topology { name: String, message: String },

    #[error("Kubeconfig for {name:?} not found at {path}")]
    KubeconfigMissing { name: String, path: PathBuf },

    #[error(
        "Production credentials are encrypted; use 'lab kubeconfig decrypt production' instead"
    )]
    ProductionKubeconfig,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::KubeconfigMissing { .. }
        )
    }
}
