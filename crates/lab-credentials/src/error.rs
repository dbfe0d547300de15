//! Error types for lab-credentials

use std::path::PathBuf;

/// Result type for lab-credentials operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decrypting or binding credentials
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem error from lab-fs
    #[error(transparent)]
    Fs(#[from] lab_fs::Error),

    #[error("Kubeconfig for environment {env:?} not found at {path}")]
    NotFound { env: String, path: PathBuf },

    #[error("Invalid environment name {env:?}: {reason}")]
    InvalidName { env: String, reason: String },

    /// The decryption tool ran and exited unsuccessfully
    #[error("Failed to decrypt {path}: {stderr}")]
    Decryption { path: PathBuf, stderr: String },

    #[error("Failed to run {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Another environment's credentials are already bound
    #[error("Credentials for {active:?} are active; clean them up before using {requested:?}")]
    BindingActive { active: String, requested: String },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
