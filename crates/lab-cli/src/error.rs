//! Error types for lab-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from lab-config
    #[error(transparent)]
    Config(#[from] lab_config::Error),

    /// Error from lab-env
    #[error(transparent)]
    Env(#[from] lab_env::Error),

    /// Error from lab-credentials
    #[error(transparent)]
    Credentials(#[from] lab_credentials::Error),

    /// Error from lab-fs
    #[error(transparent)]
    Fs(#[from] lab_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
