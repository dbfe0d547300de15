//! Error types for lab-config

use std::fmt;
use std::path::PathBuf;

/// Result type for lab-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, validating or exporting an environment
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem or document parse error from lab-fs
    #[error(transparent)]
    Fs(#[from] lab_fs::Error),

    #[error("No configuration documents found in {dir}")]
    NoDocuments { dir: PathBuf },

    #[error("Document {path} must be a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("Environment {name:?} not found in configuration at {dir}")]
    EnvironmentNotFound { name: String, dir: PathBuf },

    #[error("Environment {name:?} inherits from {parent:?}, which does not exist")]
    ParentNotFound { name: String, parent: String },

    #[error("Conflicting values at {path}: {existing} (earlier documents) vs {incoming} ({document})")]
    Conflict {
        path: String,
        existing: String,
        incoming: String,
        document: String,
    },

    #[error("Inheritance cycle: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },

    #[error("Cannot decode environment {name:?} at {path}: {message}")]
    Decode {
        name: String,
        path: String,
        message: String,
    },

    #[error("Invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to render environment {name:?} as {format}: {message}")]
    Render {
        name: String,
        format: &'static str,
        message: String,
    },

    #[error("Unsupported format: {format} (supported: {})", crate::export::SUPPORTED_FORMATS.join(", "))]
    UnsupportedFormat { format: String },
}

impl Error {
    /// The named environment (or one of its parents) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentNotFound { .. } | Self::ParentNotFound { .. }
        )
    }

    /// The source documents could not be turned into an environment.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Fs(lab_fs::Error::ConfigParse { .. })
                | Self::NotAMapping { .. }
                | Self::Conflict { .. }
                | Self::InheritanceCycle { .. }
                | Self::Decode { .. }
        )
    }
}

/// Which validation phase rejected an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// A present value does not conform to the schema
    Schema,
    /// The environment conforms but still has unresolved or missing values
    Incomplete,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::Schema => write!(f, "validation failed"),
            ValidationKind::Incomplete => write!(f, "incomplete configuration"),
        }
    }
}

/// One offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted field path, e.g. `hosts[0].ip`
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// An environment failed schema conformance or concreteness checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} for {environment:?}: {}", render_issues(.issues))]
pub struct ValidationError {
    pub environment: String,
    pub kind: ValidationKind,
    pub issues: Vec<ValidationIssue>,
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
