//! XDG-style directory layout for lab
//!
//! Mirrors the conventions operators expect from other CLI tools:
//!
//! ```text
//! ~/.config/lab/<subcommand>        user configuration
//! ~/.cache/lab/<subcommand>         decrypted, disposable material
//! ~/.local/state/lab/<subcommand>   environment records
//! ./config                          project (source-controlled) documents
//! ```

use std::path::{Path, PathBuf};

use crate::{Error, Result};

const APP_NAME: &str = "lab";

/// Project-relative directory holding the declarative environment documents.
pub const PROJECT_CONFIG_DIR: &str = "config";

/// Resolved base directories for one lab invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabPaths {
    /// Source-controlled configuration (environment documents, encrypted kubeconfigs)
    pub project_config: PathBuf,
    /// Per-user state root (`~/.local/state/lab`)
    pub state: PathBuf,
    /// Per-user cache root (`~/.cache/lab`)
    pub cache: PathBuf,
}

impl LabPaths {
    /// Build the layout from platform defaults.
    ///
    /// Platforms without a dedicated state directory fall back to the local
    /// data directory.
    pub fn from_platform(cwd: &Path) -> Result<Self> {
        let state = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or(Error::NoBaseDirectory { kind: "state" })?;
        let cache = dirs::cache_dir().ok_or(Error::NoBaseDirectory { kind: "cache" })?;

        let paths = Self {
            project_config: cwd.join(PROJECT_CONFIG_DIR),
            state: state.join(APP_NAME),
            cache: cache.join(APP_NAME),
        };
        tracing::debug!(?paths, "Resolved platform directory layout");
        Ok(paths)
    }

    /// Build the layout under a single root, used by tests and sandboxes.
    pub fn under(root: &Path) -> Self {
        Self {
            project_config: root.join(PROJECT_CONFIG_DIR),
            state: root.join("state").join(APP_NAME),
            cache: root.join("cache").join(APP_NAME),
        }
    }

    /// State directory for a subcommand, e.g. `~/.local/state/lab/env`.
    pub fn state_dir(&self, subcommand: &str) -> PathBuf {
        self.state.join(subcommand)
    }

    /// Cache directory for a subcommand, e.g. `~/.cache/lab/k8s`.
    pub fn cache_dir(&self, subcommand: &str) -> PathBuf {
        self.cache.join(subcommand)
    }
}
