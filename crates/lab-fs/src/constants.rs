//! Well-known file and directory names used by lab.

use std::path::Path;

/// Standard lab filesystem names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabFile {
    /// Per-environment lifecycle record
    StateFile,
    /// Per-environment kind cluster topology
    ClusterTopology,
    /// Per-environment kubeconfig written by the provisioner
    Kubeconfig,
    /// Directory holding encrypted and decrypted kubeconfigs
    KubeconfigDir,
}

impl LabFile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateFile => "state.json",
            Self::ClusterTopology => "kind-config.yaml",
            Self::Kubeconfig => "kubeconfig",
            Self::KubeconfigDir => "kubeconfig",
        }
    }
}

/// Suffix of sops-encrypted kubeconfigs under the config root.
pub const ENCRYPTED_KUBECONFIG_SUFFIX: &str = ".enc.yaml";

/// Suffix of decrypted kubeconfigs under the cache root.
pub const DECRYPTED_KUBECONFIG_SUFFIX: &str = ".yaml";

impl AsRef<Path> for LabFile {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl std::fmt::Display for LabFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
