//! [`LabSandbox`]: a throwaway lab directory layout.

use std::fs;
use std::path::{Path, PathBuf};

use lab_fs::LabPaths;
use lab_fs::constants::ENCRYPTED_KUBECONFIG_SUFFIX;
use tempfile::TempDir;

/// State, cache and project config roots inside one temporary directory.
pub struct LabSandbox {
    temp_dir: TempDir,
    paths: LabPaths,
}

impl Default for LabSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl LabSandbox {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let paths = LabPaths::under(temp_dir.path());
        Self { temp_dir, paths }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn paths(&self) -> &LabPaths {
        &self.paths
    }

    /// `<state>/env`, where environment records live.
    pub fn env_state_dir(&self) -> PathBuf {
        self.paths.state_dir("env")
    }

    /// `<cache>/k8s`, the root of decrypted kubeconfigs.
    pub fn k8s_cache_dir(&self) -> PathBuf {
        self.paths.cache_dir("k8s")
    }

    /// Place an "encrypted" kubeconfig for `env` under the project config.
    ///
    /// The content is stored verbatim; pair it with a fake decryptor.
    pub fn write_encrypted_kubeconfig(&self, env: &str, content: &str) -> PathBuf {
        let dir = self.paths.project_config.join("kubeconfig");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{env}{ENCRYPTED_KUBECONFIG_SUFFIX}"));
        fs::write(&path, content).unwrap_or_else(|e| {
            panic!("LabSandbox: failed to write {}: {e}", path.display())
        });
        path
    }

    /// Copy configuration documents into the sandbox's project config.
    pub fn write_config(&self, file_name: &str, content: &str) {
        fs::create_dir_all(&self.paths.project_config).unwrap();
        fs::write(self.paths.project_config.join(file_name), content).unwrap();
    }
}
