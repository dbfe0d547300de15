//! Environment document fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Shared base: everything an overlay does not override, with placeholders
/// for the values every environment must supply.
pub const BASE_YAML: &str = r#"base:
  name: <name>
  cluster:
    domain: <required>
    timezone: Europe/Berlin
    networks:
      podCIDR: 10.42.0.0/16
      serviceCIDR: 10.43.0.0/16
      hostCIDR: <required>
  hosts: []
  apps:
    foundation:
      - cert-manager
      - argocd
    platform: []
    apps: []
"#;

pub const PRODUCTION_YAML: &str = r#"production:
  inherits: base
  cluster:
    domain: lab.example.com
    networks:
      hostCIDR: 192.168.1.0/24
  hosts:
    - name: node1
      ip: 192.168.1.10
      k3s:
        role: server
        clusterInit: true
      modules:
        - k3s
        - monitoring
    - name: node2
      ip: 192.168.1.11
      k3s:
        role: agent
        serverAddr: https://192.168.1.10:6443
  apps:
    platform:
      - ingress-nginx
    apps:
      - homepage
"#;

pub const STAGING_YAML: &str = r#"staging:
  inherits: production
  cluster:
    domain: staging.lab.example.com
"#;

/// A temporary configuration directory.
///
/// # Example
///
/// ```rust,no_run
/// use lab_test_utils::ConfigFixture;
///
/// let fixture = ConfigFixture::standard();
/// fixture.write("broken.yaml", "broken:\n  cluster: 3\n");
/// assert!(fixture.dir().join("production.yaml").exists());
/// ```
pub struct ConfigFixture {
    temp_dir: TempDir,
    dir: PathBuf,
}

impl ConfigFixture {
    /// An empty configuration directory.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("config");
        fs::create_dir_all(&dir).unwrap();
        Self { temp_dir, dir }
    }

    /// `base`, `production` and `staging`, where staging inherits production
    /// and production inherits base. All three validate against the built-in
    /// schema except `base`, which is intentionally incomplete.
    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write("base.yaml", BASE_YAML);
        fixture.write("production.yaml", PRODUCTION_YAML);
        fixture.write("staging.yaml", STAGING_YAML);
        fixture
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Root of the temporary directory holding [`dir`](Self::dir).
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write (or replace) a document.
    pub fn write(&self, file_name: &str, content: &str) {
        fs::write(self.dir.join(file_name), content)
            .unwrap_or_else(|e| panic!("ConfigFixture::write: failed to write {file_name}: {e}"));
    }

    pub fn remove(&self, file_name: &str) {
        fs::remove_file(self.dir.join(file_name))
            .unwrap_or_else(|e| panic!("ConfigFixture::remove: failed to remove {file_name}: {e}"));
    }
}
