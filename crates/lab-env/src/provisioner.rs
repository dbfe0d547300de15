//! Ephemeral cluster provisioners
//!
//! [`KindProvisioner`] drives the `kind` binary; [`FakeProvisioner`] keeps
//! clusters in memory so lifecycle logic can be exercised without spawning
//! processes.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Command;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Everything needed to create one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    /// kind `Cluster` document to create from
    pub topology_path: PathBuf,
    /// Where the provisioner writes the cluster's kubeconfig
    pub kubeconfig_path: PathBuf,
}

/// The narrow capability lab needs from a cluster provisioner.
pub trait ClusterProvisioner: Send + Sync {
    /// Create a cluster and wait for it to be ready.
    fn create_cluster(&self, spec: &ClusterSpec) -> Result<()>;

    /// Delete a cluster. Deleting a cluster that does not exist succeeds.
    fn delete_cluster(&self, name: &str) -> Result<()>;

    /// Names of the clusters that currently exist.
    fn list_clusters(&self) -> Result<Vec<String>>;
}

/// Provisioner backed by the `kind` command-line tool.
#[derive(Debug, Clone)]
pub struct KindProvisioner {
    binary: PathBuf,
}

impl Default for KindProvisioner {
    fn default() -> Self {
        Self::new("kind")
    }
}

impl KindProvisioner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        command.args(args);
        let rendered = render_command(&command);
        tracing::debug!(command = %rendered, "Running provisioner");

        let output = command.output().map_err(|source| Error::ToolUnavailable {
            tool: self.binary.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(Error::Provisioner {
                command: rendered,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ClusterProvisioner for KindProvisioner {
    fn create_cluster(&self, spec: &ClusterSpec) -> Result<()> {
        self.run([
            OsStr::new("create"),
            OsStr::new("cluster"),
            OsStr::new("--name"),
            OsStr::new(&spec.name),
            OsStr::new("--config"),
            spec.topology_path.as_os_str(),
            OsStr::new("--kubeconfig"),
            spec.kubeconfig_path.as_os_str(),
        ])?;
        Ok(())
    }

    fn delete_cluster(&self, name: &str) -> Result<()> {
        self.run(["delete", "cluster", "--name", name])?;
        Ok(())
    }

    fn list_clusters(&self) -> Result<Vec<String>> {
        // "No kind clusters found." goes to stderr, so stdout only holds names.
        let stdout = self.run(["get", "clusters"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn render_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Which [`FakeProvisioner`] operation to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    Create,
    Delete,
    List,
}

#[derive(Debug, Default)]
struct FakeState {
    clusters: BTreeSet<String>,
    created: Vec<ClusterSpec>,
    deleted: Vec<String>,
    list_calls: usize,
    failures: Vec<FakeFailure>,
}

/// In-memory provisioner.
///
/// Created clusters are listed until deleted. When the kubeconfig's directory
/// exists a placeholder kubeconfig is written there, as `kind` would.
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    state: Mutex<FakeState>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `operation` fail until [`heal`](Self::heal).
    pub fn fail(&self, operation: FakeFailure) {
        self.state.lock().failures.push(operation);
    }

    pub fn heal(&self) {
        self.state.lock().failures.clear();
    }

    /// Add or remove a cluster behind lab's back.
    pub fn set_live(&self, name: &str, live: bool) {
        let mut state = self.state.lock();
        if live {
            state.clusters.insert(name.to_string());
        } else {
            state.clusters.remove(name);
        }
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.state.lock().clusters.contains(name)
    }

    pub fn created(&self) -> Vec<ClusterSpec> {
        self.state.lock().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    fn check(state: &FakeState, operation: FakeFailure, command: &str) -> Result<()> {
        if state.failures.contains(&operation) {
            return Err(Error::Provisioner {
                command: command.to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ClusterProvisioner for FakeProvisioner {
    fn create_cluster(&self, spec: &ClusterSpec) -> Result<()> {
        let mut state = self.state.lock();
        Self::check(&state, FakeFailure::Create, "kind create cluster")?;
        if spec
            .kubeconfig_path
            .parent()
            .is_some_and(|dir| dir.is_dir())
        {
            lab_fs::io::write_text(
                &spec.kubeconfig_path,
                &format!("apiVersion: v1\nkind: Config\ncurrent-context: kind-{}\n", spec.name),
            )?;
        }
        state.clusters.insert(spec.name.clone());
        state.created.push(spec.clone());
        Ok(())
    }

    fn delete_cluster(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::check(&state, FakeFailure::Delete, "kind delete cluster")?;
        state.clusters.remove(name);
        state.deleted.push(name.to_string());
        Ok(())
    }

    fn list_clusters(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        Self::check(&state, FakeFailure::List, "kind get clusters")?;
        Ok(state.clusters.iter().cloned().collect())
    }
}

impl<P: ClusterProvisioner + ?Sized> ClusterProvisioner for std::sync::Arc<P> {
    fn create_cluster(&self, spec: &ClusterSpec) -> Result<()> {
        (**self).create_cluster(spec)
    }

    fn delete_cluster(&self, name: &str) -> Result<()> {
        (**self).delete_cluster(name)
    }

    fn list_clusters(&self) -> Result<Vec<String>> {
        (**self).list_clusters()
    }
}
