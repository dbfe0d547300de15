//! Persisted environment records and their reconciled view

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the physical cluster, which is never persisted.
pub const PRODUCTION: &str = "production";

/// Prefix of every kind cluster lab creates.
pub const CLUSTER_PREFIX: &str = "lab-";

/// Kind cluster name for an environment.
pub fn cluster_name(env: &str) -> String {
    format!("{CLUSTER_PREFIX}{env}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    /// Ephemeral cluster managed through kind
    Kind,
    /// The production hardware cluster
    Physical,
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentType::Kind => write!(f, "kind"),
            EnvironmentType::Physical => write!(f, "physical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentStatus {
    Creating,
    Running,
    Stopped,
    Error,
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnvironmentStatus::Creating => "creating",
            EnvironmentStatus::Running => "running",
            EnvironmentStatus::Stopped => "stopped",
            EnvironmentStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Cluster details of an ephemeral environment.
///
/// Snake-case keys from older state files are still accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default, alias = "kind_cluster_name", skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(default, alias = "kubeconfig", skip_serializing_if = "path_is_empty")]
    pub kubeconfig_path: PathBuf,
    #[serde(default, alias = "workers")]
    pub worker_count: u32,
}

fn path_is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// What lab persists for one environment in `<state>/<name>/state.json`.
///
/// `status` is the intended status: the outcome of the last lifecycle
/// operation. It is never overwritten by what the provisioner reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EnvironmentType,
    pub status: EnvironmentStatus,
    /// Advisory clone source
    #[serde(default, alias = "from_env", skip_serializing_if = "Option::is_none")]
    pub from_env: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
    pub config: ClusterConfig,
}

impl EnvironmentRecord {
    /// Set the intended status and bump `updated_at`.
    pub fn transition(&mut self, status: EnvironmentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// An environment as reported to callers: the persisted record plus the
/// status observed from the provisioner at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEnvironment {
    #[serde(flatten)]
    pub record: EnvironmentRecord,
    pub observed_status: EnvironmentStatus,
}

impl ManagedEnvironment {
    /// The always-present virtual record for the physical cluster.
    pub fn production() -> Self {
        let now = Utc::now();
        Self {
            record: EnvironmentRecord {
                name: PRODUCTION.to_string(),
                kind: EnvironmentType::Physical,
                status: EnvironmentStatus::Running,
                from_env: None,
                created_at: now,
                updated_at: now,
                config: ClusterConfig::default(),
            },
            observed_status: EnvironmentStatus::Running,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn intended_status(&self) -> EnvironmentStatus {
        self.record.status
    }

    /// What the provisioner reported when this view was built.
    pub fn observed_status(&self) -> EnvironmentStatus {
        self.observed_status
    }

    /// The status to act on: the observed one.
    pub fn status(&self) -> EnvironmentStatus {
        self.observed_status
    }

    /// Intended and observed status disagree, e.g. after a stop that kept
    /// the cluster running.
    pub fn drifted(&self) -> bool {
        self.record.status != self.observed_status
    }
}
