//! The environment lifecycle state machine
//!
//! ```text
//! creating -> running <-> stopped -> (deleted)
//!     \          |           |
//!      `------> error <-----'      any provisioner failure
//! ```
//!
//! The persisted status records intent. What the provisioner reports is
//! observed on every read and never written back.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::error::{Error, Result};
use crate::provisioner::{ClusterProvisioner, ClusterSpec};
use crate::record::{
    ClusterConfig, EnvironmentRecord, EnvironmentStatus, EnvironmentType, ManagedEnvironment,
    PRODUCTION, cluster_name,
};
use crate::store::EnvironmentStore;
use crate::topology::{KindCluster, clamp_workers};

/// Cluster names must be valid DNS labels; `lab-` is prepended.
static ENV_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,57}[a-z0-9])?$").expect("Invalid environment name regex")
});

/// Check that `name` can be used for a new ephemeral environment.
pub fn validate_name(name: &str) -> Result<()> {
    if name == PRODUCTION {
        return Err(Error::ReservedName {
            name: name.to_string(),
        });
    }
    check_identifier(name)?;
    if !ENV_NAME.is_match(name) {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "use lowercase letters, digits and '-', starting and ending with a letter or digit (max 59 characters)".to_string(),
        });
    }
    Ok(())
}

/// Reject names that would resolve outside the state root.
fn check_identifier(name: &str) -> Result<()> {
    lab_fs::validate_path_identifier(name).map_err(|e| Error::InvalidName {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Drives environment lifecycles over an injected store and provisioner.
pub struct EnvironmentManager<S, P> {
    store: S,
    provisioner: P,
}

impl<S: EnvironmentStore, P: ClusterProvisioner> EnvironmentManager<S, P> {
    pub fn new(store: S, provisioner: P) -> Self {
        Self { store, provisioner }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Create and start a new ephemeral environment.
    ///
    /// A `creating` record is written before the provisioner runs. If the
    /// provisioner fails the record is kept with status `error`.
    pub fn create(
        &self,
        name: &str,
        from_env: Option<&str>,
        workers: i32,
    ) -> Result<ManagedEnvironment> {
        validate_name(name)?;
        if self.store.exists(name) {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        let now = Utc::now();
        let mut record = EnvironmentRecord {
            name: name.to_string(),
            kind: EnvironmentType::Kind,
            status: EnvironmentStatus::Creating,
            from_env: from_env.map(str::to_string),
            created_at: now,
            updated_at: now,
            config: ClusterConfig {
                cluster_name: cluster_name(name),
                kubeconfig_path: self.store.kubeconfig_path(name),
                worker_count: clamp_workers(workers),
            },
        };
        self.store.save(&record)?;
        tracing::info!(name, workers = record.config.worker_count, "Creating environment");

        let provisioned = KindCluster::new(&record.config.cluster_name, workers)
            .render()
            .and_then(|topology| self.store.write_topology(name, &topology))
            .and_then(|()| self.provisioner.create_cluster(&self.spec(&record)));
        self.settle(&mut record, provisioned, EnvironmentStatus::Running)?;

        Ok(ManagedEnvironment {
            record,
            observed_status: EnvironmentStatus::Running,
        })
    }

    /// Bring a stopped or failed environment back up.
    ///
    /// The cluster is recreated from its saved topology when the provisioner
    /// no longer reports it.
    pub fn start(&self, name: &str) -> Result<ManagedEnvironment> {
        if name == PRODUCTION {
            return Err(Error::AlreadyRunning {
                name: name.to_string(),
            });
        }
        let mut record = self.require(name)?;
        if record.status == EnvironmentStatus::Running {
            return Err(Error::AlreadyRunning {
                name: name.to_string(),
            });
        }

        let live = self.provisioner.list_clusters()?;
        if live.contains(&record.config.cluster_name) {
            tracing::debug!(name, "Cluster still exists, marking running");
        } else {
            tracing::info!(name, "Recreating cluster from saved topology");
            let created = self.provisioner.create_cluster(&self.spec(&record));
            self.settle(&mut record, created, EnvironmentStatus::Running)?;
            return Ok(ManagedEnvironment {
                record,
                observed_status: EnvironmentStatus::Running,
            });
        }

        record.transition(EnvironmentStatus::Running);
        self.store.save(&record)?;
        Ok(ManagedEnvironment {
            record,
            observed_status: EnvironmentStatus::Running,
        })
    }

    /// Stop a running environment.
    ///
    /// With `preserve_state` the cluster is left in place and only the
    /// intended status changes; the returned view then reports drift.
    pub fn stop(&self, name: &str, preserve_state: bool) -> Result<ManagedEnvironment> {
        if name == PRODUCTION {
            return Err(Error::ReservedName {
                name: name.to_string(),
            });
        }
        let mut record = self.require(name)?;
        if record.status != EnvironmentStatus::Running {
            return Err(Error::NotRunning {
                name: name.to_string(),
                status: record.status,
            });
        }

        if preserve_state {
            tracing::info!(name, "Stopping environment, keeping cluster");
            record.transition(EnvironmentStatus::Stopped);
            self.store.save(&record)?;
        } else {
            tracing::info!(name, "Stopping environment");
            let deleted = self.provisioner.delete_cluster(&record.config.cluster_name);
            self.settle(&mut record, deleted, EnvironmentStatus::Stopped)?;
        }

        let live = self.live_clusters();
        Ok(observe(record, live.as_deref()))
    }

    /// Delete an environment and its cluster.
    ///
    /// Cluster deletion is best effort; the state directory is always
    /// removed. Deleting an unknown environment succeeds.
    pub fn delete(&self, name: &str) -> Result<()> {
        if name == PRODUCTION {
            return Err(Error::ReservedName {
                name: name.to_string(),
            });
        }
        check_identifier(name)?;

        let cluster = match self.store.load(name) {
            Ok(Some(record)) if !record.config.cluster_name.is_empty() => {
                record.config.cluster_name
            }
            Ok(_) => cluster_name(name),
            Err(e) => {
                tracing::warn!("Unreadable record for {}: {}", name, e);
                cluster_name(name)
            }
        };

        if let Err(e) = self.provisioner.delete_cluster(&cluster) {
            tracing::warn!("Failed to delete cluster {}: {}", cluster, e);
        }
        self.store.remove(name)?;
        tracing::info!(name, "Deleted environment");
        Ok(())
    }

    /// Every environment: production first, then persisted records by name.
    ///
    /// The provisioner is queried once. Records that cannot be read are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<ManagedEnvironment>> {
        let names = self.store.names()?;
        let live = self.live_clusters();

        let mut environments = vec![ManagedEnvironment::production()];
        for name in names {
            match self.store.load(&name) {
                Ok(Some(record)) => environments.push(observe(record, live.as_deref())),
                Ok(None) => tracing::debug!(name, "Skipping directory without a record"),
                Err(e) => tracing::warn!("Skipping unreadable environment {}: {}", name, e),
            }
        }
        Ok(environments)
    }

    pub fn get(&self, name: &str) -> Result<ManagedEnvironment> {
        if name == PRODUCTION {
            return Ok(ManagedEnvironment::production());
        }
        let record = self.require(name)?;
        let live = self.live_clusters();
        Ok(observe(record, live.as_deref()))
    }

    pub fn exists(&self, name: &str) -> bool {
        name == PRODUCTION || (check_identifier(name).is_ok() && self.store.exists(name))
    }

    /// Kubeconfig written for an ephemeral environment.
    pub fn kubeconfig(&self, name: &str) -> Result<PathBuf> {
        if name == PRODUCTION {
            return Err(Error::ProductionKubeconfig);
        }
        let record = self.require(name)?;
        let path = if record.config.kubeconfig_path.as_os_str().is_empty() {
            self.store.kubeconfig_path(name)
        } else {
            record.config.kubeconfig_path
        };
        if !path.is_file() {
            return Err(Error::KubeconfigMissing {
                name: name.to_string(),
                path,
            });
        }
        Ok(path)
    }

    fn require(&self, name: &str) -> Result<EnvironmentRecord> {
        check_identifier(name)?;
        self.store.load(name)?.ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })
    }

    fn spec(&self, record: &EnvironmentRecord) -> ClusterSpec {
        let kubeconfig_path = if record.config.kubeconfig_path.as_os_str().is_empty() {
            self.store.kubeconfig_path(&record.name)
        } else {
            record.config.kubeconfig_path.clone()
        };
        ClusterSpec {
            name: record.config.cluster_name.clone(),
            topology_path: self.store.topology_path(&record.name),
            kubeconfig_path,
        }
    }

    /// Persist the outcome of a provisioner step: `success` on `Ok`, `error`
    /// on failure (the original error is returned).
    fn settle(
        &self,
        record: &mut EnvironmentRecord,
        outcome: Result<()>,
        success: EnvironmentStatus,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                record.transition(success);
                self.store.save(record)?;
                tracing::info!(name = %record.name, status = %success, "Environment transitioned");
                Ok(())
            }
            Err(e) => {
                record.transition(EnvironmentStatus::Error);
                if let Err(save_err) = self.store.save(record) {
                    tracing::warn!("Failed to record error status for {}: {}", record.name, save_err);
                }
                Err(e)
            }
        }
    }

    fn live_clusters(&self) -> Option<Vec<String>> {
        match self.provisioner.list_clusters() {
            Ok(live) => Some(live),
            Err(e) => {
                tracing::warn!("Failed to query live clusters: {}", e);
                None
            }
        }
    }
}

/// Pair a record with its observed status. `None` means the provisioner
/// could not be queried.
fn observe(record: EnvironmentRecord, live: Option<&[String]>) -> ManagedEnvironment {
    let observed_status = match live {
        Some(live) if live.contains(&record.config.cluster_name) => EnvironmentStatus::Running,
        Some(_) => EnvironmentStatus::Stopped,
        None => EnvironmentStatus::Error,
    };
    ManagedEnvironment {
        record,
        observed_status,
    }
}
