//! Environment record persistence
//!
//! ```text
//! <state>/env/
//!   staging/
//!     state.json        EnvironmentRecord
//!     kind-config.yaml  KindCluster topology
//!     kubeconfig        written by the provisioner
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lab_fs::{ConfigStore, LabFile, io};
use parking_lot::Mutex;

use crate::error::Result;
use crate::record::EnvironmentRecord;

/// Durable storage for environment records, one directory per environment.
pub trait EnvironmentStore: Send + Sync {
    /// Load a record. A missing record is `Ok(None)`; an unreadable one is an error.
    fn load(&self, name: &str) -> Result<Option<EnvironmentRecord>>;

    fn save(&self, record: &EnvironmentRecord) -> Result<()>;

    /// Remove everything stored for `name`. Removing an unknown name succeeds.
    fn remove(&self, name: &str) -> Result<()>;

    /// Names that have a directory in the store, sorted. Their records may
    /// still fail to load.
    fn names(&self) -> Result<Vec<String>>;

    fn exists(&self, name: &str) -> bool;

    /// Directory holding everything for `name`.
    fn environment_dir(&self, name: &str) -> PathBuf;

    fn kubeconfig_path(&self, name: &str) -> PathBuf {
        self.environment_dir(name).join(LabFile::Kubeconfig)
    }

    fn topology_path(&self, name: &str) -> PathBuf {
        self.environment_dir(name).join(LabFile::ClusterTopology)
    }

    fn write_topology(&self, name: &str, content: &str) -> Result<()>;
}

/// File-backed store under a state directory such as `~/.local/state/lab/env`.
#[derive(Debug, Clone)]
pub struct FsEnvironmentStore {
    root: PathBuf,
    documents: ConfigStore,
}

impl FsEnvironmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: ConfigStore::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self, name: &str) -> PathBuf {
        self.environment_dir(name).join(LabFile::StateFile)
    }
}

impl EnvironmentStore for FsEnvironmentStore {
    fn load(&self, name: &str) -> Result<Option<EnvironmentRecord>> {
        let path = self.state_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(self.documents.load(&path)?))
    }

    fn save(&self, record: &EnvironmentRecord) -> Result<()> {
        io::ensure_private_dir(&self.environment_dir(&record.name))?;
        self.documents.save(&self.state_path(&record.name), record)?;
        tracing::debug!(name = %record.name, status = %record.status, "Saved environment record");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        if io::remove_dir_if_exists(&self.environment_dir(name))? {
            tracing::debug!(name, "Removed environment state directory");
        }
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(lab_fs::Error::io(&self.root, e).into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| lab_fs::Error::io(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> bool {
        self.state_path(name).is_file()
    }

    fn environment_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_topology(&self, name: &str, content: &str) -> Result<()> {
        io::write_text(&self.topology_path(name), content)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<String, EnvironmentRecord>,
    topologies: BTreeMap<String, String>,
}

/// In-memory store for tests. Paths point under a root that is never touched.
#[derive(Debug)]
pub struct MemoryStore {
    root: PathBuf,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/memory/lab/env"),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// The last topology written for `name`.
    pub fn topology(&self, name: &str) -> Option<String> {
        self.state.lock().topologies.get(name).cloned()
    }
}

impl EnvironmentStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<EnvironmentRecord>> {
        Ok(self.state.lock().records.get(name).cloned())
    }

    fn save(&self, record: &EnvironmentRecord) -> Result<()> {
        self.state
            .lock()
            .records
            .insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.records.remove(name);
        state.topologies.remove(name);
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().records.keys().cloned().collect())
    }

    fn exists(&self, name: &str) -> bool {
        self.state.lock().records.contains_key(name)
    }

    fn environment_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_topology(&self, name: &str, content: &str) -> Result<()> {
        self.state
            .lock()
            .topologies
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}
