//! Ephemeral environment lifecycle for lab
//!
//! One physical `production` environment always exists. Any number of
//! ephemeral environments can be created next to it, each backed by a kind
//! cluster named `lab-<name>` and a record under the state directory.
//!
//! [`EnvironmentManager`] is constructed from an [`EnvironmentStore`] and a
//! [`ClusterProvisioner`]; tests use [`MemoryStore`] and [`FakeProvisioner`].

pub mod error;
pub mod manager;
pub mod provisioner;
pub mod record;
pub mod store;
pub mod topology;

pub use error::{Error, Result};
pub use manager::{EnvironmentManager, validate_name};
pub use provisioner::{ClusterProvisioner, ClusterSpec, FakeFailure, FakeProvisioner, KindProvisioner};
pub use record::{
    ClusterConfig, EnvironmentRecord, EnvironmentStatus, EnvironmentType, ManagedEnvironment,
    PRODUCTION, cluster_name,
};
pub use store::{EnvironmentStore, FsEnvironmentStore, MemoryStore};
pub use topology::KindCluster;
