//! Typed shape of a resolved environment
//!
//! ```yaml
//! production:
//!   inherits: base
//!   cluster:
//!     domain: lab.example.com
//!     timezone: Europe/Berlin
//!     networks: { podCIDR: 10.42.0.0/16, serviceCIDR: 10.43.0.0/16, hostCIDR: 192.168.1.0/24 }
//!   hosts:
//!     - name: node1
//!       ip: 192.168.1.10
//!       k3s: { role: server, clusterInit: true }
//!   apps: { foundation: [argocd], platform: [], apps: [] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A fully resolved environment description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    /// Node this environment was layered on top of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    pub cluster: Cluster,
    pub hosts: Vec<Host>,
    pub apps: Apps,
}

/// Cluster-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub domain: String,
    pub timezone: String,
    pub networks: Networks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Networks {
    #[serde(rename = "podCIDR")]
    pub pod_cidr: String,
    #[serde(rename = "serviceCIDR")]
    pub service_cidr: String,
    #[serde(rename = "hostCIDR")]
    pub host_cidr: String,
}

/// A NixOS host taking part in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub ip: String,
    pub k3s: K3sHost,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
}

/// k3s role configuration for a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K3sHost {
    pub role: HostRole,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cluster_init: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Server,
    Agent,
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRole::Server => write!(f, "server"),
            HostRole::Agent => write!(f, "agent"),
        }
    }
}

/// Deployable units grouped by install tier, in install order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apps {
    pub foundation: Vec<String>,
    pub platform: Vec<String>,
    pub apps: Vec<String>,
}

impl Apps {
    /// All units in tier order: foundation, platform, then apps.
    pub fn in_install_order(&self) -> impl Iterator<Item = &str> {
        self.foundation
            .iter()
            .chain(&self.platform)
            .chain(&self.apps)
            .map(String::as_str)
    }
}

impl Environment {
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Hosts that run the k3s control plane.
    pub fn servers(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter().filter(|h| h.k3s.role == HostRole::Server)
    }
}
