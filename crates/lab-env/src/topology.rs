//! kind cluster topology generation
//!
//! Every ephemeral cluster has one control-plane node labelled
//! `ingress-ready=true` with host ports 80 and 443 mapped, so an ingress
//! controller is reachable from the host, followed by the requested workers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const KIND_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

const INGRESS_READY_PATCH: &str = "kind: InitConfiguration
nodeRegistration:
  kubeletExtraArgs:
    node-labels: \"ingress-ready=true\"
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindNode {
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMapping>,
}

/// A kind `Cluster` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCluster {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    pub nodes: Vec<KindNode>,
}

impl KindCluster {
    /// Topology for `cluster_name` with `workers` worker nodes; negative
    /// counts are treated as zero.
    pub fn new(cluster_name: &str, workers: i32) -> Self {
        let control_plane = KindNode {
            role: NodeRole::ControlPlane,
            kubeadm_config_patches: vec![INGRESS_READY_PATCH.to_string()],
            extra_port_mappings: [80, 443]
                .into_iter()
                .map(|port| PortMapping {
                    container_port: port,
                    host_port: port,
                    protocol: "TCP".to_string(),
                })
                .collect(),
        };
        let worker = KindNode {
            role: NodeRole::Worker,
            kubeadm_config_patches: Vec::new(),
            extra_port_mappings: Vec::new(),
        };

        let mut nodes = vec![control_plane];
        nodes.extend(std::iter::repeat_n(worker, clamp_workers(workers) as usize));

        Self {
            kind: "Cluster".to_string(),
            api_version: KIND_API_VERSION.to_string(),
            name: cluster_name.to_string(),
            nodes,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.role == NodeRole::Worker).count()
    }

    /// Render as the YAML file handed to `kind create cluster --config`.
    pub fn render(&self) -> Result<String> {
        let body = serde_yaml::to_string(self).map_err(|e| Error::Topology {
            name: self.name.clone(),
            message: e.to_string(),
        })?;
        Ok(format!(
            "# kind cluster topology for {}\n# Generated by lab; recreated on every `lab env create`\n{body}",
            self.name
        ))
    }
}

/// Worker count as persisted: negative requests become zero.
pub fn clamp_workers(workers: i32) -> u32 {
    workers.max(0).unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_control_plane_maps_ingress_ports() {
        let topology = KindCluster::new("lab-staging", 0);
        assert_eq!(topology.nodes.len(), 1);

        let cp = &topology.nodes[0];
        assert_eq!(cp.role, NodeRole::ControlPlane);
        let ports: Vec<_> = cp.extra_port_mappings.iter().map(|m| m.host_port).collect();
        assert_eq!(ports, vec![80, 443]);
        assert!(cp.kubeadm_config_patches[0].contains("ingress-ready=true"));
    }

    #[test]
    fn test_render_is_a_kind_cluster_document() {
        let yaml = KindCluster::new("lab-staging", 2).render().unwrap();
        assert!(yaml.starts_with("# kind cluster topology for lab-staging\n"));

        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc["kind"], "Cluster");
        assert_eq!(doc["apiVersion"], KIND_API_VERSION);
        assert_eq!(doc["nodes"][0]["role"], "control-plane");
        assert_eq!(doc["nodes"][2]["role"], "worker");
    }

    proptest! {
        #[test]
        fn exactly_one_control_plane_and_clamped_workers(workers in -64i32..64) {
            let yaml = KindCluster::new("lab-prop", workers).render().unwrap();
            let parsed: KindCluster = serde_yaml::from_str(&yaml).unwrap();

            let control_planes = parsed
                .nodes
                .iter()
                .filter(|n| n.role == NodeRole::ControlPlane)
                .count();
            prop_assert_eq!(control_planes, 1);
            prop_assert_eq!(parsed.worker_count(), workers.max(0) as usize);
        }
    }
}
