// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cluster API collaborator.
//!
//! The engine only needs a handful of read operations from a Kubernetes
//! cluster: node addresses, child workspaces, object dumps and pod logs.
//! [`ClusterApi`] is the seam; [`KubectlApi`] implements it by shelling out
//! to `kubectl` with JSON output.

pub mod capture;
mod kubectl;
pub mod workspace;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::KubeConfig;

pub use capture::{capture_logs, capture_objects, CaptureRequest};
pub use kubectl::KubectlApi;
pub use workspace::write_workspace_kubeconfig;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to invoke kubectl: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("kubectl {command} exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to decode cluster response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(String),
}

/// Address type reported in a node's status, e.g. `InternalIP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub kind: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub addresses: Vec<NodeAddress>,
}

impl NodeInfo {
    /// Preferred SSH address: `InternalIP`, then `ExternalIP`.
    pub fn ssh_address(&self) -> Option<&str> {
        ["InternalIP", "ExternalIP"].iter().find_map(|wanted| {
            self.addresses
                .iter()
                .find(|a| a.kind == *wanted && !a.address.is_empty())
                .map(|a| a.address.as_str())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub containers: Vec<String>,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List nodes, optionally restricted by label selectors (`key=value`).
    async fn list_nodes(
        &self,
        kube: &KubeConfig,
        labels: &[String],
    ) -> Result<Vec<NodeInfo>, ClusterError>;

    /// Names of the workspaces directly below the one `kube` points at.
    async fn list_child_workspaces(&self, kube: &KubeConfig) -> Result<Vec<String>, ClusterError>;

    /// Dump all objects of `kind` as YAML text.
    async fn get_objects(
        &self,
        kube: &KubeConfig,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError>;

    async fn list_pods(
        &self,
        kube: &KubeConfig,
        namespace: Option<&str>,
    ) -> Result<Vec<PodRef>, ClusterError>;

    async fn pod_logs(
        &self,
        kube: &KubeConfig,
        pod: &PodRef,
        container: &str,
    ) -> Result<String, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(kind: &str, address: &str) -> NodeAddress {
        NodeAddress {
            kind: kind.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn test_ssh_address_prefers_internal() {
        let node = NodeInfo {
            name: "worker-0".to_string(),
            addresses: vec![
                address("Hostname", "worker-0"),
                address("ExternalIP", "34.1.2.3"),
                address("InternalIP", "10.0.0.4"),
            ],
        };
        assert_eq!(node.ssh_address(), Some("10.0.0.4"));
    }

    #[test]
    fn test_ssh_address_falls_back_to_external() {
        let node = NodeInfo {
            name: "edge".to_string(),
            addresses: vec![address("ExternalIP", "34.1.2.3")],
        };
        assert_eq!(node.ssh_address(), Some("34.1.2.3"));

        let unreachable = NodeInfo {
            name: "ghost".to_string(),
            addresses: vec![address("Hostname", "ghost")],
        };
        assert_eq!(unreachable.ssh_address(), None);
    }
}
