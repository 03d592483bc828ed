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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::SshConfig;

/// One addressable remote target.
///
/// Descriptors are created by providers and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDescriptor {
    /// A plain host reached over SSH. `target` is the host-list entry as
    /// written, `[user@]host[:port]`.
    Host {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssh_config: Option<SshConfig>,
    },
    /// A Kubernetes node, reached over SSH at its resolved address.
    ClusterNode {
        target: String,
        node_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssh_config: Option<SshConfig>,
    },
    /// A cloud instance reached through the session manager.
    Instance { instance_id: String, region: String },
    /// A tenant workspace, addressed by its generated kubeconfig.
    Workspace { name: String, kubeconfig: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Host,
    ClusterNode,
    Instance,
    Workspace,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::ClusterNode => "cluster_node",
            Self::Instance => "instance",
            Self::Workspace => "workspace",
        })
    }
}

/// How a resource is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Ssh,
    SessionManager,
    KubeApi,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ssh => "ssh",
            Self::SessionManager => "session_manager",
            Self::KubeApi => "kube_api",
        })
    }
}

impl ResourceDescriptor {
    pub fn host(target: impl Into<String>) -> Self {
        Self::Host {
            target: target.into(),
            ssh_config: None,
        }
    }

    pub fn host_with_config(target: impl Into<String>, ssh_config: SshConfig) -> Self {
        Self::Host {
            target: target.into(),
            ssh_config: Some(ssh_config),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Host { .. } => ResourceKind::Host,
            Self::ClusterNode { .. } => ResourceKind::ClusterNode,
            Self::Instance { .. } => ResourceKind::Instance,
            Self::Workspace { .. } => ResourceKind::Workspace,
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Host { .. } | Self::ClusterNode { .. } => Transport::Ssh,
            Self::Instance { .. } => Transport::SessionManager,
            Self::Workspace { .. } => Transport::KubeApi,
        }
    }

    /// Host entry, address, instance id or workspace path, used as the
    /// result identifier and as the per-resource directory name.
    pub fn target(&self) -> &str {
        match self {
            Self::Host { target, .. } | Self::ClusterNode { target, .. } => target,
            Self::Instance { instance_id, .. } => instance_id,
            Self::Workspace { name, .. } => name,
        }
    }

    /// Resource-scoped SSH override, if any.
    pub fn ssh_override(&self) -> Option<&SshConfig> {
        match self {
            Self::Host { ssh_config, .. } | Self::ClusterNode { ssh_config, .. } => {
                ssh_config.as_ref()
            }
            Self::Instance { .. } | Self::Workspace { .. } => None,
        }
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.target())
    }
}
