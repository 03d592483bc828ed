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

use crate::config::{KubeConfig, SshConfig};
use crate::error::{CrashdError, Result};
use crate::kube::ClusterApi;
use crate::resource::{ResourceDescriptor, ResourceSet};

const PROVIDER: &str = "kube_nodes_provider";

/// Node selection: label selectors are passed to the API, names are
/// matched locally.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub names: Vec<String>,
    pub labels: Vec<String>,
}

/// One cluster-node resource per node with a usable address, in API order.
///
/// A failing API call yields `ProviderLookupFailed` and no partial set.
pub async fn kube_nodes(
    api: &dyn ClusterApi,
    kube: &KubeConfig,
    filter: &NodeFilter,
    ssh_override: Option<&SshConfig>,
) -> Result<ResourceSet> {
    if let Some(cfg) = ssh_override {
        cfg.validate()?;
    }

    let nodes = api
        .list_nodes(kube, &filter.labels)
        .await
        .map_err(|e| CrashdError::provider_lookup(PROVIDER, e))?;

    let mut resources = Vec::new();
    for node in nodes {
        if !filter.names.is_empty() && !filter.names.contains(&node.name) {
            continue;
        }
        let Some(address) = node.ssh_address() else {
            tracing::warn!("Node {} reports no InternalIP or ExternalIP, skipping", node.name);
            continue;
        };
        resources.push(ResourceDescriptor::ClusterNode {
            target: address.to_string(),
            node_name: node.name.clone(),
            ssh_config: ssh_override.cloned(),
        });
    }

    tracing::debug!("{PROVIDER}: resolved {} node(s)", resources.len());
    Ok(ResourceSet::new(resources))
}
