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

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

use super::{ClusterApi, ClusterError, NodeAddress, NodeInfo, PodRef};
use crate::config::KubeConfig;

/// [`ClusterApi`] backed by the `kubectl` binary.
#[derive(Debug, Clone)]
pub struct KubectlApi {
    binary: String,
}

impl Default for KubectlApi {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
        }
    }
}

impl KubectlApi {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn kubectl(&self, kube: &KubeConfig, args: &[&str]) -> Result<String, ClusterError> {
        let kubeconfig = kube.expanded_path();
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--kubeconfig").arg(&kubeconfig);
        if let Some(context) = &kube.context {
            cmd.arg("--context").arg(context);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(
            "kubectl --kubeconfig {} {}",
            kubeconfig.display(),
            args.join(" ")
        );
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(ClusterError::Command {
                command: args.first().copied().unwrap_or_default().to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct NodeItem {
    metadata: Metadata,
    #[serde(default)]
    status: Option<NodeStatus>,
}

#[derive(Deserialize)]
struct NodeStatus {
    #[serde(default)]
    addresses: Vec<AddressItem>,
}

#[derive(Deserialize)]
struct AddressItem {
    #[serde(rename = "type")]
    kind: String,
    address: String,
}

#[derive(Deserialize)]
struct NamedItem {
    metadata: Metadata,
}

#[derive(Deserialize)]
struct PodItem {
    metadata: Metadata,
    #[serde(default)]
    spec: Option<PodSpec>,
}

#[derive(Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<ContainerItem>,
}

#[derive(Deserialize)]
struct ContainerItem {
    name: String,
}

fn parse_nodes(json: &str) -> Result<Vec<NodeInfo>, ClusterError> {
    let list: List<NodeItem> = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| NodeInfo {
            name: item.metadata.name,
            addresses: item
                .status
                .map(|s| s.addresses)
                .unwrap_or_default()
                .into_iter()
                .map(|a| NodeAddress {
                    kind: a.kind,
                    address: a.address,
                })
                .collect(),
        })
        .collect())
}

fn parse_pods(json: &str) -> Result<Vec<PodRef>, ClusterError> {
    let list: List<PodItem> = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| PodRef {
            namespace: item
                .metadata
                .namespace
                .unwrap_or_else(|| "default".to_string()),
            name: item.metadata.name,
            containers: item
                .spec
                .map(|s| s.containers.into_iter().map(|c| c.name).collect())
                .unwrap_or_default(),
        })
        .collect())
}

#[async_trait]
impl ClusterApi for KubectlApi {
    async fn list_nodes(
        &self,
        kube: &KubeConfig,
        labels: &[String],
    ) -> Result<Vec<NodeInfo>, ClusterError> {
        let selector = labels.join(",");
        let mut args = vec!["get", "nodes", "-o", "json"];
        if !selector.is_empty() {
            args.push("-l");
            args.push(&selector);
        }
        let out = self.kubectl(kube, &args).await?;
        parse_nodes(&out)
    }

    async fn list_child_workspaces(&self, kube: &KubeConfig) -> Result<Vec<String>, ClusterError> {
        let out = self
            .kubectl(kube, &["get", "workspaces", "-o", "json"])
            .await?;
        let list: List<NamedItem> = serde_json::from_str(&out)?;
        Ok(list.items.into_iter().map(|i| i.metadata.name).collect())
    }

    async fn get_objects(
        &self,
        kube: &KubeConfig,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError> {
        let mut args = vec!["get", kind, "-o", "yaml"];
        match namespace {
            Some(ns) => {
                args.push("-n");
                args.push(ns);
            }
            None => args.push("--all-namespaces"),
        }
        self.kubectl(kube, &args).await
    }

    async fn list_pods(
        &self,
        kube: &KubeConfig,
        namespace: Option<&str>,
    ) -> Result<Vec<PodRef>, ClusterError> {
        let mut args = vec!["get", "pods", "-o", "json"];
        match namespace {
            Some(ns) => {
                args.push("-n");
                args.push(ns);
            }
            None => args.push("--all-namespaces"),
        }
        let out = self.kubectl(kube, &args).await?;
        parse_pods(&out)
    }

    async fn pod_logs(
        &self,
        kube: &KubeConfig,
        pod: &PodRef,
        container: &str,
    ) -> Result<String, ClusterError> {
        self.kubectl(
            kube,
            &["logs", "-n", &pod.namespace, &pod.name, "-c", container],
        )
        .await
    }
}
