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

//! Kubernetes object dumps and pod logs written under a local directory.
//!
//! Layout:
//! - objects: `<out>/<namespace|all-namespaces>/<kind>.yaml`
//! - logs: `<out>/<namespace>/<pod>/<container>.log`

use std::path::{Path, PathBuf};

use super::{ClusterApi, ClusterError};
use crate::config::KubeConfig;
use crate::utils::{ensure_dir, sanitize_path_segment};

pub const DEFAULT_OBJECT_KINDS: &[&str] = &[
    "nodes",
    "namespaces",
    "pods",
    "services",
    "deployments",
    "replicasets",
    "events",
];

const ALL_NAMESPACES_DIR: &str = "all-namespaces";

#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    /// Object kinds to dump; empty means [`DEFAULT_OBJECT_KINDS`].
    pub kinds: Vec<String>,
    /// Namespaces to search; empty means all namespaces.
    pub namespaces: Vec<String>,
}

impl CaptureRequest {
    fn kinds(&self) -> Vec<String> {
        if self.kinds.is_empty() {
            DEFAULT_OBJECT_KINDS.iter().map(|k| k.to_string()).collect()
        } else {
            self.kinds.clone()
        }
    }

    fn namespaces(&self) -> Vec<Option<&str>> {
        if self.namespaces.is_empty() {
            vec![None]
        } else {
            self.namespaces.iter().map(|ns| Some(ns.as_str())).collect()
        }
    }
}

pub async fn capture_objects(
    api: &dyn ClusterApi,
    kube: &KubeConfig,
    request: &CaptureRequest,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ClusterError> {
    let mut written = Vec::new();
    for namespace in request.namespaces() {
        let dir = out_dir.join(sanitize_path_segment(
            namespace.unwrap_or(ALL_NAMESPACES_DIR),
        ));
        ensure_dir(&dir).await?;

        for kind in request.kinds() {
            let dump = api.get_objects(kube, &kind, namespace).await?;
            let path = dir.join(format!("{}.yaml", sanitize_path_segment(&kind)));
            tokio::fs::write(&path, dump).await?;
            written.push(path);
        }
    }
    tracing::info!("Captured {} object dumps under {:?}", written.len(), out_dir);
    Ok(written)
}

/// Write the logs of every container of every pod in the requested
/// namespaces. A container whose logs cannot be fetched is skipped with a
/// warning; failing to list pods is an error.
pub async fn capture_logs(
    api: &dyn ClusterApi,
    kube: &KubeConfig,
    request: &CaptureRequest,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ClusterError> {
    let mut written = Vec::new();
    for namespace in request.namespaces() {
        for pod in api.list_pods(kube, namespace).await? {
            let pod_dir = out_dir
                .join(sanitize_path_segment(&pod.namespace))
                .join(sanitize_path_segment(&pod.name));
            ensure_dir(&pod_dir).await?;

            for container in &pod.containers {
                match api.pod_logs(kube, &pod, container).await {
                    Ok(logs) => {
                        let path = pod_dir.join(format!("{}.log", sanitize_path_segment(container)));
                        tokio::fs::write(&path, logs).await?;
                        written.push(path);
                    }
                    Err(e) => tracing::warn!(
                        "Skipping logs of {}/{} container {}: {}",
                        pod.namespace,
                        pod.name,
                        container,
                        e
                    ),
                }
            }
        }
    }
    tracing::info!("Captured {} container logs under {:?}", written.len(), out_dir);
    Ok(written)
}
