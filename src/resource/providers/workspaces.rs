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

use std::path::PathBuf;

use crate::config::KubeConfig;
use crate::error::{CrashdError, Result};
use crate::kube::{write_workspace_kubeconfig, ClusterApi};
use crate::resource::{ResourceDescriptor, ResourceSet};

const PROVIDER: &str = "workspace_provider";

pub const DEFAULT_ROOT_WORKSPACE: &str = "root";
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Clone)]
pub struct WorkspaceWalk {
    /// Path of the workspace the walk starts at, e.g. `root` or `root:org`.
    pub root: String,
    /// Deepest level visited below `root`.
    pub max_depth: usize,
    /// Where the generated kubeconfigs are written.
    pub out_dir: PathBuf,
}

/// Walk the workspace tree below `walk.root` depth-first, returning one
/// workspace resource per visited workspace (the root included), each
/// carrying its own generated kubeconfig.
pub async fn workspaces(
    api: &dyn ClusterApi,
    admin: &KubeConfig,
    walk: &WorkspaceWalk,
) -> Result<ResourceSet> {
    if walk.root.trim().is_empty() {
        return Err(CrashdError::missing_argument(PROVIDER, "root"));
    }

    let base = admin.expanded_path();
    let mut resources = Vec::new();
    let mut stack = vec![(walk.root.clone(), 0usize)];

    while let Some((path, depth)) = stack.pop() {
        let kubeconfig = write_workspace_kubeconfig(&base, &path, &walk.out_dir)
            .await
            .map_err(|e| CrashdError::provider_lookup(PROVIDER, format!("{path}: {e}")))?;

        if depth < walk.max_depth {
            let scoped = KubeConfig {
                path: kubeconfig.to_string_lossy().into_owned(),
                context: admin.context.clone(),
            };
            let children = api
                .list_child_workspaces(&scoped)
                .await
                .map_err(|e| CrashdError::provider_lookup(PROVIDER, format!("{path}: {e}")))?;
            // reversed so the stack pops children in API order
            for child in children.into_iter().rev() {
                stack.push((format!("{path}:{child}"), depth + 1));
            }
        } else {
            tracing::debug!("{PROVIDER}: max depth reached at {path}");
        }

        resources.push(ResourceDescriptor::Workspace {
            name: path,
            kubeconfig,
        });
    }

    tracing::info!("{PROVIDER}: discovered {} workspace(s)", resources.len());
    Ok(ResourceSet::new(resources))
}
