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

//! Per-workspace kubeconfig generation.
//!
//! A workspace is served under `<server>/clusters/<workspace path>` on the
//! hub API server. Generating its kubeconfig means copying the admin
//! kubeconfig and pointing every cluster entry at that path.

use serde_yaml::Value;
use std::path::{Path, PathBuf};

use super::ClusterError;
use crate::utils::{ensure_dir, sanitize_path_segment};

/// Rewrite a server URL to address `workspace_path`.
pub fn workspace_server_url(server: &str, workspace_path: &str) -> String {
    let base = match server.find("/clusters/") {
        Some(idx) => &server[..idx],
        None => server.trim_end_matches('/'),
    };
    format!("{base}/clusters/{workspace_path}")
}

fn rewrite_servers(doc: &mut Value, workspace_path: &str) -> Result<usize, ClusterError> {
    let clusters = doc
        .get_mut("clusters")
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| ClusterError::Kubeconfig("no clusters section".to_string()))?;

    let mut rewritten = 0;
    for entry in clusters.iter_mut() {
        let Some(cluster) = entry.get_mut("cluster") else {
            continue;
        };
        let Some(server) = cluster.get("server").and_then(Value::as_str) else {
            continue;
        };
        let url = workspace_server_url(server, workspace_path);
        cluster["server"] = Value::String(url);
        rewritten += 1;
    }

    if rewritten == 0 {
        return Err(ClusterError::Kubeconfig(
            "no cluster entry carries a server URL".to_string(),
        ));
    }
    Ok(rewritten)
}

/// Write `<out_dir>/<sanitized workspace path>.kubeconfig`, derived from
/// `base`, and return its path.
pub async fn write_workspace_kubeconfig(
    base: &Path,
    workspace_path: &str,
    out_dir: &Path,
) -> Result<PathBuf, ClusterError> {
    let content = tokio::fs::read_to_string(base).await?;
    let mut doc: Value = serde_yaml::from_str(&content)
        .map_err(|e| ClusterError::Kubeconfig(format!("{}: {e}", base.display())))?;
    rewrite_servers(&mut doc, workspace_path)?;

    let rendered =
        serde_yaml::to_string(&doc).map_err(|e| ClusterError::Kubeconfig(e.to_string()))?;

    ensure_dir(out_dir).await?;
    let path = out_dir.join(format!(
        "{}.kubeconfig",
        sanitize_path_segment(workspace_path)
    ));
    tokio::fs::write(&path, rendered).await?;
    tracing::debug!("Wrote kubeconfig for workspace {workspace_path} to {path:?}");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADMIN_KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: hub
  cluster:
    server: https://hub.example.com:6443/clusters/root
contexts:
- name: admin
  context:
    cluster: hub
    user: admin
current-context: admin
users:
- name: admin
  user:
    token: secret
"#;

    #[test]
    fn test_workspace_server_url() {
        assert_eq!(
            workspace_server_url("https://hub:6443/clusters/root", "root:team-a"),
            "https://hub:6443/clusters/root:team-a"
        );
        assert_eq!(
            workspace_server_url("https://hub:6443/", "root"),
            "https://hub:6443/clusters/root"
        );
    }

    #[tokio::test]
    async fn test_write_workspace_kubeconfig() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("admin.kubeconfig");
        std::fs::write(&base, ADMIN_KUBECONFIG).unwrap();

        let out = temp.path().join(".kube");
        let path = write_workspace_kubeconfig(&base, "root:team-a", &out)
            .await
            .unwrap();
        assert_eq!(path, out.join("root_team-a.kubeconfig"));

        let doc: Value = serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            doc["clusters"][0]["cluster"]["server"].as_str(),
            Some("https://hub.example.com:6443/clusters/root:team-a")
        );
        assert_eq!(doc["users"][0]["user"]["token"].as_str(), Some("secret"));
    }

    #[tokio::test]
    async fn test_kubeconfig_without_clusters_is_rejected() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("broken");
        std::fs::write(&base, "apiVersion: v1\nkind: Config\n").unwrap();
        let err = write_workspace_kubeconfig(&base, "root", temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Kubeconfig(_)));
    }
}
