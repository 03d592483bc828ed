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

mod common;

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use common::{context, runtime, FakeCluster, LocalTransport};
use crashd::builtins::{BuiltinRegistry, Runtime};
use crashd::config::{ExecutionContext, KubeConfig};
use crashd::kube::PodRef;
use crashd::resource::providers::{kube_nodes, workspaces, NodeFilter, WorkspaceWalk};
use crashd::{CrashdError, ResourceDescriptor};

const HUB_KUBECONFIG: &str = r#"apiVersion: v1
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

async fn try_call(
    name: &str,
    args: Value,
    ctx: &mut ExecutionContext,
    rt: &Runtime,
) -> crashd::Result<Value> {
    BuiltinRegistry::standard().call(name, args, ctx, rt).await
}

fn write_hub_kubeconfig(dir: &Path) -> String {
    let path = dir.join("hub.kubeconfig");
    std::fs::write(&path, HUB_KUBECONFIG).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_host_list_empty_is_missing_argument() {
    let temp = TempDir::new().unwrap();
    let rt = runtime(Arc::new(LocalTransport::new()), Arc::new(FakeCluster::default()));
    let mut ctx = context(temp.path(), "ops", &rt).await;

    let err = try_call("host_list_provider", json!({"hosts": []}), &mut ctx, &rt)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CrashdError::MissingArgument { ref argument, .. } if argument == "hosts"
    ));
    assert!(ctx.resources().is_none());
}

#[tokio::test]
async fn test_kube_nodes_unreachable_cluster_is_lookup_failure() {
    let cluster = FakeCluster {
        unreachable: true,
        ..FakeCluster::with_nodes(&[("n1", "10.0.0.1")])
    };
    let err = kube_nodes(&cluster, &KubeConfig::default(), &NodeFilter::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CrashdError::ProviderLookupFailed { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_kube_nodes_filters_by_name() {
    let cluster = FakeCluster::with_nodes(&[
        ("worker-1", "10.0.0.1"),
        ("worker-2", "10.0.0.2"),
        ("worker-3", "10.0.0.3"),
    ]);
    let filter = NodeFilter {
        names: vec!["worker-3".to_string(), "worker-1".to_string()],
        labels: Vec::new(),
    };
    let set = kube_nodes(&cluster, &KubeConfig::default(), &filter, None)
        .await
        .unwrap();
    let targets: Vec<&str> = set.iter().map(|r| r.target()).collect();
    assert_eq!(targets, vec!["10.0.0.1", "10.0.0.3"]);
    assert!(matches!(
        set.as_slice()[0],
        ResourceDescriptor::ClusterNode { ref node_name, .. } if node_name == "worker-1"
    ));
}

#[tokio::test]
async fn test_kube_nodes_then_run() {
    let temp = TempDir::new().unwrap();
    let cluster = Arc::new(FakeCluster::with_nodes(&[
        ("worker-1", "127.0.0.1"),
        ("worker-2", "localhost"),
    ]));
    let rt = runtime(Arc::new(LocalTransport::new()), cluster);
    let mut ctx = context(temp.path(), "ops", &rt).await;

    let nodes = try_call("kube_nodes_provider", json!({}), &mut ctx, &rt)
        .await
        .unwrap();
    assert!(ctx.resources().is_none(), "providers never persist");

    let ran = try_call(
        "run",
        json!({"cmd": "echo node", "resources": nodes}),
        &mut ctx,
        &rt,
    )
    .await
    .unwrap();
    assert_eq!(ran[0]["resource"], "127.0.0.1");
    assert_eq!(ran[1]["result"], "node\n");
}

#[tokio::test]
async fn test_workspace_walk_is_depth_first_and_bounded() {
    let temp = TempDir::new().unwrap();
    let admin = KubeConfig {
        path: write_hub_kubeconfig(temp.path()),
        context: Some("admin".to_string()),
    };
    let cluster = FakeCluster {
        children: HashMap::from([
            ("root".to_string(), vec!["org-a".to_string(), "org-b".to_string()]),
            ("root_org-a".to_string(), vec!["team-1".to_string()]),
            ("root_org-a_team-1".to_string(), vec!["deep".to_string()]),
        ]),
        ..FakeCluster::default()
    };
    let walk = WorkspaceWalk {
        root: "root".to_string(),
        max_depth: 2,
        out_dir: temp.path().join(".kube"),
    };

    let set = workspaces(&cluster, &admin, &walk).await.unwrap();
    let names: Vec<&str> = set.iter().map(|r| r.target()).collect();
    assert_eq!(
        names,
        vec!["root", "root:org-a", "root:org-a:team-1", "root:org-b"]
    );

    let team = &set.as_slice()[2];
    let ResourceDescriptor::Workspace { kubeconfig, .. } = team else {
        panic!("expected a workspace resource, got {team:?}");
    };
    let rendered = std::fs::read_to_string(kubeconfig).unwrap();
    assert!(rendered.contains("https://hub.example.com:6443/clusters/root:org-a:team-1"));
}

#[tokio::test]
async fn test_workspace_provider_then_kube_capture() {
    let temp = TempDir::new().unwrap();
    let workdir = temp.path().join("work");
    let cluster = Arc::new(FakeCluster {
        children: HashMap::from([("root".to_string(), vec!["team".to_string()])]),
        pods: vec![PodRef {
            namespace: "default".to_string(),
            name: "api-0".to_string(),
            containers: vec!["app".to_string(), "broken".to_string()],
        }],
        ..FakeCluster::default()
    });
    let rt = runtime(Arc::new(LocalTransport::new()), cluster);
    let mut ctx = context(&workdir, "ops", &rt).await;
    try_call(
        "kube_config",
        json!({"path": write_hub_kubeconfig(temp.path())}),
        &mut ctx,
        &rt,
    )
    .await
    .unwrap();

    let spaces = try_call("workspace_provider", json!({}), &mut ctx, &rt)
        .await
        .unwrap();
    assert_eq!(spaces.as_array().unwrap().len(), 2);
    assert!(workdir.join(".kube/root_team.kubeconfig").is_file());

    let written = try_call(
        "kube_capture",
        json!({"what": "logs", "resources": spaces}),
        &mut ctx,
        &rt,
    )
    .await
    .unwrap();
    let written: Vec<&str> = written
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    // the broken container is skipped in each workspace
    assert_eq!(written.len(), 2);
    let log = workdir.join("kube/root_team/logs/default/api-0/app.log");
    let log_path = log.to_string_lossy().into_owned();
    assert!(written.contains(&log_path.as_str()));
    assert_eq!(std::fs::read_to_string(log).unwrap(), "api-0 app log line\n");
}

#[tokio::test]
async fn test_kube_capture_objects_and_failure() {
    let temp = TempDir::new().unwrap();
    let rt = runtime(
        Arc::new(LocalTransport::new()),
        Arc::new(FakeCluster::default()),
    );
    let mut ctx = context(temp.path(), "ops", &rt).await;

    let written = try_call(
        "kube_capture",
        json!({"kinds": ["pods", "events"], "namespaces": "kube-system"}),
        &mut ctx,
        &rt,
    )
    .await
    .unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);
    let pods = temp.path().join("kube/objects/kube-system/pods.yaml");
    assert_eq!(
        std::fs::read_to_string(pods).unwrap(),
        "kind: pods\nnamespace: kube-system\n"
    );

    let failing = runtime(
        Arc::new(LocalTransport::new()),
        Arc::new(FakeCluster {
            unreachable: true,
            ..FakeCluster::default()
        }),
    );
    let err = try_call("kube_capture", json!({}), &mut ctx, &failing)
        .await
        .unwrap_err();
    assert!(matches!(err, CrashdError::ProviderLookupFailed { .. }));

    let err = try_call("kube_capture", json!({"what": "secrets"}), &mut ctx, &rt)
        .await
        .unwrap_err();
    assert!(matches!(err, CrashdError::InvalidArgument { .. }));
}
