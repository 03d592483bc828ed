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

//! Local stand-ins for the SSH, session-manager and cluster collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crashd::builtins::{BuiltinRegistry, Runtime};
use crashd::config::{ExecutionContext, KubeConfig};
use crashd::kube::{ClusterApi, ClusterError, NodeAddress, NodeInfo, PodRef};
use crashd::ssh::client::mirrored_local_path;
use crashd::ssh::{ConnectArgs, KeyAgent, OutputStream, SshTransport, TransportError};
use crashd::ssm::InstanceTransport;

/// Runs commands with the local `sh -c` for every reachable host.
#[derive(Default)]
pub struct LocalTransport {
    unreachable: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<ConnectArgs>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_string());
        self
    }

    pub fn delay(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    /// Connection arguments of every call, in call order.
    pub fn calls(&self) -> Vec<ConnectArgs> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn connect(&self, args: &ConnectArgs) -> Result<InFlight<'_>, TransportError> {
        self.calls.lock().unwrap().push(args.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delays.get(&args.host) {
            tokio::time::sleep(*delay).await;
        }
        if self.unreachable.contains(&args.host) {
            return Err(TransportError::Connect {
                host: args.host.clone(),
                port: args.port,
                reason: "Connection refused".to_string(),
            });
        }
        Ok(guard)
    }

    async fn shell(cmd: &str) -> Result<std::process::Output, TransportError> {
        Ok(tokio::process::Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .await?)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SshTransport for LocalTransport {
    async fn run(
        &self,
        args: &ConnectArgs,
        _agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<String, TransportError> {
        let _guard = self.connect(args).await?;
        let output = Self::shell(cmd).await?;
        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                exit_status: output.status.code().unwrap_or(1) as u32,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_to_stream(
        &self,
        args: &ConnectArgs,
        _agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<OutputStream, TransportError> {
        let _guard = self.connect(args).await?;
        let output = Self::shell(cmd).await?;
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(Box::new(Cursor::new(combined)))
    }

    async fn copy_from(
        &self,
        args: &ConnectArgs,
        _agent: Option<&KeyAgent>,
        dest_dir: &Path,
        src_pattern: &str,
    ) -> Result<(), TransportError> {
        let _guard = self.connect(args).await?;
        let matches: Vec<_> = glob::glob(src_pattern)
            .map_err(|e| TransportError::Process(e.to_string()))?
            .filter_map(Result::ok)
            .collect();
        if matches.is_empty() {
            return Err(TransportError::Process(format!("no match for {src_pattern}")));
        }
        for src in matches {
            let local = mirrored_local_path(dest_dir, &src.to_string_lossy());
            if let Some(parent) = local.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&src, &local)?;
        }
        Ok(())
    }

    async fn copy_to(
        &self,
        args: &ConnectArgs,
        _agent: Option<&KeyAgent>,
        src_path: &Path,
        dest_path: &str,
    ) -> Result<(), TransportError> {
        let _guard = self.connect(args).await?;
        let dest = Path::new(dest_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src_path, dest)?;
        Ok(())
    }
}

/// Session-manager stand-in that echoes the instance and command.
#[derive(Default)]
pub struct EchoInstances;

#[async_trait]
impl InstanceTransport for EchoInstances {
    async fn run(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<String, TransportError> {
        Ok(format!("{instance_id}@{region}: {cmd}\n"))
    }

    async fn run_to_stream(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<OutputStream, TransportError> {
        let text = self.run(instance_id, region, cmd).await?;
        Ok(Box::new(Cursor::new(text.into_bytes())))
    }
}

/// In-memory cluster. Child workspaces are keyed by the generated
/// kubeconfig's file stem (`root_team-a` for `root:team-a`).
#[derive(Default)]
pub struct FakeCluster {
    pub nodes: Vec<NodeInfo>,
    pub children: HashMap<String, Vec<String>>,
    pub unreachable: bool,
    pub pods: Vec<PodRef>,
}

impl FakeCluster {
    pub fn with_nodes(nodes: &[(&str, &str)]) -> Self {
        Self {
            nodes: nodes
                .iter()
                .map(|(name, ip)| NodeInfo {
                    name: name.to_string(),
                    addresses: vec![NodeAddress {
                        kind: "InternalIP".to_string(),
                        address: ip.to_string(),
                    }],
                })
                .collect(),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), ClusterError> {
        if self.unreachable {
            return Err(ClusterError::Command {
                command: "get nodes".to_string(),
                status: 1,
                stderr: "Unable to connect to the server".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_nodes(
        &self,
        _kube: &KubeConfig,
        _labels: &[String],
    ) -> Result<Vec<NodeInfo>, ClusterError> {
        self.check()?;
        Ok(self.nodes.clone())
    }

    async fn list_child_workspaces(&self, kube: &KubeConfig) -> Result<Vec<String>, ClusterError> {
        self.check()?;
        let stem = Path::new(&kube.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.children.get(&stem).cloned().unwrap_or_default())
    }

    async fn get_objects(
        &self,
        _kube: &KubeConfig,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError> {
        self.check()?;
        Ok(format!(
            "kind: {kind}\nnamespace: {}\n",
            namespace.unwrap_or("all")
        ))
    }

    async fn list_pods(
        &self,
        _kube: &KubeConfig,
        _namespace: Option<&str>,
    ) -> Result<Vec<PodRef>, ClusterError> {
        self.check()?;
        Ok(self.pods.clone())
    }

    async fn pod_logs(
        &self,
        _kube: &KubeConfig,
        pod: &PodRef,
        container: &str,
    ) -> Result<String, ClusterError> {
        if container == "broken" {
            return Err(ClusterError::Command {
                command: format!("logs {}", pod.name),
                status: 1,
                stderr: "container not found".to_string(),
            });
        }
        Ok(format!("{} {} log line\n", pod.name, container))
    }
}

/// Runtime over the local stand-ins.
pub fn runtime(ssh: Arc<LocalTransport>, cluster: Arc<FakeCluster>) -> Runtime {
    Runtime::new(ssh, Arc::new(EchoInstances), cluster)
}

/// Context whose work directory lives below `workdir`, with `username`
/// as the declared SSH user.
pub async fn context(workdir: &Path, username: &str, rt: &Runtime) -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    let registry = BuiltinRegistry::standard();
    registry
        .call(
            "crashd_config",
            serde_json::json!({"workdir": workdir.to_string_lossy()}),
            &mut ctx,
            rt,
        )
        .await
        .unwrap();
    registry
        .call(
            "ssh_config",
            serde_json::json!({"username": username}),
            &mut ctx,
            rt,
        )
        .await
        .unwrap();
    ctx
}
