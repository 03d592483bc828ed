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

//! Per-resource operations and how each resource kind is dispatched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::config::{ContextSnapshot, SshConfig};
use crate::error::{CrashdError, Result};
use crate::resource::{HostSpec, ResourceDescriptor};
use crate::ssh::client::mirrored_local_path;
use crate::ssh::{build_connect_args, ConnectArgs, KeyAgent, OutputStream, SshTransport};
use crate::ssm::InstanceTransport;
use crate::utils::{command_file_name, ensure_dir, is_glob_pattern, sanitize_path_segment};

/// The logical operation fanned out to every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Run a command and return its output.
    Run { cmd: String },
    /// Run a command and write its output to a file in the resource's
    /// directory.
    Capture {
        cmd: String,
        file_name: Option<String>,
        desc: Option<String>,
    },
    /// Copy a local file, directory or glob to the resource.
    CopyTo { source: PathBuf, target: String },
    /// Copy a remote file, directory or glob into the resource's directory.
    CopyFrom { path: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::Capture { .. } => "capture",
            Self::CopyTo { .. } => "copy_to",
            Self::CopyFrom { .. } => "copy_from",
        }
    }

    /// Whether the operation writes below the work directory.
    pub fn writes_locally(&self) -> bool {
        matches!(self, Self::Capture { .. } | Self::CopyFrom { .. })
    }

    fn supports_session_manager(&self) -> bool {
        matches!(self, Self::Run { .. } | Self::Capture { .. })
    }
}

/// How one resource will be reached, decided before any dispatch starts.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    Ssh(ConnectArgs),
    SessionManager { instance_id: String, region: String },
    Unsupported(String),
}

/// Resolve the plan for `resource`.
///
/// Connection config precedence: explicit call argument, then the
/// resource's own override, then the context default, then the hard-coded
/// default. An SSH target written as `[user@]host[:port]` is merged field
/// by field over that config: its port always applies, its user unless the
/// call passed an explicit config. Credential and jump-proxy errors are
/// returned as fatal errors.
pub(crate) fn plan(
    operation: &Operation,
    resource: &ResourceDescriptor,
    snapshot: &ContextSnapshot,
    explicit: Option<&SshConfig>,
) -> Result<Plan> {
    let unsupported = || -> Result<Plan> {
        let err = CrashdError::UnsupportedResourceKind {
            kind: resource.kind().to_string(),
            operation: operation.name().to_string(),
        };
        tracing::warn!("Skipping {}: {}", resource, err);
        Ok(Plan::Unsupported(err.to_string()))
    };

    match resource {
        ResourceDescriptor::Host { target, .. } | ResourceDescriptor::ClusterNode { target, .. } => {
            let entry = HostSpec::parse(target).map_err(|reason| {
                CrashdError::invalid_argument(operation.name(), "resources", reason)
            })?;
            let cfg = match explicit {
                Some(explicit) => SshConfig {
                    port: entry.port.unwrap_or(explicit.port),
                    ..explicit.clone()
                },
                None => entry.apply_to(
                    &resource
                        .ssh_override()
                        .or(snapshot.ssh.as_ref())
                        .cloned()
                        .unwrap_or_default(),
                ),
            };
            let args = build_connect_args(&cfg, snapshot.ssh.as_ref(), &entry.host)?;
            Ok(Plan::Ssh(args))
        }
        ResourceDescriptor::Instance {
            instance_id,
            region,
        } => {
            if operation.supports_session_manager() {
                Ok(Plan::SessionManager {
                    instance_id: instance_id.clone(),
                    region: region.clone(),
                })
            } else {
                unsupported()
            }
        }
        ResourceDescriptor::Workspace { .. } => unsupported(),
    }
}

/// Shared, read-only state handed to every dispatch task.
#[derive(Clone)]
pub(crate) struct DispatchEnv {
    pub ssh: Arc<dyn SshTransport>,
    pub instances: Arc<dyn InstanceTransport>,
    pub agent: Option<Arc<KeyAgent>>,
    pub workdir: PathBuf,
}

/// Per-resource output directory: `<workdir>/<sanitized target>`.
pub fn resource_dir(workdir: &Path, target: &str) -> PathBuf {
    workdir.join(sanitize_path_segment(target))
}

/// Run `operation` against one planned resource and return its payload.
pub(crate) async fn dispatch(
    operation: &Operation,
    target: &str,
    plan: &Plan,
    env: &DispatchEnv,
) -> Result<String> {
    let fail = |e: &dyn std::fmt::Display| CrashdError::dispatch(target, e.to_string());
    let agent = env.agent.as_deref();

    match (operation, plan) {
        (_, Plan::Unsupported(reason)) => Err(CrashdError::dispatch(target, reason)),

        (Operation::Run { cmd }, Plan::Ssh(args)) => {
            env.ssh.run(args, agent, cmd).await.map_err(|e| fail(&e))
        }
        (
            Operation::Run { cmd },
            Plan::SessionManager {
                instance_id,
                region,
            },
        ) => env
            .instances
            .run(instance_id, region, cmd)
            .await
            .map_err(|e| fail(&e)),

        (
            Operation::Capture {
                cmd,
                file_name,
                desc,
            },
            plan,
        ) => {
            let dir = resource_dir(&env.workdir, target);
            ensure_dir(&dir).await.map_err(|e| fail(&e))?;
            let file_name = match file_name {
                Some(name) => sanitize_path_segment(name),
                None => command_file_name(cmd),
            };
            let path = dir.join(file_name);

            let stream = match plan {
                Plan::Ssh(args) => env.ssh.run_to_stream(args, agent, cmd).await,
                Plan::SessionManager {
                    instance_id,
                    region,
                } => env.instances.run_to_stream(instance_id, region, cmd).await,
                Plan::Unsupported(reason) => return Err(CrashdError::dispatch(target, reason)),
            }
            .map_err(|e| fail(&e))?;

            write_capture(&path, desc.as_deref(), stream)
                .await
                .map_err(|e| fail(&e))?;
            Ok(path.display().to_string())
        }

        (Operation::CopyTo { source, target: dest }, Plan::Ssh(args)) => {
            env.ssh
                .copy_to(args, agent, source, dest)
                .await
                .map_err(|e| fail(&e))?;
            Ok(dest.clone())
        }

        (Operation::CopyFrom { path }, Plan::Ssh(args)) => {
            let dir = resource_dir(&env.workdir, target);
            ensure_dir(&dir).await.map_err(|e| fail(&e))?;
            env.ssh
                .copy_from(args, agent, &dir, path)
                .await
                .map_err(|e| fail(&e))?;
            let local = if is_glob_pattern(path) {
                dir
            } else {
                mirrored_local_path(&dir, path)
            };
            Ok(local.display().to_string())
        }

        (Operation::CopyTo { .. } | Operation::CopyFrom { .. }, Plan::SessionManager { .. }) => {
            Err(CrashdError::UnsupportedResourceKind {
                kind: "instance".to_string(),
                operation: operation.name().to_string(),
            })
        }
    }
}

async fn write_capture(
    path: &Path,
    desc: Option<&str>,
    mut stream: OutputStream,
) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    if let Some(desc) = desc.filter(|d| !d.is_empty()) {
        file.write_all(desc.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    tokio::io::copy(&mut stream, &mut file).await?;
    file.flush().await?;
    Ok(())
}
