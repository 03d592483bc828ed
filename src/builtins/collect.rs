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

//! Collection helpers: Kubernetes object and log capture, bundling.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{Builtin, Kwargs, Runtime};
use crate::bundle;
use crate::config::{ExecutionContext, KubeConfig};
use crate::error::{CrashdError, Result};
use crate::kube::{capture_logs, capture_objects, CaptureRequest};
use crate::resource::{ResourceDescriptor, ResourceSet};
use crate::utils::{expand_tilde, sanitize_path_segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureWhat {
    Objects,
    Logs,
}

impl CaptureWhat {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "objects" => Some(Self::Objects),
            "logs" => Some(Self::Logs),
            _ => None,
        }
    }

    fn dir_name(self) -> &'static str {
        match self {
            Self::Objects => "objects",
            Self::Logs => "logs",
        }
    }
}

/// One capture target: a cluster reached through `kube`, written below
/// `out_dir`.
struct CaptureTarget {
    kube: KubeConfig,
    out_dir: PathBuf,
}

fn capture_targets(
    kube: &KubeConfig,
    resources: Option<&ResourceSet>,
    kube_root: &Path,
    what: CaptureWhat,
) -> Vec<CaptureTarget> {
    let workspaces: Vec<CaptureTarget> = resources
        .into_iter()
        .flatten()
        .filter_map(|resource| match resource {
            ResourceDescriptor::Workspace { name, kubeconfig } => Some(CaptureTarget {
                kube: KubeConfig {
                    path: kubeconfig.to_string_lossy().into_owned(),
                    context: kube.context.clone(),
                },
                out_dir: kube_root
                    .join(sanitize_path_segment(name))
                    .join(what.dir_name()),
            }),
            other => {
                tracing::warn!("kube_capture: skipping non-workspace resource {}", other);
                None
            }
        })
        .collect();

    if workspaces.is_empty() {
        vec![CaptureTarget {
            kube: kube.clone(),
            out_dir: kube_root.join(what.dir_name()),
        }]
    } else {
        workspaces
    }
}

pub struct KubeCapture;

#[async_trait]
impl Builtin for KubeCapture {
    fn name(&self) -> &'static str {
        "kube_capture"
    }

    fn summary(&self) -> &'static str {
        "Dump Kubernetes objects or pod logs into the work directory"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let what_text = args
            .str_opt("what")?
            .unwrap_or_else(|| CaptureWhat::Objects.dir_name().to_string());
        let what = CaptureWhat::parse(&what_text).ok_or_else(|| {
            CrashdError::invalid_argument(
                self.name(),
                "what",
                format!("expected 'objects' or 'logs', got '{what_text}'"),
            )
        })?;
        let request = CaptureRequest {
            kinds: args.str_list("kinds")?,
            namespaces: args.str_list("namespaces")?,
        };
        let kube = match args.kube_config("kube_config")? {
            Some(kube) => kube,
            None => ctx.kube_config().cloned().unwrap_or_default(),
        };
        let explicit = args.resources("resources")?;
        let resources = explicit.as_ref().or(ctx.resources());
        let kube_root = ctx.crashd_or_default().workdir_path().join("kube");

        let mut written = Vec::new();
        for target in capture_targets(&kube, resources, &kube_root, what) {
            let paths = match what {
                CaptureWhat::Objects => {
                    capture_objects(rt.cluster.as_ref(), &target.kube, &request, &target.out_dir)
                        .await
                }
                CaptureWhat::Logs => {
                    capture_logs(rt.cluster.as_ref(), &target.kube, &request, &target.out_dir).await
                }
            }
            .map_err(|e| CrashdError::provider_lookup(self.name(), e))?;
            written.extend(paths);
        }

        Ok(Value::Array(
            written
                .into_iter()
                .map(|p| Value::String(p.display().to_string()))
                .collect(),
        ))
    }
}

pub struct Archive;

#[async_trait]
impl Builtin for Archive {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn summary(&self) -> &'static str {
        "Bundle collected files into a .tar.gz archive"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let workdir = ctx.crashd_or_default().workdir_path();
        let output = match args.str_opt("output_file")?.filter(|o| !o.is_empty()) {
            Some(output) => expand_tilde(Path::new(&output)),
            None => workdir
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(bundle::default_bundle_name()),
        };
        let mut sources: Vec<PathBuf> = args
            .str_list("source_paths")?
            .iter()
            .map(|s| expand_tilde(Path::new(s)))
            .collect();
        if sources.is_empty() {
            sources.push(workdir);
        }

        let path = bundle::archive(&output, &sources).await?;
        Ok(Value::String(path.display().to_string()))
    }
}
