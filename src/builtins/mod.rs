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

//! Script-callable builtins.
//!
//! Every builtin receives its keyword arguments as native values, reads and
//! writes defaults through the [`ExecutionContext`] and returns a native
//! value to the script.
//!
//! ```text
//! BuiltinRegistry
//! ├── declarations  crashd_config, ssh_config, kube_config, resources, set_defaults
//! ├── providers     host_list_provider, kube_nodes_provider, instance_provider, workspace_provider
//! ├── fan-out       run, capture, copy_to, copy_from
//! └── collection    kube_capture, archive
//! ```

mod collect;
mod declare;
mod fanout;
mod kwargs;
mod providers;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ExecutionContext;
use crate::error::{CrashdError, Result};
use crate::kube::{ClusterApi, KubectlApi};
use crate::ssh::{RusshTransport, SshTransport};
use crate::ssm::{AwsSsmTransport, InstanceTransport};

pub use kwargs::Kwargs;

/// External collaborators shared by every builtin of one script run.
#[derive(Clone)]
pub struct Runtime {
    pub ssh: Arc<dyn SshTransport>,
    pub instances: Arc<dyn InstanceTransport>,
    pub cluster: Arc<dyn ClusterApi>,
    pub show_progress: bool,
}

impl Runtime {
    pub fn new(
        ssh: Arc<dyn SshTransport>,
        instances: Arc<dyn InstanceTransport>,
        cluster: Arc<dyn ClusterApi>,
    ) -> Self {
        Self {
            ssh,
            instances,
            cluster,
            show_progress: false,
        }
    }

    /// russh for SSH, the AWS CLI for session manager, kubectl for clusters.
    pub fn system() -> Self {
        Self::new(
            Arc::new(RusshTransport::new()),
            Arc::new(AwsSsmTransport::default()),
            Arc::new(KubectlApi::default()),
        )
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

#[async_trait]
pub trait Builtin: Send + Sync {
    /// Name the script calls the builtin by.
    fn name(&self) -> &'static str;

    /// One-line summary for `crashd builtins`.
    fn summary(&self) -> &'static str;

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value>;
}

/// Builtins by name.
#[derive(Default)]
pub struct BuiltinRegistry {
    builtins: BTreeMap<&'static str, Arc<dyn Builtin>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every builtin crashd ships.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(declare::CrashdConfigDecl);
        registry.register(declare::SshConfigDecl);
        registry.register(declare::KubeConfigDecl);
        registry.register(declare::ResourcesDecl);
        registry.register(declare::SetDefaults);
        registry.register(providers::HostListProvider);
        registry.register(providers::KubeNodesProvider);
        registry.register(providers::InstanceProvider);
        registry.register(providers::WorkspaceProvider);
        registry.register(fanout::Run);
        registry.register(fanout::Capture);
        registry.register(fanout::CopyTo);
        registry.register(fanout::CopyFrom);
        registry.register(collect::KubeCapture);
        registry.register(collect::Archive);
        registry
    }

    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.builtins.insert(builtin.name(), Arc::new(builtin));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.builtins.get(name).cloned()
    }

    /// Builtins in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Builtin>> {
        self.builtins.values()
    }

    /// Look up `name` and call it with `args`.
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: &mut ExecutionContext,
        rt: &Runtime,
    ) -> Result<Value> {
        let builtin = self
            .get(name)
            .ok_or_else(|| CrashdError::UnknownBuiltin(name.to_string()))?;
        let args = Kwargs::from_value(builtin.name(), args)?;
        tracing::debug!("Calling builtin {}", name);
        builtin.call(args, ctx, rt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_names() {
        let registry = BuiltinRegistry::standard();
        let names: Vec<_> = registry.iter().map(|b| b.name()).collect();
        for expected in [
            "archive",
            "capture",
            "copy_from",
            "copy_to",
            "crashd_config",
            "host_list_provider",
            "instance_provider",
            "kube_capture",
            "kube_config",
            "kube_nodes_provider",
            "resources",
            "run",
            "set_defaults",
            "ssh_config",
            "workspace_provider",
        ] {
            assert!(names.contains(&expected), "missing builtin {expected}");
        }
        assert_eq!(names.len(), 15);
    }

    #[tokio::test]
    async fn test_unknown_builtin() {
        let registry = BuiltinRegistry::standard();
        let mut ctx = ExecutionContext::new();
        let err = registry
            .call("nope", Value::Null, &mut ctx, &Runtime::system())
            .await
            .unwrap_err();
        assert!(matches!(err, CrashdError::UnknownBuiltin(name) if name == "nope"));
    }
}
