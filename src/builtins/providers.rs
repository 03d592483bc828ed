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

//! Provider builtins. Providers return a resource set and never touch the
//! stored defaults; a script stores one with `resources(...)`.

use async_trait::async_trait;
use serde_json::Value;

use super::{Builtin, Kwargs, Runtime};
use crate::config::ExecutionContext;
use crate::error::{CrashdError, Result};
use crate::resource::providers::{
    self, NodeFilter, WorkspaceWalk, DEFAULT_MAX_DEPTH, DEFAULT_ROOT_WORKSPACE,
};

pub struct HostListProvider;

#[async_trait]
impl Builtin for HostListProvider {
    fn name(&self) -> &'static str {
        "host_list_provider"
    }

    fn summary(&self) -> &'static str {
        "Resources from an explicit list of [user@]host[:port] entries"
    }

    async fn call(&self, args: Kwargs, _ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let hosts = args.str_list("hosts")?;
        let ssh_override = args.ssh_config("ssh_config")?;
        providers::host_list(&hosts, ssh_override.as_ref())?.to_value()
    }
}

pub struct KubeNodesProvider;

#[async_trait]
impl Builtin for KubeNodesProvider {
    fn name(&self) -> &'static str {
        "kube_nodes_provider"
    }

    fn summary(&self) -> &'static str {
        "Resources from the nodes of a Kubernetes cluster"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let kube = match args.kube_config("kube_config")? {
            Some(kube) => kube,
            None => ctx.kube_config().cloned().unwrap_or_default(),
        };
        let filter = NodeFilter {
            names: args.str_list("names")?,
            labels: args.str_list("labels")?,
        };
        let ssh_override = args.ssh_config("ssh_config")?;

        let set =
            providers::kube_nodes(rt.cluster.as_ref(), &kube, &filter, ssh_override.as_ref())
                .await?;
        set.to_value()
    }
}

pub struct InstanceProvider;

#[async_trait]
impl Builtin for InstanceProvider {
    fn name(&self) -> &'static str {
        "instance_provider"
    }

    fn summary(&self) -> &'static str {
        "Resources from cloud instance ids reached through session manager"
    }

    async fn call(&self, args: Kwargs, _ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let ids = args.str_list("instance_ids")?;
        let region = args.str_opt("region")?.unwrap_or_default();
        providers::instances(&ids, &region)?.to_value()
    }
}

pub struct WorkspaceProvider;

#[async_trait]
impl Builtin for WorkspaceProvider {
    fn name(&self) -> &'static str {
        "workspace_provider"
    }

    fn summary(&self) -> &'static str {
        "Resources from a walk of the workspace tree of a hub cluster"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let admin = match args.kube_config("kube_config")? {
            Some(kube) => kube,
            None => ctx.kube_config().cloned().unwrap_or_default(),
        };
        let max_depth = match args.u64_opt("max_depth")? {
            Some(depth) => usize::try_from(depth).map_err(|_| {
                CrashdError::invalid_argument(self.name(), "max_depth", "out of range")
            })?,
            None => DEFAULT_MAX_DEPTH,
        };
        let walk = WorkspaceWalk {
            root: args
                .str_opt("root")?
                .unwrap_or_else(|| DEFAULT_ROOT_WORKSPACE.to_string()),
            max_depth,
            out_dir: ctx.crashd_or_default().workdir_path().join(".kube"),
        };

        providers::workspaces(rt.cluster.as_ref(), &admin, &walk)
            .await?
            .to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinRegistry;
    use crate::config::ConfigValue;
    use crate::config::SshConfig;
    use serde_json::json;

    async fn call(name: &str, args: Value, ctx: &mut ExecutionContext) -> Result<Value> {
        BuiltinRegistry::standard()
            .call(name, args, ctx, &Runtime::system())
            .await
    }

    #[tokio::test]
    async fn test_host_list_does_not_persist() {
        let mut ctx = ExecutionContext::new();
        let value = call(
            "host_list_provider",
            json!({"hosts": ["10.0.0.1", "admin@10.0.0.2:2222"]}),
            &mut ctx,
        )
        .await
        .unwrap();
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["target"], "10.0.0.1");
        assert_eq!(list[1]["target"], "admin@10.0.0.2:2222");
        assert!(list[1].get("ssh_config").is_none());
        assert!(ctx.resources().is_none());
        assert!(ctx.ssh_config().is_none());
    }

    #[tokio::test]
    async fn test_host_list_does_not_copy_stored_default() {
        let mut ctx = ExecutionContext::new();
        ctx.set(ConfigValue::Ssh(SshConfig {
            username: "ops".to_string(),
            ..SshConfig::default()
        }));
        let value = call("host_list_provider", json!({"hosts": "h1:2200"}), &mut ctx)
            .await
            .unwrap();
        let list = value.as_array().unwrap();
        assert_eq!(list[0]["target"], "h1:2200");
        assert!(list[0].get("ssh_config").is_none());
    }

    #[tokio::test]
    async fn test_host_list_requires_hosts() {
        let mut ctx = ExecutionContext::new();
        let err = call("host_list_provider", json!({}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CrashdError::MissingArgument { .. }));
    }

    #[tokio::test]
    async fn test_instance_provider() {
        let mut ctx = ExecutionContext::new();
        let err = call("instance_provider", json!({"instance_ids": ["i-1"]}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CrashdError::MissingArgument { .. }));

        let value = call(
            "instance_provider",
            json!({"instance_ids": ["i-1", "i-2"], "region": "us-west-2"}),
            &mut ctx,
        )
        .await
        .unwrap();
        assert_eq!(value[1]["instance_id"], "i-2");
        assert_eq!(value[1]["kind"], "instance");
    }
}
