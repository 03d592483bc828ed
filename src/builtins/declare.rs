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

//! Configuration declarations.
//!
//! Each declaration merges its keyword arguments over the stored default of
//! its kind (or the hard-coded default), stores the result unless called
//! with `persist=false`, and returns it.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Builtin, Kwargs, Runtime};
use crate::config::{ConfigKind, ConfigValue, CrashdConfig, ExecutionContext, SshConfig};
use crate::error::{CrashdError, Result};
use crate::ssh::KeyAgent;
use crate::utils::{ensure_dir, expand_tilde};

/// Create the work directory of `cfg`.
async fn prepare_workdir(cfg: &CrashdConfig) -> Result<()> {
    ensure_dir(&cfg.workdir_path()).await?;
    tracing::info!("Work directory {}", cfg.workdir_path().display());
    Ok(())
}

/// Store `cfg`, starting the key agent first when it asks for one.
fn store_crashd(ctx: &mut ExecutionContext, cfg: CrashdConfig) {
    if cfg.use_ssh_agent && ctx.key_agent().is_none() {
        ctx.set(ConfigValue::KeyAgent(Arc::new(KeyAgent::start())));
    }
    ctx.set(ConfigValue::Crashd(cfg));
}

/// Add the private key of `cfg` to the running key agent, if any.
fn load_key(ctx: &ExecutionContext, cfg: &SshConfig) -> Result<()> {
    if let Some(agent) = ctx.key_agent() {
        let key = expand_tilde(std::path::Path::new(&cfg.private_key_path));
        agent.add_key(&key).map_err(|e| {
            CrashdError::MissingCredential(format!("cannot add {} to key agent: {e}", key.display()))
        })?;
    }
    Ok(())
}

pub struct CrashdConfigDecl;

#[async_trait]
impl Builtin for CrashdConfigDecl {
    fn name(&self) -> &'static str {
        "crashd_config"
    }

    fn summary(&self) -> &'static str {
        "Declare the work directory, key agent use and fan-out limits"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let mut cfg = ctx.crashd_or_default();
        if let Some(workdir) = args.str_opt("workdir")? {
            cfg.workdir = workdir;
        }
        if let Some(use_agent) = args.bool_opt("use_ssh_agent")? {
            cfg.use_ssh_agent = use_agent;
        }
        if let Some(max_parallel) = args.u64_opt("max_parallel")? {
            if max_parallel == 0 {
                return Err(CrashdError::invalid_argument(
                    self.name(),
                    "max_parallel",
                    "must be at least 1",
                ));
            }
            cfg.max_parallel = usize::try_from(max_parallel).unwrap_or(usize::MAX);
        }
        if let Some(timeout) = args.u64_opt("dispatch_timeout")? {
            cfg.dispatch_timeout = (timeout > 0).then_some(timeout);
        }

        prepare_workdir(&cfg).await?;
        let value = serde_json::to_value(&cfg)?;
        if args.persist()? {
            store_crashd(ctx, cfg);
        }
        Ok(value)
    }
}

pub struct SshConfigDecl;

impl SshConfigDecl {
    fn merge(args: &Kwargs, mut cfg: SshConfig) -> Result<SshConfig> {
        if let Some(username) = args.str_opt("username")? {
            cfg.username = username;
        }
        if let Some(port) = args.port_opt("port")? {
            cfg.port = port;
        }
        if let Some(key) = args.str_opt("private_key_path")? {
            cfg.private_key_path = key;
        }
        if let Some(jump_user) = args.str_opt("jump_user")? {
            cfg.jump_user = Some(jump_user);
        }
        if let Some(jump_host) = args.str_opt("jump_host")? {
            cfg.jump_host = Some(jump_host);
        }
        if let Some(retries) = args.u64_opt("max_retries")? {
            cfg.max_retries = Some(u32::try_from(retries).unwrap_or(u32::MAX));
        }
        if let Some(timeout) = args.u64_opt("conn_timeout")? {
            cfg.conn_timeout = Some(timeout);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[async_trait]
impl Builtin for SshConfigDecl {
    fn name(&self) -> &'static str {
        "ssh_config"
    }

    fn summary(&self) -> &'static str {
        "Declare SSH connection parameters"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let base = ctx.ssh_config().cloned().unwrap_or_default();
        let cfg = Self::merge(&args, base)?;
        load_key(ctx, &cfg)?;

        if args.persist()? {
            ctx.set(ConfigValue::Ssh(cfg.clone()));
        }
        Ok(serde_json::to_value(cfg)?)
    }
}

pub struct KubeConfigDecl;

#[async_trait]
impl Builtin for KubeConfigDecl {
    fn name(&self) -> &'static str {
        "kube_config"
    }

    fn summary(&self) -> &'static str {
        "Declare the kubeconfig file and context"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let mut cfg = ctx.kube_config().cloned().unwrap_or_default();
        if let Some(path) = args.str_opt("path")? {
            cfg.path = path;
        }
        if let Some(context) = args.str_opt("context")? {
            cfg.context = Some(context).filter(|c| !c.is_empty());
        }
        if args.persist()? {
            ctx.set(ConfigValue::Kube(cfg.clone()));
        }
        Ok(serde_json::to_value(cfg)?)
    }
}

pub struct ResourcesDecl;

#[async_trait]
impl Builtin for ResourcesDecl {
    fn name(&self) -> &'static str {
        "resources"
    }

    fn summary(&self) -> &'static str {
        "Declare the default resource set from a provider result"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let set = args
            .resources("provider")?
            .ok_or_else(|| args.missing("provider"))?;
        let value = set.to_value()?;
        tracing::debug!("Declared {} resource(s)", set.len());
        if args.persist()? {
            ctx.set(ConfigValue::Resources(set));
        }
        Ok(value)
    }
}

pub struct SetDefaults;

#[async_trait]
impl Builtin for SetDefaults {
    fn name(&self) -> &'static str {
        "set_defaults"
    }

    fn summary(&self) -> &'static str {
        "Store several declared values as defaults in one call"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, _rt: &Runtime) -> Result<Value> {
        let crashd = args.crashd_config("crashd_config")?;
        let ssh = args.ssh_config("ssh_config")?;
        let kube = args.kube_config("kube_config")?;
        let resources = args.resources("resources")?;
        if crashd.is_none() && ssh.is_none() && kube.is_none() && resources.is_none() {
            return Err(CrashdError::NoDefaultsGiven);
        }

        let mut stored = Map::new();
        // the agent must exist before a key can be added to it
        if let Some(cfg) = crashd {
            prepare_workdir(&cfg).await?;
            store_crashd(ctx, cfg);
            stored.insert(ConfigKind::Crashd.to_string(), Value::Bool(true));
        }
        if let Some(cfg) = ssh {
            load_key(ctx, &cfg)?;
            ctx.set(ConfigValue::Ssh(cfg));
            stored.insert(ConfigKind::Ssh.to_string(), Value::Bool(true));
        }
        for value in [kube.map(ConfigValue::Kube), resources.map(ConfigValue::Resources)]
            .into_iter()
            .flatten()
        {
            stored.insert(value.kind().to_string(), Value::Bool(true));
            ctx.set(value);
        }
        Ok(Value::Object(stored))
    }
}
