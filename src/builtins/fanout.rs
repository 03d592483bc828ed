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

//! Fan-out builtins: run, capture, copy_to and copy_from.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{Builtin, Kwargs, Runtime};
use crate::config::ExecutionContext;
use crate::error::{CrashdError, Result};
use crate::executor::{FanOutExecutor, Operation};
use crate::resource::ResourceSet;
use crate::utils::{expand_tilde, is_glob_pattern};

/// Explicit `resources`, else the stored default, else `MissingResources`.
fn target_resources(args: &Kwargs, ctx: &ExecutionContext) -> Result<ResourceSet> {
    match args.resources("resources")? {
        Some(set) => Ok(set),
        None => ctx.resources().cloned().ok_or(CrashdError::MissingResources),
    }
}

async fn fan_out(
    operation: Operation,
    args: &Kwargs,
    ctx: &ExecutionContext,
    rt: &Runtime,
) -> Result<Value> {
    let resources = target_resources(args, ctx)?;
    let explicit_ssh = args.ssh_config("ssh_config")?;
    let snapshot = ctx.snapshot();

    let outcome = FanOutExecutor::new(rt.ssh.clone(), rt.instances.clone())
        .with_progress(rt.show_progress)
        .execute(&operation, &resources, &snapshot, explicit_ssh.as_ref())
        .await?;
    Ok(outcome.to_value())
}

pub struct Run;

#[async_trait]
impl Builtin for Run {
    fn name(&self) -> &'static str {
        "run"
    }

    fn summary(&self) -> &'static str {
        "Run a command on every resource and return its output"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let cmd = args.require_str("cmd")?;
        fan_out(Operation::Run { cmd }, &args, ctx, rt).await
    }
}

pub struct Capture;

#[async_trait]
impl Builtin for Capture {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn summary(&self) -> &'static str {
        "Run a command on every resource and write its output to a file"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let operation = Operation::Capture {
            cmd: args.require_str("cmd")?,
            file_name: args.str_opt("file_name")?.filter(|n| !n.is_empty()),
            desc: args.str_opt("desc")?,
        };
        fan_out(operation, &args, ctx, rt).await
    }
}

pub struct CopyTo;

/// Remote destination when none is given: the same path as the source,
/// or the directory holding the pattern for a glob.
fn default_copy_target(source: &Path) -> String {
    let text = source.to_string_lossy();
    if is_glob_pattern(&text) {
        source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string())
    } else {
        text.into_owned()
    }
}

#[async_trait]
impl Builtin for CopyTo {
    fn name(&self) -> &'static str {
        "copy_to"
    }

    fn summary(&self) -> &'static str {
        "Upload local files, directories or globs to every resource"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let source: PathBuf = expand_tilde(Path::new(&args.require_str("source_path")?));
        let target = match args.str_opt("target_path")?.filter(|t| !t.is_empty()) {
            Some(target) => target,
            None => default_copy_target(&source),
        };
        fan_out(Operation::CopyTo { source, target }, &args, ctx, rt).await
    }
}

pub struct CopyFrom;

#[async_trait]
impl Builtin for CopyFrom {
    fn name(&self) -> &'static str {
        "copy_from"
    }

    fn summary(&self) -> &'static str {
        "Download remote files, directories or globs from every resource"
    }

    async fn call(&self, args: Kwargs, ctx: &mut ExecutionContext, rt: &Runtime) -> Result<Value> {
        let path = args.require_str("path")?;
        fan_out(Operation::CopyFrom { path }, &args, ctx, rt).await
    }
}
