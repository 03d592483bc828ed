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

//! YAML diagnostics scripts.
//!
//! A script is a list of builtin calls run top to bottom against one
//! [`ExecutionContext`]:
//!
//! ```yaml
//! steps:
//!   - call: ssh_config
//!     args: { username: ops }
//!   - call: host_list_provider
//!     args: { hosts: [10.0.0.1, 10.0.0.2] }
//!     save: hosts
//!   - call: capture
//!     args: { cmd: "df -h", resources: $hosts }
//! ```
//!
//! A string argument of the form `$name` is replaced by the result saved
//! under `name` or by a script argument; `$$` escapes a literal `$`.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::builtins::{BuiltinRegistry, Runtime};
use crate::config::ExecutionContext;
use crate::error::CrashdError;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub call: String,
    #[serde(default)]
    pub args: Value,
    /// Name to store the step's result under.
    #[serde(default)]
    pub save: Option<String>,
}

impl Script {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script {path:?}"))?;
        Self::from_yaml(&text).with_context(|| format!("Failed to parse script {path:?}"))
    }
}

/// The step that halted a script. `step` counts from 1.
#[derive(Debug, Error)]
#[error("step {step} ({call}): {source}")]
pub struct ScriptError {
    pub step: usize,
    pub call: String,
    #[source]
    pub source: CrashdError,
}

pub struct ScriptRunner {
    registry: BuiltinRegistry,
    runtime: Runtime,
    vars: HashMap<String, Value>,
}

impl ScriptRunner {
    pub fn new(registry: BuiltinRegistry, runtime: Runtime) -> Self {
        Self {
            registry,
            runtime,
            vars: HashMap::new(),
        }
    }

    /// Script arguments, visible as `$name`.
    pub fn with_args(mut self, args: impl IntoIterator<Item = (String, String)>) -> Self {
        self.vars
            .extend(args.into_iter().map(|(k, v)| (k, Value::String(v))));
        self
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Run every step in order and return their results. The first failing
    /// step halts the script.
    pub async fn run(
        &mut self,
        script: &Script,
        ctx: &mut ExecutionContext,
    ) -> Result<Vec<Value>, ScriptError> {
        let mut results = Vec::with_capacity(script.steps.len());

        for (idx, step) in script.steps.iter().enumerate() {
            let number = idx + 1;
            let fail = |source: CrashdError| ScriptError {
                step: number,
                call: step.call.clone(),
                source,
            };

            tracing::info!("Step {}: {}", number, step.call);
            let args = substitute(&step.args, &self.vars)
                .map_err(|name| {
                    CrashdError::invalid_argument(&step.call, format!("${name}"), "undefined variable")
                })
                .map_err(fail)?;
            let result = self
                .registry
                .call(&step.call, args, ctx, &self.runtime)
                .await
                .map_err(fail)?;

            if let Some(name) = &step.save {
                self.vars.insert(name.clone(), result.clone());
            }
            results.push(result);
        }

        Ok(results)
    }
}

/// Replace `$name` strings anywhere in `value`. Returns the name of the
/// first undefined variable on failure.
fn substitute(value: &Value, vars: &HashMap<String, Value>) -> Result<Value, String> {
    match value {
        Value::String(text) => {
            if let Some(escaped) = text.strip_prefix("$$") {
                return Ok(Value::String(format!("${escaped}")));
            }
            match text.strip_prefix('$') {
                Some(name) if is_variable_name(name) => {
                    vars.get(name).cloned().ok_or_else(|| name.to_string())
                }
                _ => Ok(value.clone()),
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| substitute(item, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| substitute(v, vars).map(|v| (k.clone(), v)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
