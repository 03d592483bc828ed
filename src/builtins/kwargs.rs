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

//! Keyword arguments handed to a builtin by the scripting layer.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{parse_port, CrashdConfig, KubeConfig, SshConfig};
use crate::error::{CrashdError, Result};
use crate::resource::ResourceSet;

/// Named arguments of one builtin call. A `null` value counts as absent.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    builtin: String,
    named: Map<String, Value>,
}

impl Kwargs {
    pub fn new(builtin: impl Into<String>, named: Map<String, Value>) -> Self {
        Self {
            builtin: builtin.into(),
            named,
        }
    }

    /// Accept an object of named arguments, or `null` for none.
    pub fn from_value(builtin: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(named) => Ok(Self::new(builtin, named)),
            Value::Null => Ok(Self::new(builtin, Map::new())),
            other => Err(CrashdError::invalid_argument(
                builtin,
                "args",
                format!("expected keyword arguments, got {other}"),
            )),
        }
    }

    pub fn builtin(&self) -> &str {
        &self.builtin
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> CrashdError {
        CrashdError::invalid_argument(&self.builtin, key, reason)
    }

    pub fn missing(&self, key: &str) -> CrashdError {
        CrashdError::missing_argument(&self.builtin, key)
    }

    /// A scalar argument as text. Numbers and booleans are stringified.
    pub fn str_opt(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {other}"))),
        }
    }

    /// A non-empty text argument, or `MissingArgument`.
    pub fn require_str(&self, key: &str) -> Result<String> {
        match self.str_opt(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(self.missing(key)),
        }
    }

    pub fn bool_opt(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(key, format!("expected a boolean, got '{s}'"))),
            },
            Some(other) => Err(self.invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    /// A non-negative integer, given as a number or a numeric string.
    pub fn u64_opt(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected a non-negative integer, got {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, format!("expected an integer, got '{s}'"))),
            Some(other) => Err(self.invalid(key, format!("expected an integer, got {other}"))),
        }
    }

    /// A port number; an empty string means the default port.
    pub fn port_opt(&self, key: &str) -> Result<Option<u16>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("invalid port {n}"))),
            Some(Value::String(s)) => parse_port(s)
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("invalid port '{s}'"))),
            Some(other) => Err(self.invalid(key, format!("invalid port {other}"))),
        }
    }

    /// A list of strings. A single string is a one-element list; absent
    /// means empty.
    pub fn str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(self.invalid(key, format!("expected strings, got {other}"))),
                })
                .collect(),
            Some(other) => Err(self.invalid(key, format!("expected a list, got {other}"))),
        }
    }

    /// Whether a declaration should be stored as the new default.
    pub fn persist(&self) -> Result<bool> {
        Ok(self.bool_opt("persist")?.unwrap_or(true))
    }

    fn record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| self.invalid(key, e.to_string()))
            })
            .transpose()
    }

    pub fn ssh_config(&self, key: &str) -> Result<Option<SshConfig>> {
        let cfg: Option<SshConfig> = self.record(key)?;
        if let Some(cfg) = &cfg {
            cfg.validate()?;
        }
        Ok(cfg)
    }

    pub fn kube_config(&self, key: &str) -> Result<Option<KubeConfig>> {
        self.record(key)
    }

    pub fn crashd_config(&self, key: &str) -> Result<Option<CrashdConfig>> {
        self.record(key)
    }

    pub fn resources(&self, key: &str) -> Result<Option<ResourceSet>> {
        self.get(key)
            .map(|value| {
                ResourceSet::from_value(value.clone()).map_err(|e| self.invalid(key, e.to_string()))
            })
            .transpose()
    }
}
