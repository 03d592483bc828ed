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

//! Configuration record definitions.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::error::{CrashdError, Result};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "~/.ssh/id_rsa";
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_CONN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKDIR: &str = "/tmp/crashd";
pub const DEFAULT_MAX_PARALLEL: usize = 10;
pub const DEFAULT_KUBECONFIG: &str = "~/.kube/config";

/// SSH connection parameters shared by every resource that does not carry
/// its own override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Connection timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_timeout: Option<u64>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            port: DEFAULT_SSH_PORT,
            private_key_path: DEFAULT_PRIVATE_KEY_PATH.to_string(),
            jump_user: None,
            jump_host: None,
            max_retries: Some(DEFAULT_MAX_RETRIES),
            conn_timeout: Some(DEFAULT_CONN_TIMEOUT_SECS),
        }
    }
}

impl SshConfig {
    /// Jump user and host, present only when both are non-empty.
    ///
    /// Setting exactly one of them is a configuration error rather than a
    /// silent direct connection.
    pub fn jump_proxy(&self) -> Result<Option<(&str, &str)>> {
        let user = self.jump_user.as_deref().filter(|u| !u.trim().is_empty());
        let host = self.jump_host.as_deref().filter(|h| !h.trim().is_empty());
        match (user, host) {
            (Some(user), Some(host)) => Ok(Some((user, host))),
            (None, None) => Ok(None),
            _ => Err(CrashdError::MisconfiguredJumpProxy {
                jump_user: self.jump_user.clone(),
                jump_host: self.jump_host.clone(),
            }),
        }
    }

    /// Check the invariants a declared config must hold.
    pub fn validate(&self) -> Result<()> {
        self.jump_proxy().map(|_| ())
    }
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_private_key_path() -> String {
    DEFAULT_PRIVATE_KEY_PATH.to_string()
}

/// Accept the port as either an integer or a numeric string ("22").
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) if text.trim().is_empty() => Ok(DEFAULT_SSH_PORT),
        PortValue::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{text}'"))),
    }
}

/// Parse a port given as a string, treating empty input as the default.
pub fn parse_port(text: &str) -> Option<u16> {
    let text = text.trim();
    if text.is_empty() {
        Some(DEFAULT_SSH_PORT)
    } else {
        text.parse().ok()
    }
}

/// Kubernetes API access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(default = "default_kubeconfig")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_KUBECONFIG.to_string(),
            context: None,
        }
    }
}

impl KubeConfig {
    pub fn expanded_path(&self) -> PathBuf {
        crate::utils::expand_tilde(std::path::Path::new(&self.path))
    }
}

fn default_kubeconfig() -> String {
    DEFAULT_KUBECONFIG.to_string()
}

/// Run-scoped settings for a diagnostics script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashdConfig {
    #[serde(default = "default_workdir")]
    pub workdir: String,
    #[serde(default)]
    pub use_ssh_agent: bool,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Per-resource dispatch timeout in seconds; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout: Option<u64>,
}

impl Default for CrashdConfig {
    fn default() -> Self {
        Self {
            workdir: DEFAULT_WORKDIR.to_string(),
            use_ssh_agent: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
            dispatch_timeout: None,
        }
    }
}

impl CrashdConfig {
    pub fn workdir_path(&self) -> PathBuf {
        crate::utils::expand_tilde(std::path::Path::new(&self.workdir))
    }
}

fn default_workdir() -> String {
    DEFAULT_WORKDIR.to_string()
}

fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}
