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

//! Script-scoped store of "current default" configuration values.
//!
//! One [`ExecutionContext`] lives for exactly one script execution. Builtins
//! that declare configuration write into it; fan-out operations only read
//! from it, through a [`ContextSnapshot`] taken before dispatch starts. The
//! context is owned and mutated through `&mut`, so script-level declarations
//! can never race with a running fan-out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::loader::Settings;
use super::types::{CrashdConfig, KubeConfig, SshConfig};
use crate::resource::ResourceSet;
use crate::ssh::KeyAgent;

/// The kinds of defaults the context can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Crashd,
    Ssh,
    Kube,
    Resources,
    KeyAgent,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crashd => "crashd_config",
            Self::Ssh => "ssh_config",
            Self::Kube => "kube_config",
            Self::Resources => "resources",
            Self::KeyAgent => "key_agent",
        };
        f.write_str(name)
    }
}

/// A stored default value, tagged by kind.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Crashd(CrashdConfig),
    Ssh(SshConfig),
    Kube(KubeConfig),
    Resources(ResourceSet),
    KeyAgent(Arc<KeyAgent>),
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            Self::Crashd(_) => ConfigKind::Crashd,
            Self::Ssh(_) => ConfigKind::Ssh,
            Self::Kube(_) => ConfigKind::Kube,
            Self::Resources(_) => ConfigKind::Resources,
            Self::KeyAgent(_) => ConfigKind::KeyAgent,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    values: HashMap<ConfigKind, ConfigValue>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context with the defaults from a settings file.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut ctx = Self::new();
        if let Some(ssh) = &settings.defaults.ssh {
            ctx.set(ConfigValue::Ssh(ssh.clone()));
        }
        if let Some(kube) = &settings.defaults.kube {
            ctx.set(ConfigValue::Kube(kube.clone()));
        }
        if let Some(crashd) = &settings.defaults.crashd {
            ctx.set(ConfigValue::Crashd(crashd.clone()));
        }
        ctx
    }

    pub fn get(&self, kind: ConfigKind) -> Option<&ConfigValue> {
        self.values.get(&kind)
    }

    /// Store `value` as the current default of its kind, returning the
    /// previous default if there was one.
    pub fn set(&mut self, value: ConfigValue) -> Option<ConfigValue> {
        tracing::debug!("Storing default {}", value.kind());
        self.values.insert(value.kind(), value)
    }

    pub fn ssh_config(&self) -> Option<&SshConfig> {
        match self.get(ConfigKind::Ssh) {
            Some(ConfigValue::Ssh(cfg)) => Some(cfg),
            _ => None,
        }
    }

    pub fn kube_config(&self) -> Option<&KubeConfig> {
        match self.get(ConfigKind::Kube) {
            Some(ConfigValue::Kube(cfg)) => Some(cfg),
            _ => None,
        }
    }

    pub fn crashd_config(&self) -> Option<&CrashdConfig> {
        match self.get(ConfigKind::Crashd) {
            Some(ConfigValue::Crashd(cfg)) => Some(cfg),
            _ => None,
        }
    }

    pub fn resources(&self) -> Option<&ResourceSet> {
        match self.get(ConfigKind::Resources) {
            Some(ConfigValue::Resources(set)) => Some(set),
            _ => None,
        }
    }

    pub fn key_agent(&self) -> Option<Arc<KeyAgent>> {
        match self.get(ConfigKind::KeyAgent) {
            Some(ConfigValue::KeyAgent(agent)) => Some(Arc::clone(agent)),
            _ => None,
        }
    }

    /// The stored run config, or the hard-coded default.
    pub fn crashd_or_default(&self) -> CrashdConfig {
        self.crashd_config().cloned().unwrap_or_default()
    }

    /// Read-only copy of the defaults handed to concurrent dispatches.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            ssh: self.ssh_config().cloned(),
            kube: self.kube_config().cloned(),
            crashd: self.crashd_or_default(),
            key_agent: self.key_agent(),
        }
    }
}

/// Immutable view of the context taken at fan-out start.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub ssh: Option<SshConfig>,
    pub kube: Option<KubeConfig>,
    pub crashd: CrashdConfig,
    pub key_agent: Option<Arc<KeyAgent>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceDescriptor;

    #[test]
    fn test_set_overwrites_same_kind() {
        let mut ctx = ExecutionContext::new();
        let first = SshConfig {
            username: "alice".to_string(),
            ..SshConfig::default()
        };
        let second = SshConfig {
            username: "bob".to_string(),
            ..SshConfig::default()
        };

        assert!(ctx.set(ConfigValue::Ssh(first)).is_none());
        let previous = ctx.set(ConfigValue::Ssh(second));
        assert!(matches!(previous, Some(ConfigValue::Ssh(cfg)) if cfg.username == "alice"));
        assert_eq!(ctx.ssh_config().unwrap().username, "bob");
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut ctx = ExecutionContext::new();
        ctx.set(ConfigValue::Kube(KubeConfig::default()));
        assert!(ctx.ssh_config().is_none());
        assert!(ctx.resources().is_none());
        assert!(ctx.kube_config().is_some());
        assert!(ctx.get(ConfigKind::Kube).is_some());
    }

    #[test]
    fn test_snapshot_does_not_track_later_writes() {
        let mut ctx = ExecutionContext::new();
        ctx.set(ConfigValue::Resources(ResourceSet::new(vec![
            ResourceDescriptor::host("10.0.0.1"),
        ])));
        let snapshot = ctx.snapshot();
        ctx.set(ConfigValue::Ssh(SshConfig {
            username: "late".to_string(),
            ..SshConfig::default()
        }));
        assert!(snapshot.ssh.is_none());
        assert_eq!(snapshot.crashd, CrashdConfig::default());
    }

    #[test]
    fn test_from_settings_seeds_defaults() {
        let settings: Settings = serde_yaml::from_str(
            "defaults:\n  ssh:\n    username: ops\n  crashd:\n    workdir: /var/tmp/diag\n",
        )
        .unwrap();
        let ctx = ExecutionContext::from_settings(&settings);
        assert_eq!(ctx.ssh_config().unwrap().username, "ops");
        assert_eq!(ctx.crashd_config().unwrap().workdir, "/var/tmp/diag");
        assert!(ctx.kube_config().is_none());
    }
}
