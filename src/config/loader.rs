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

//! Settings file loading and priority management.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::{CrashdConfig, KubeConfig, SshConfig};
use crate::utils::expand_tilde;

/// Settings file contents: defaults that seed every script execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub defaults: SettingsDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsDefaults {
    #[serde(default)]
    pub ssh: Option<SshConfig>,
    #[serde(default)]
    pub kube: Option<KubeConfig>,
    #[serde(default)]
    pub crashd: Option<CrashdConfig>,
}

impl Settings {
    /// Load settings from a file. A missing file yields empty settings.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Settings file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read settings file at {}",
                    expanded_path.display()
                )
            })?;

        let settings: Settings = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse YAML settings file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })?;

        if let Some(ssh) = &settings.defaults.ssh {
            ssh.validate().with_context(|| {
                format!("Invalid ssh defaults in {}", expanded_path.display())
            })?;
        }

        Ok(settings)
    }

    /// Load settings with priority order:
    /// 1. Explicit `--config` path
    /// 2. `./crashd.yaml` in the current directory
    /// 3. XDG config directory (`~/.config/crashd/config.yaml`)
    pub async fn load_with_priority(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            let expanded = expand_tilde(path);
            if !expanded.exists() {
                anyhow::bail!("Settings file not found: {}", expanded.display());
            }
            tracing::debug!("Using explicitly specified settings file: {:?}", expanded);
            return Self::load(&expanded).await;
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                tracing::debug!("Using settings file: {:?}", candidate);
                return Self::load(&candidate).await;
            }
        }

        Ok(Self::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("crashd.yaml")];
        if let Some(dirs) = ProjectDirs::from("", "", "crashd") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths.push(expand_tilde(Path::new("~/.config/crashd/config.yaml")));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_is_default() {
        let settings = Settings::load(Path::new("/nonexistent/crashd.yaml"))
            .await
            .unwrap();
        assert!(settings.defaults.ssh.is_none());
    }

    #[tokio::test]
    async fn test_load_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
defaults:
  ssh:
    username: ops
    port: "2222"
    max_retries: 3
  crashd:
    workdir: /var/tmp/crashd
    max_parallel: 4
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).await.unwrap();
        let ssh = settings.defaults.ssh.unwrap();
        assert_eq!(ssh.username, "ops");
        assert_eq!(ssh.port, 2222);
        assert_eq!(ssh.max_retries, Some(3));
        assert_eq!(settings.defaults.crashd.unwrap().max_parallel, 4);
    }

    #[tokio::test]
    async fn test_load_rejects_half_jump_proxy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "defaults:\n  ssh:\n    username: ops\n    jump_host: bastion\n",
        )
        .unwrap();
        assert!(Settings::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_error() {
        assert!(
            Settings::load_with_priority(Some(Path::new("/nonexistent/settings.yaml")))
                .await
                .is_err()
        );
    }
}
