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

//! Connection-parameter construction.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{SshConfig, DEFAULT_CONN_TIMEOUT_SECS, DEFAULT_MAX_RETRIES};
use crate::error::{CrashdError, Result};
use crate::resource::HostSpec;
use crate::utils::expand_tilde;

/// Bastion the connection is relayed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyJump {
    pub user: String,
    pub host: String,
    pub port: u16,
}

/// Everything a transport needs to reach one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgs {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub private_key_path: PathBuf,
    pub max_retries: u32,
    pub conn_timeout: Duration,
    pub proxy_jump: Option<ProxyJump>,
}

impl ConnectArgs {
    pub fn address(&self) -> String {
        format_address(&self.host, self.port)
    }
}

impl fmt::Display for ConnectArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.address())?;
        if let Some(jump) = &self.proxy_jump {
            write!(f, " via {}@{}", jump.user, format_address(&jump.host, jump.port))?;
        }
        Ok(())
    }
}

pub(crate) fn format_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Build the connection arguments for `target` from `cfg`.
///
/// `cfg` is the effective config for the resource. Retry count and timeout
/// left unset in `cfg` come from `fallback` (the context default), then
/// from the hard-coded defaults. Pure: no I/O, no state.
pub fn build_connect_args(
    cfg: &SshConfig,
    fallback: Option<&SshConfig>,
    target: &str,
) -> Result<ConnectArgs> {
    if cfg.username.trim().is_empty() {
        return Err(CrashdError::MissingCredential(format!(
            "no SSH username configured for {target}"
        )));
    }
    if target.trim().is_empty() {
        return Err(CrashdError::MissingArgument {
            builtin: "ssh".to_string(),
            argument: "target".to_string(),
        });
    }

    let proxy_jump = match cfg.jump_proxy()? {
        Some((user, host)) => {
            let spec = HostSpec::parse(host).map_err(|reason| {
                CrashdError::invalid_argument("ssh_config", "jump_host", reason)
            })?;
            Some(ProxyJump {
                user: user.to_string(),
                host: spec.host,
                port: spec.port.unwrap_or(crate::config::DEFAULT_SSH_PORT),
            })
        }
        None => None,
    };

    let max_retries = cfg
        .max_retries
        .or_else(|| fallback.and_then(|f| f.max_retries))
        .unwrap_or(DEFAULT_MAX_RETRIES);
    let timeout_secs = cfg
        .conn_timeout
        .or_else(|| fallback.and_then(|f| f.conn_timeout))
        .unwrap_or(DEFAULT_CONN_TIMEOUT_SECS);

    Ok(ConnectArgs {
        host: target.trim().to_string(),
        user: cfg.username.trim().to_string(),
        port: cfg.port,
        private_key_path: expand_tilde(std::path::Path::new(&cfg.private_key_path)),
        max_retries,
        conn_timeout: Duration::from_secs(timeout_secs),
        proxy_jump,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user: &str) -> SshConfig {
        SshConfig {
            username: user.to_string(),
            max_retries: None,
            conn_timeout: None,
            ..SshConfig::default()
        }
    }

    #[test]
    fn test_missing_username() {
        let err = build_connect_args(&config(""), None, "10.0.0.1").unwrap_err();
        assert!(matches!(err, CrashdError::MissingCredential(_)));
    }

    #[test]
    fn test_defaults() {
        let args = build_connect_args(&config("ops"), None, "10.0.0.1").unwrap();
        assert_eq!(args.port, 22);
        assert_eq!(args.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(args.conn_timeout, Duration::from_secs(DEFAULT_CONN_TIMEOUT_SECS));
        assert!(args.proxy_jump.is_none());
        assert_eq!(args.to_string(), "ops@10.0.0.1:22");
    }

    #[test]
    fn test_retries_and_timeout_fall_back_to_context() {
        let fallback = SshConfig {
            max_retries: Some(2),
            conn_timeout: Some(5),
            ..config("ctx")
        };
        let mut cfg = config("ops");
        cfg.conn_timeout = Some(9);

        let args = build_connect_args(&cfg, Some(&fallback), "h1").unwrap();
        assert_eq!(args.max_retries, 2);
        assert_eq!(args.conn_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_jump_proxy_present_iff_both_set() {
        let cases = [
            (None, None, Some(false)),
            (Some("jump"), None, None),
            (None, Some("bastion"), None),
            (Some(""), Some(""), Some(false)),
            (Some("jump"), Some("bastion:2200"), Some(true)),
        ];

        for (user, host, expected) in cases {
            let cfg = SshConfig {
                jump_user: user.map(str::to_string),
                jump_host: host.map(str::to_string),
                ..config("ops")
            };
            let built = build_connect_args(&cfg, None, "10.0.0.9");
            match expected {
                Some(has_jump) => {
                    assert_eq!(built.unwrap().proxy_jump.is_some(), has_jump);
                }
                None => assert!(matches!(
                    built,
                    Err(CrashdError::MisconfiguredJumpProxy { .. })
                )),
            }
        }
    }

    #[test]
    fn test_jump_host_port() {
        let cfg = SshConfig {
            jump_user: Some("jump".to_string()),
            jump_host: Some("bastion:2200".to_string()),
            ..config("ops")
        };
        let jump = build_connect_args(&cfg, None, "10.0.0.9")
            .unwrap()
            .proxy_jump
            .unwrap();
        assert_eq!(jump.host, "bastion");
        assert_eq!(jump.port, 2200);
    }

    #[test]
    fn test_ipv6_address() {
        let args = build_connect_args(&config("ops"), None, "::1").unwrap();
        assert_eq!(args.address(), "[::1]:22");
    }
}
