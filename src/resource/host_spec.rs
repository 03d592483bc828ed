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

use std::fmt;

use crate::config::SshConfig;

/// A host-list entry in `[user@]host[:port]` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
}

impl HostSpec {
    /// Parse formats:
    /// - host
    /// - host:port
    /// - user@host
    /// - user@host:port
    /// - [ipv6] / [ipv6]:port
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err("empty host entry".to_string());
        }

        let (user_part, host_part) = match entry.rfind('@') {
            Some(at_pos) => (Some(&entry[..at_pos]), &entry[at_pos + 1..]),
            None => (None, entry),
        };

        if let Some(user) = user_part {
            if user.is_empty() {
                return Err(format!("empty username in '{entry}'"));
            }
        }

        let (host, port) = if let Some(rest) = host_part.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| format!("unterminated IPv6 literal in '{entry}'"))?;
            let host = &rest[..close];
            let tail = &rest[close + 1..];
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(parse_port(port, entry)?),
                None if tail.is_empty() => None,
                None => return Err(format!("unexpected '{tail}' after IPv6 literal")),
            };
            (host, port)
        } else if host_part.matches(':').count() > 1 {
            // bare IPv6 address, no port
            (host_part, None)
        } else if let Some(colon_pos) = host_part.rfind(':') {
            let port = parse_port(&host_part[colon_pos + 1..], entry)?;
            (&host_part[..colon_pos], Some(port))
        } else {
            (host_part, None)
        };

        if host.is_empty() {
            return Err(format!("missing host in '{entry}'"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            username: user_part.map(str::to_string),
        })
    }

    /// Apply the entry's user and port on top of `base`.
    pub fn apply_to(&self, base: &SshConfig) -> SshConfig {
        let mut cfg = base.clone();
        if let Some(user) = &self.username {
            cfg.username = user.clone();
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        cfg
    }
}

fn parse_port(text: &str, entry: &str) -> Result<u16, String> {
    text.parse::<u16>()
        .map_err(|_| format!("invalid port number in '{entry}'"))
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.username {
            write!(f, "{user}@")?;
        }
        match self.port {
            Some(port) if self.host.contains(':') => write!(f, "[{}]:{port}", self.host),
            Some(port) => write!(f, "{}:{port}", self.host),
            None => write!(f, "{}", self.host),
        }
    }
}
