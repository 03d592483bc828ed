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

use crate::config::SshConfig;
use crate::error::{CrashdError, Result};
use crate::resource::{HostSpec, ResourceDescriptor, ResourceSet};

const PROVIDER: &str = "host_list_provider";

/// Build one host resource per entry, in the given order.
///
/// The entry as written (`[user@]host[:port]`) is the resource's target, so
/// two entries that differ only in user or port stay distinct. Its user and
/// port are applied when the resource is dispatched, over whatever SSH
/// config is in effect then. `ssh_override` is attached to every resource
/// when given.
pub fn host_list(hosts: &[String], ssh_override: Option<&SshConfig>) -> Result<ResourceSet> {
    if hosts.is_empty() {
        return Err(CrashdError::missing_argument(PROVIDER, "hosts"));
    }

    if let Some(cfg) = ssh_override {
        cfg.validate()?;
    }

    hosts
        .iter()
        .map(|entry| {
            HostSpec::parse(entry)
                .map_err(|reason| CrashdError::invalid_argument(PROVIDER, "hosts", reason))?;
            Ok(ResourceDescriptor::Host {
                target: entry.trim().to_string(),
                ssh_config: ssh_override.cloned(),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(ResourceSet::new)
}
