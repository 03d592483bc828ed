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

use russh::keys::PrivateKey;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::TransportError;
use crate::utils::expand_tilde;

/// In-memory holder of decrypted private keys for one script run.
///
/// Keys are added while the script declares its SSH configs and are only
/// read once dispatch starts, so every connection can share one agent.
#[derive(Default)]
pub struct KeyAgent {
    keys: RwLock<Vec<(PathBuf, Arc<PrivateKey>)>>,
}

impl KeyAgent {
    pub fn start() -> Self {
        tracing::debug!("Starting in-memory key agent");
        Self::default()
    }

    /// Load an unencrypted private key. Adding the same path twice is a
    /// no-op.
    pub fn add_key(&self, path: &Path) -> Result<(), TransportError> {
        let path = expand_tilde(path);
        if self.read().iter().any(|(p, _)| *p == path) {
            return Ok(());
        }

        let key = russh::keys::load_secret_key(&path, None).map_err(|source| {
            TransportError::Key {
                path: path.display().to_string(),
                source,
            }
        })?;
        tracing::debug!("Added key {:?} to agent", path);

        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        if !keys.iter().any(|(p, _)| *p == path) {
            keys.push((path, Arc::new(key)));
        }
        Ok(())
    }

    /// Whether the key at `path` has been added.
    pub fn contains(&self, path: &Path) -> bool {
        let path = expand_tilde(path);
        self.read().iter().any(|(p, _)| *p == path)
    }

    /// Loaded keys, in insertion order.
    pub fn keys(&self) -> Vec<Arc<PrivateKey>> {
        self.read().iter().map(|(_, k)| Arc::clone(k)).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(PathBuf, Arc<PrivateKey>)>> {
        self.keys.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for KeyAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<PathBuf> = self.read().iter().map(|(p, _)| p.clone()).collect();
        f.debug_struct("KeyAgent").field("keys", &paths).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_is_empty() {
        let agent = KeyAgent::start();
        assert!(agent.is_empty());
        assert!(agent.keys().is_empty());
    }

    #[test]
    fn test_add_missing_key_fails() {
        let agent = KeyAgent::start();
        let err = agent
            .add_key(Path::new("/nonexistent/id_ed25519"))
            .unwrap_err();
        assert!(matches!(err, TransportError::Key { .. }));
        assert!(agent.is_empty());
    }
}
