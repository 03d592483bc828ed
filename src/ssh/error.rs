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

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a transport while talking to one resource.
///
/// The fan-out executor converts every variant into a per-resource
/// dispatch failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("failed to load private key {path}: {source}")]
    Key {
        path: String,
        #[source]
        source: russh::keys::Error,
    },

    #[error("authentication failed for {user}@{host}")]
    Auth { user: String, host: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("giving up on {host} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        host: String,
        attempts: u32,
        last: String,
    },

    #[error("command did not report an exit status")]
    CommandDidntExit,

    #[error("command exited with status {exit_status}: {stderr}")]
    CommandFailed { exit_status: u32, stderr: String },

    #[error("command rejected: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Process(String),
}

impl TransportError {
    /// Errors that a new connection attempt cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Key { .. } | Self::Auth { .. } | Self::InvalidCommand(_)
        )
    }
}
