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

//! SSH collaborator.
//!
//! - `args`: connection-parameter construction ([`ConnectArgs`])
//! - `agent`: in-memory [`KeyAgent`] shared by all dispatches of a run
//! - `client`: russh/russh-sftp implementation ([`RusshTransport`])
//!
//! The fan-out executor only sees the [`SshTransport`] trait, so tests can
//! substitute a local implementation.

mod agent;
mod args;
pub mod client;
mod error;

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncRead;

pub use agent::KeyAgent;
pub use args::{build_connect_args, ConnectArgs, ProxyJump};
pub use client::RusshTransport;
pub use error::TransportError;

/// Command output delivered incrementally.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait SshTransport: Send + Sync {
    /// Run `cmd` and return its stdout. A non-zero exit is an error.
    async fn run(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<String, TransportError>;

    /// Run `cmd` and stream its combined stdout and stderr.
    async fn run_to_stream(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<OutputStream, TransportError>;

    /// Copy the remote file, directory or glob `src_pattern` into
    /// `dest_dir`, mirroring each remote path below it.
    async fn copy_from(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        dest_dir: &Path,
        src_pattern: &str,
    ) -> Result<(), TransportError>;

    /// Copy the local file, directory or glob `src_path` to `dest_path`.
    async fn copy_to(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        src_path: &Path,
        dest_path: &str,
    ) -> Result<(), TransportError>;
}
