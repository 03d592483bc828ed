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

//! russh-backed SSH transport.
//!
//! This module is organized into several submodules:
//! - `connection`: connection establishment, jump hosts and authentication
//! - `command`: command execution, buffered and streamed
//! - `file_transfer`: SFTP uploads and downloads

mod command;
mod connection;
mod file_transfer;

use async_trait::async_trait;
use std::path::Path;

use super::{ConnectArgs, KeyAgent, OutputStream, SshTransport, TransportError};

pub use command::CommandOutput;
pub use connection::{ClientHandler, Session};
pub use file_transfer::mirrored_local_path;

/// [`SshTransport`] that opens one russh connection per operation.
#[derive(Debug, Clone, Default)]
pub struct RusshTransport;

impl RusshTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SshTransport for RusshTransport {
    async fn run(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<String, TransportError> {
        let session = Session::connect(args, agent).await?;
        let result = session.execute(cmd).await;
        session.close().await;

        let output = result?;
        if output.exit_status != 0 {
            return Err(TransportError::CommandFailed {
                exit_status: output.exit_status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn run_to_stream(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        cmd: &str,
    ) -> Result<OutputStream, TransportError> {
        let session = Session::connect(args, agent).await?;
        session.execute_streaming(cmd).await
    }

    async fn copy_from(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        dest_dir: &Path,
        src_pattern: &str,
    ) -> Result<(), TransportError> {
        let session = Session::connect(args, agent).await?;
        let result = session.download(src_pattern, dest_dir).await;
        session.close().await;
        result
    }

    async fn copy_to(
        &self,
        args: &ConnectArgs,
        agent: Option<&KeyAgent>,
        src_path: &Path,
        dest_path: &str,
    ) -> Result<(), TransportError> {
        let session = Session::connect(args, agent).await?;
        let result = session.upload(src_path, dest_path).await;
        session.close().await;
        result
    }
}
