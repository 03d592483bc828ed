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

use russh::ChannelMsg;
use tokio::io::AsyncWriteExt;

use super::connection::Session;
use crate::ssh::{OutputStream, TransportError};

const SSH_CMD_BUFFER_SIZE: usize = 8192;
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;
/// Bytes buffered between the channel reader task and the consumer.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: u32,
}

fn validated(command: &str) -> Result<String, TransportError> {
    crate::utils::sanitize_command(command)
        .map_err(|e| TransportError::InvalidCommand(e.to_string()))
}

impl Session {
    /// Execute a remote command and collect its output.
    pub async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let command = validated(command)?;
        let mut stdout_buffer = Vec::with_capacity(SSH_CMD_BUFFER_SIZE);
        let mut stderr_buffer = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);

        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command.as_str()).await?;

        let mut exit_status: Option<u32> = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout_buffer.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        stderr_buffer.extend_from_slice(data);
                    }
                }
                // The exit status may arrive before the last data packet,
                // so keep reading until the channel closes.
                ChannelMsg::ExitStatus {
                    exit_status: status,
                } => exit_status = Some(status),
                _ => {}
            }
        }

        let exit_status = exit_status.ok_or(TransportError::CommandDidntExit)?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout_buffer).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buffer).into_owned(),
            exit_status,
        })
    }

    /// Execute a remote command, handing back a reader over its stdout and
    /// stderr. The session is owned by a background task that pumps the
    /// channel and closes the connection when the command finishes.
    pub async fn execute_streaming(self, command: &str) -> Result<OutputStream, TransportError> {
        let command = validated(command)?;
        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command.as_str()).await?;

        let (mut writer, reader) = tokio::io::duplex(STREAM_BUFFER_SIZE);
        tokio::spawn(async move {
            let mut exit_status = None;
            while let Some(msg) = channel.wait().await {
                let chunk = match msg {
                    ChannelMsg::Data { ref data } => Some(data.to_vec()),
                    ChannelMsg::ExtendedData { ref data, .. } => Some(data.to_vec()),
                    ChannelMsg::ExitStatus {
                        exit_status: status,
                    } => {
                        exit_status = Some(status);
                        None
                    }
                    _ => None,
                };
                if let Some(chunk) = chunk {
                    if writer.write_all(&chunk).await.is_err() {
                        tracing::debug!("Output reader for {} went away", self.target);
                        break;
                    }
                }
            }
            let _ = writer.shutdown().await;

            match exit_status {
                Some(0) => {}
                Some(status) => tracing::warn!(
                    "Streamed command on {} exited with status {}",
                    self.target,
                    status
                ),
                None => tracing::warn!(
                    "Streamed command on {} did not report an exit status",
                    self.target
                ),
            }
            drop(channel);
            self.close().await;
        });

        Ok(Box::new(reader))
    }
}
