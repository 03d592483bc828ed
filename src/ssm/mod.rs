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

//! Cloud session-manager collaborator for instance resources.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::ssh::{OutputStream, TransportError};

const SESSION_DOCUMENT: &str = "AWS-StartNonInteractiveCommand";

#[async_trait]
pub trait InstanceTransport: Send + Sync {
    async fn run(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<String, TransportError>;

    async fn run_to_stream(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<OutputStream, TransportError>;
}

/// Runs commands through `aws ssm start-session`.
#[derive(Debug, Clone)]
pub struct AwsSsmTransport {
    binary: String,
}

impl Default for AwsSsmTransport {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
        }
    }
}

impl AwsSsmTransport {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn start_session(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<String, TransportError> {
        let command = crate::utils::sanitize_command(cmd)
            .map_err(|e| TransportError::InvalidCommand(e.to_string()))?;
        let parameters = serde_json::json!({ "command": [command] }).to_string();

        tracing::debug!("Starting SSM session to {instance_id} in {region}");
        let output = Command::new(&self.binary)
            .args(["ssm", "start-session", "--target", instance_id])
            .args(["--region", region, "--document-name", SESSION_DOCUMENT])
            .arg("--parameters")
            .arg(parameters)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TransportError::Process(format!(
                "aws ssm start-session to {instance_id} exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(strip_session_banner(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// Drop the "Starting session..." / "Exiting session..." lines the session
/// plugin wraps around command output.
fn strip_session_banner(output: &str) -> String {
    let mut kept: Vec<&str> = output
        .split_inclusive('\n')
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("Starting session with SessionId:")
                || line.starts_with("Exiting session with sessionId:"))
        })
        .collect();
    while kept.first().is_some_and(|l| l.trim().is_empty()) {
        kept.remove(0);
    }
    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }
    kept.concat()
}

#[async_trait]
impl InstanceTransport for AwsSsmTransport {
    async fn run(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<String, TransportError> {
        self.start_session(instance_id, region, cmd).await
    }

    async fn run_to_stream(
        &self,
        instance_id: &str,
        region: &str,
        cmd: &str,
    ) -> Result<OutputStream, TransportError> {
        // Banner filtering needs the whole output.
        let output = self.start_session(instance_id, region, cmd).await?;
        Ok(Box::new(std::io::Cursor::new(output.into_bytes())))
    }
}
