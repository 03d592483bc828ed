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

//! SFTP uploads and downloads over an established session.
//!
//! The remote server must have the sftp subsystem enabled
//! (`Subsystem sftp internal-sftp` or the `sftp-server` binary).

use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::connection::Session;
use crate::ssh::TransportError;
use crate::utils::{is_glob_pattern, resolve_local_sources};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Local destination of a downloaded remote path: the remote path below
/// `dest_dir`, with the leading `/` dropped.
pub fn mirrored_local_path(dest_dir: &Path, remote_path: &str) -> PathBuf {
    let relative = remote_path.trim_start_matches('/');
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(dest_dir.to_path_buf(), |acc, part| acc.join(part))
}

fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

impl Session {
    async fn open_sftp(&self) -> Result<SftpSession, TransportError> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    /// Expand a remote glob with the remote shell.
    async fn expand_remote_glob(&self, pattern: &str) -> Result<Vec<String>, TransportError> {
        let output = self.execute(&format!("ls -1d -- {pattern}")).await?;
        if output.exit_status != 0 {
            return Err(TransportError::CommandFailed {
                exit_status: output.exit_status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Download `src_pattern` (file, directory or glob) below `dest_dir`.
    pub async fn download(&self, src_pattern: &str, dest_dir: &Path) -> Result<(), TransportError> {
        let remote_paths = if is_glob_pattern(src_pattern) {
            self.expand_remote_glob(src_pattern).await?
        } else {
            vec![src_pattern.to_string()]
        };

        let sftp = self.open_sftp().await?;
        for remote in &remote_paths {
            let local = mirrored_local_path(dest_dir, remote);
            let metadata = sftp.metadata(remote.as_str()).await?;
            if metadata.is_dir() {
                tokio::fs::create_dir_all(&local).await?;
                download_dir_recursive(&sftp, remote.clone(), local).await?;
            } else {
                download_file(&sftp, remote, &local).await?;
            }
        }
        tracing::debug!(
            "Downloaded {} path(s) from {} into {:?}",
            remote_paths.len(),
            self.target,
            dest_dir
        );
        Ok(())
    }

    /// Upload `src_path` (file, directory or glob) to `dest_path`.
    ///
    /// A single file lands exactly at `dest_path` and a directory becomes
    /// `dest_path`. Glob matches are uploaded into the directory `dest_path`.
    pub async fn upload(&self, src_path: &Path, dest_path: &str) -> Result<(), TransportError> {
        let sources = resolve_local_sources(src_path)
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;
        let sftp = self.open_sftp().await?;

        if !is_glob_pattern(&src_path.to_string_lossy()) {
            if src_path.is_dir() {
                let _ = sftp.create_dir(dest_path).await;
                return upload_dir_recursive(&sftp, src_path.to_path_buf(), dest_path.to_string())
                    .await;
            }
            return upload_file(&sftp, src_path, dest_path).await;
        }

        let _ = sftp.create_dir(dest_path).await;
        for source in &sources {
            let Some(name) = source.file_name() else {
                continue;
            };
            let remote = join_remote(dest_path, &name.to_string_lossy());
            upload_file(&sftp, source, &remote).await?;
        }
        Ok(())
    }
}

async fn upload_file(sftp: &SftpSession, local: &Path, remote: &str) -> Result<(), TransportError> {
    let contents = tokio::fs::read(local).await?;
    let mut file = sftp
        .open_with_flags(
            remote,
            OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
        )
        .await?;
    file.write_all(&contents).await?;
    file.flush().await?;
    file.shutdown().await?;
    Ok(())
}

async fn download_file(sftp: &SftpSession, remote: &str, local: &Path) -> Result<(), TransportError> {
    if let Some(parent) = local.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut remote_file = sftp.open_with_flags(remote, OpenFlags::READ).await?;
    let mut contents = Vec::new();
    remote_file.read_to_end(&mut contents).await?;
    tokio::fs::write(local, contents).await?;
    Ok(())
}

fn upload_dir_recursive(
    sftp: &SftpSession,
    local_dir: PathBuf,
    remote_dir: String,
) -> BoxFuture<'_, Result<(), TransportError>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(&local_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let remote_path = join_remote(&remote_dir, &entry.file_name().to_string_lossy());
            let metadata = entry.metadata().await?;

            if metadata.is_dir() {
                // ignore "already exists"
                let _ = sftp.create_dir(&remote_path).await;
                upload_dir_recursive(sftp, path, remote_path).await?;
            } else if metadata.is_file() {
                upload_file(sftp, &path, &remote_path).await?;
            }
        }
        Ok(())
    })
}

fn download_dir_recursive(
    sftp: &SftpSession,
    remote_dir: String,
    local_dir: PathBuf,
) -> BoxFuture<'_, Result<(), TransportError>> {
    Box::pin(async move {
        for entry in sftp.read_dir(remote_dir.as_str()).await? {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let remote_path = join_remote(&remote_dir, &name);
            let local_path = local_dir.join(&name);
            let file_type = entry.metadata().file_type();

            if file_type.is_dir() {
                tokio::fs::create_dir_all(&local_path).await?;
                download_dir_recursive(sftp, remote_path, local_path).await?;
            } else if file_type.is_file() {
                download_file(sftp, &remote_path, &local_path).await?;
            }
        }
        Ok(())
    })
}
