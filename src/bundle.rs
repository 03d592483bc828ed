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

//! Diagnostics bundle writer: collected artifacts packed as `.tar.gz`.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{CrashdError, Result};
use crate::utils::expand_tilde;

/// `crashd_<timestamp>.tar.gz`, used when a script names no output file.
pub fn default_bundle_name() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("crashd_{timestamp}.tar.gz")
}

/// Pack `sources` into a gzip-compressed tarball at `output`.
///
/// Each source lands at the top of the archive under its own file name;
/// directories are added recursively. The output file must not live
/// inside one of the sources.
pub async fn archive(output: &Path, sources: &[PathBuf]) -> Result<PathBuf> {
    if sources.is_empty() {
        return Err(CrashdError::Bundle("no source paths to archive".to_string()));
    }

    let output = expand_tilde(output);
    let sources: Vec<PathBuf> = sources.iter().map(|s| expand_tilde(s)).collect();
    for source in &sources {
        if !source.exists() {
            return Err(CrashdError::Bundle(format!(
                "source path {} does not exist",
                source.display()
            )));
        }
        if source.is_dir() && output.starts_with(source) {
            return Err(CrashdError::Bundle(format!(
                "output {} is inside archived directory {}",
                output.display(),
                source.display()
            )));
        }
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::utils::ensure_dir(parent).await?;
    }

    let target = output.clone();
    tokio::task::spawn_blocking(move || write_tarball(&target, &sources))
        .await
        .map_err(|e| CrashdError::Bundle(format!("archive task failed: {e}")))??;

    tracing::info!("Wrote diagnostics bundle {:?}", output);
    Ok(output)
}

fn write_tarball(output: &Path, sources: &[PathBuf]) -> Result<()> {
    let file = File::create(output)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for source in sources {
        let name = entry_name(source)?;
        tracing::debug!("Adding {:?} as {}", source, name);
        if source.is_dir() {
            builder.append_dir_all(&name, source)?;
        } else {
            builder.append_path_with_name(source, &name)?;
        }
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

fn entry_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CrashdError::Bundle(format!("cannot name archive entry for {}", source.display()))
        })
}
