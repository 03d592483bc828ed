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

use anyhow::{Context, Result};
use glob::glob;
use std::io;
use std::path::{Path, PathBuf};

/// Returns true when the string contains shell glob metacharacters.
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Expand a leading `~/` using `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if path_str == "~" || path_str.starts_with("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(path_str.replacen('~', &home, 1));
            }
        }
    }
    path.to_path_buf()
}

/// Create a directory and its parents, treating "already exists" as success.
pub async fn ensure_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Resolve a local source argument into the files to upload.
///
/// Glob patterns expand to every matching file (directories matched by the
/// pattern are walked). A plain path is returned as-is so the caller can
/// decide between file and directory upload.
pub fn resolve_local_sources(source: &Path) -> Result<Vec<PathBuf>> {
    let source_str = source.to_string_lossy();

    if !is_glob_pattern(&source_str) {
        if !source.exists() {
            anyhow::bail!("Source path does not exist: {}", source.display());
        }
        return Ok(vec![source.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in glob(&source_str).with_context(|| format!("Invalid glob pattern: {source_str}"))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) if path.is_dir() => files.extend(walk_directory(&path)?),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }

    if files.is_empty() {
        anyhow::bail!("No files matched pattern: {source_str}");
    }
    Ok(files)
}

/// Recursively collect every regular file under `dir`.
pub fn walk_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(walk_directory(&path)?);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_glob_pattern() {
        assert!(is_glob_pattern("/var/log/*.log"));
        assert!(is_glob_pattern("/tmp/file?.txt"));
        assert!(is_glob_pattern("/tmp/[ab].txt"));
        assert!(!is_glob_pattern("/var/log/syslog"));
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        ensure_dir(&dir).await.unwrap();
        ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_resolve_local_sources_glob() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.log"), "a").unwrap();
        std::fs::write(temp.path().join("b.log"), "b").unwrap();
        std::fs::write(temp.path().join("c.txt"), "c").unwrap();

        let pattern = temp.path().join("*.log");
        let mut files = resolve_local_sources(&pattern).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.log"));
    }

    #[test]
    fn test_resolve_local_sources_missing() {
        assert!(resolve_local_sources(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_walk_directory_recurses() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("top.txt"), "1").unwrap();
        std::fs::write(temp.path().join("nested").join("deep.txt"), "2").unwrap();
        assert_eq!(walk_directory(temp.path()).unwrap().len(), 2);
    }
}
