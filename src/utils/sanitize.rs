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

use anyhow::{bail, Result};
use tracing::warn;

/// Maximum accepted command length (16KB).
const MAX_COMMAND_LENGTH: usize = 16384;

/// Maximum length of a generated file name, before the extension.
const MAX_FILE_STEM_LENGTH: usize = 128;

/// Validate a remote command before it is sent over a channel.
///
/// Empty commands, oversized commands and commands containing NUL bytes are
/// rejected. Suspicious shell patterns only produce a warning since
/// diagnostics scripts legitimately use pipes and substitutions.
pub fn sanitize_command(command: &str) -> Result<String> {
    if command.trim().is_empty() {
        bail!("Empty command not allowed");
    }

    if command.len() > MAX_COMMAND_LENGTH {
        bail!(
            "Command too long: {} bytes (max: {} bytes)",
            command.len(),
            MAX_COMMAND_LENGTH
        );
    }

    if command.contains('\0') {
        bail!("Command contains null bytes");
    }

    let dangerous_patterns = [
        (":(){ :|:& };:", "fork bomb"),
        ("while true", "potential infinite loop"),
        ("yes |", "potential resource exhaustion"),
    ];

    for (pattern, description) in &dangerous_patterns {
        if command.contains(pattern) {
            warn!(
                "Potentially dangerous pattern detected in command: {} ({})",
                pattern, description
            );
        }
    }

    Ok(command.to_string())
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'
}

/// Turn an arbitrary target identifier into a single safe path segment.
///
/// Every character outside `[A-Za-z0-9._-]` becomes `_`. Segments made only
/// of dots (`.`, `..`) and the empty string are mapped to underscores so the
/// result can never escape the parent directory.
pub fn sanitize_path_segment(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }
    if sanitized.chars().all(|c| c == '.') {
        return "_".repeat(sanitized.len());
    }
    sanitized
}

/// Derive a capture file name from a command line, e.g. `echo hi` -> `echo_hi.txt`.
pub fn command_file_name(command: &str) -> String {
    let mut stem = String::with_capacity(command.len());
    let mut last_was_sep = false;
    for c in command.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            stem.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            stem.push('_');
            last_was_sep = true;
        }
    }

    let stem = stem.trim_matches(|c| c == '_' || c == '.');
    let stem: String = stem.chars().take(MAX_FILE_STEM_LENGTH).collect();
    if stem.is_empty() {
        "command.txt".to_string()
    } else {
        format!("{stem}.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_command_valid() {
        assert!(sanitize_command("ls -la").is_ok());
        assert!(sanitize_command("ps aux | grep ssh").is_ok());
        assert!(sanitize_command("journalctl -u kubelet --since \"1 hour ago\"").is_ok());
    }

    #[test]
    fn test_sanitize_command_rejects() {
        assert!(sanitize_command("").is_err());
        assert!(sanitize_command("   ").is_err());
        assert!(sanitize_command("echo\0test").is_err());
        assert!(sanitize_command(&"a".repeat(MAX_COMMAND_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_path_segment_keeps_safe_targets() {
        assert_eq!(sanitize_path_segment("127.0.0.1"), "127.0.0.1");
        assert_eq!(sanitize_path_segment("node-1.example_com"), "node-1.example_com");
    }

    #[test]
    fn test_path_segment_replaces_unsafe() {
        assert_eq!(sanitize_path_segment("10.0.0.1:2222"), "10.0.0.1_2222");
        assert_eq!(sanitize_path_segment("root:org/team"), "root_org_team");
        assert_eq!(sanitize_path_segment("[::1]"), "___1_");
        assert_eq!(sanitize_path_segment("a b\\c"), "a_b_c");
    }

    #[test]
    fn test_path_segment_cannot_traverse() {
        assert_eq!(sanitize_path_segment(".."), "__");
        assert_eq!(sanitize_path_segment("."), "_");
        assert_eq!(sanitize_path_segment(""), "_");
        assert_eq!(sanitize_path_segment("../etc"), ".._etc");
    }

    #[test]
    fn test_path_segment_is_deterministic() {
        let a = sanitize_path_segment("user@host:22/x");
        let b = sanitize_path_segment("user@host:22/x");
        assert_eq!(a, b);
        assert_eq!(a, "user_host_22_x");
    }

    #[test]
    fn test_command_file_name() {
        assert_eq!(command_file_name("echo hi"), "echo_hi.txt");
        assert_eq!(command_file_name("df -h"), "df_-h.txt");
        assert_eq!(command_file_name("cat /var/log/syslog | tail"), "cat_var_log_syslog_tail.txt");
        assert_eq!(command_file_name("  "), "command.txt");
    }
}
