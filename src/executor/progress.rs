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

//! Per-resource progress spinners.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use super::result_types::OperationResult;

const PROGRESS_BAR_TICK_RATE_MS: u64 = 80;
const MAX_DISPLAY_WIDTH: usize = 20;
const MAX_ERROR_WIDTH: usize = 50;

/// Spinners for one fan-out. Disabled progress hands out hidden bars so
/// callers never branch on it.
pub(crate) struct FanOutProgress {
    multi: Option<(MultiProgress, ProgressStyle)>,
}

impl FanOutProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        let multi = if enabled {
            match create_progress_style() {
                Ok(style) => Some((MultiProgress::new(), style)),
                Err(e) => {
                    tracing::debug!("Progress disabled: {e}");
                    None
                }
            }
        } else {
            None
        };
        Self { multi }
    }

    pub(crate) fn add(&self, resource: &str, initial_message: &str) -> ProgressBar {
        let Some((multi, style)) = &self.multi else {
            return ProgressBar::hidden();
        };
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(style.clone());
        pb.set_prefix(format!("[{}]", format_resource_display(resource)));
        pb.set_message(format!("{}", initial_message.cyan()));
        pb.enable_steady_tick(std::time::Duration::from_millis(PROGRESS_BAR_TICK_RATE_MS));
        pb
    }
}

fn create_progress_style() -> Result<ProgressStyle, String> {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .map_err(|e| format!("Failed to create progress bar template: {e}"))
        .map(|style| style.tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷ "))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

fn format_resource_display(resource: &str) -> String {
    truncate(resource, MAX_DISPLAY_WIDTH)
}

pub(crate) fn finish(pb: &ProgressBar, result: &OperationResult) {
    if result.is_success() {
        pb.finish_with_message(format!("{} {}", "●".green(), "Success".green()));
    } else {
        let first_line = result.error.lines().next().unwrap_or("Unknown error");
        pb.finish_with_message(format!(
            "{} {}",
            "●".red(),
            truncate(first_line, MAX_ERROR_WIDTH).red()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("10.0.0.1", 20), "10.0.0.1");
        assert_eq!(
            truncate("very-long-hostname.internal.example.com", 20),
            "very-long-hostnam..."
        );
    }

    #[test]
    fn test_disabled_progress_is_hidden() {
        let progress = FanOutProgress::new(false);
        assert!(progress.add("h1", "Queued").is_hidden());
    }
}
