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

//! Per-resource outcomes and their aggregation.

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one operation on one resource. `error` is empty on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub resource: String,
    pub result: String,
    pub error: String,
}

impl OperationResult {
    pub fn success(resource: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            result: result.into(),
            error: String::new(),
        }
    }

    pub fn failure(resource: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            resource: resource.into(),
            result: String::new(),
            // a failure always carries a message
            error: if error.is_empty() {
                "unknown error".to_string()
            } else {
                error
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }

    pub fn print_summary(&self) {
        if self.is_success() {
            println!(
                "{} {}: {}",
                "●".green(),
                self.resource.bold(),
                first_line(&self.result).green()
            );
        } else {
            println!(
                "{} {}: {}",
                "●".red(),
                self.resource.bold(),
                "Failed".red()
            );
            for line in self.error.lines() {
                println!("    {}", line.dimmed());
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Value handed back to the script: a single record for one resource,
/// otherwise the ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateOutcome {
    Single(OperationResult),
    Many(Vec<OperationResult>),
}

impl AggregateOutcome {
    pub fn results(&self) -> &[OperationResult] {
        match self {
            Self::Single(result) => std::slice::from_ref(result),
            Self::Many(results) => results,
        }
    }

    pub fn into_results(self) -> Vec<OperationResult> {
        match self {
            Self::Single(result) => vec![result],
            Self::Many(results) => results,
        }
    }

    pub fn len(&self) -> usize {
        self.results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.results().iter().filter(|r| !r.is_success()).count()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Collapse per-resource results: exactly one result becomes a scalar,
/// anything else (including none) stays an ordered list.
pub fn aggregate(mut results: Vec<OperationResult>) -> AggregateOutcome {
    if results.len() == 1 {
        if let Some(single) = results.pop() {
            return AggregateOutcome::Single(single);
        }
    }
    AggregateOutcome::Many(results)
}
