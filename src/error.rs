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

//! Error taxonomy shared by builtins, providers and the fan-out executor.
//!
//! Errors fall in two classes:
//!
//! - **Fatal**: argument or configuration resolution failed, or a provider
//!   lookup failed. The whole builtin call (and the running script) stops.
//! - **Isolated**: a single resource failed or was not dispatchable. The
//!   failure is recorded in that resource's `OperationResult` and the
//!   fan-out continues.

use std::io;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T, E = CrashdError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CrashdError {
    #[error("{builtin}: missing required argument '{argument}'")]
    MissingArgument { builtin: String, argument: String },

    #[error("{builtin}: invalid argument '{argument}': {reason}")]
    InvalidArgument {
        builtin: String,
        argument: String,
        reason: String,
    },

    #[error("no resources given and no default resources declared")]
    MissingResources,

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error(
        "jump proxy requires both jump_user and jump_host (jump_user={jump_user:?}, jump_host={jump_host:?})"
    )]
    MisconfiguredJumpProxy {
        jump_user: Option<String>,
        jump_host: Option<String>,
    },

    #[error("set_defaults: no recognized defaults given")]
    NoDefaultsGiven,

    #[error("{provider}: lookup failed: {reason}")]
    ProviderLookupFailed { provider: String, reason: String },

    #[error("{resource}: {reason}")]
    DispatchFailure { resource: String, reason: String },

    #[error("{operation}: unsupported resource kind '{kind}'")]
    UnsupportedResourceKind { kind: String, operation: String },

    #[error("unknown builtin '{0}'")]
    UnknownBuiltin(String),

    #[error("bundle: {0}")]
    Bundle(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrashdError {
    pub fn missing_argument(builtin: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            builtin: builtin.into(),
            argument: argument.into(),
        }
    }

    pub fn invalid_argument(
        builtin: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            builtin: builtin.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn provider_lookup(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::ProviderLookupFailed {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    pub fn dispatch(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::DispatchFailure {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the whole builtin call.
    ///
    /// Dispatch failures and unsupported resource kinds stay confined to the
    /// resource that produced them.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DispatchFailure { .. } | Self::UnsupportedResourceKind { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CrashdError::MissingResources.is_fatal());
        assert!(CrashdError::NoDefaultsGiven.is_fatal());
        assert!(CrashdError::provider_lookup("kube_nodes_provider", "refused").is_fatal());
        assert!(!CrashdError::dispatch("10.0.0.1", "connection refused").is_fatal());
        assert!(!CrashdError::UnsupportedResourceKind {
            kind: "workspace".to_string(),
            operation: "run".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_missing_argument_message() {
        let err = CrashdError::missing_argument("host_list_provider", "hosts");
        assert_eq!(
            err.to_string(),
            "host_list_provider: missing required argument 'hosts'"
        );
    }
}
