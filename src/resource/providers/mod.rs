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

//! Resource providers.
//!
//! Each provider turns its own inputs into a [`ResourceSet`] whose entries
//! share one kind. Providers never touch the execution context; persisting
//! a provider's output as the default resource set is up to the caller.
//!
//! [`ResourceSet`]: super::ResourceSet

mod host_list;
mod instances;
mod kube_nodes;
mod workspaces;

pub use host_list::host_list;
pub use instances::instances;
pub use kube_nodes::{kube_nodes, NodeFilter};
pub use workspaces::{workspaces, WorkspaceWalk, DEFAULT_MAX_DEPTH, DEFAULT_ROOT_WORKSPACE};
