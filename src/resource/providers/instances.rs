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

use crate::error::{CrashdError, Result};
use crate::resource::{ResourceDescriptor, ResourceSet};

const PROVIDER: &str = "instance_provider";

/// One instance resource per id. Ids are not checked against the cloud
/// here; a bad id surfaces when the instance is dispatched to.
pub fn instances(instance_ids: &[String], region: &str) -> Result<ResourceSet> {
    if instance_ids.is_empty() {
        return Err(CrashdError::missing_argument(PROVIDER, "instance_ids"));
    }
    if region.trim().is_empty() {
        return Err(CrashdError::missing_argument(PROVIDER, "region"));
    }

    Ok(instance_ids
        .iter()
        .map(|id| ResourceDescriptor::Instance {
            instance_id: id.trim().to_string(),
            region: region.trim().to_string(),
        })
        .collect())
}
