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

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::descriptor::ResourceDescriptor;
use crate::error::Result;

/// Ordered list of resources; order is provider enumeration order and
/// determines result order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceSet(Vec<ResourceDescriptor>);

impl ResourceSet {
    pub fn new(resources: Vec<ResourceDescriptor>) -> Self {
        Self(resources)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDescriptor> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ResourceDescriptor] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ResourceDescriptor> {
        self.0
    }

    /// Concatenate another set, preserving both orders.
    pub fn extend(&mut self, other: ResourceSet) {
        self.0.extend(other.0);
    }

    /// Convert a script value holding one descriptor or a list of them.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl<'de> Deserialize<'de> for ResourceSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Many(Vec<ResourceDescriptor>),
            One(Box<ResourceDescriptor>),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Many(list) => Self(list),
            Shape::One(single) => Self(vec![*single]),
        })
    }
}

impl From<Vec<ResourceDescriptor>> for ResourceSet {
    fn from(resources: Vec<ResourceDescriptor>) -> Self {
        Self(resources)
    }
}

impl FromIterator<ResourceDescriptor> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceDescriptor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResourceSet {
    type Item = ResourceDescriptor;
    type IntoIter = std::vec::IntoIter<ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a ResourceDescriptor;
    type IntoIter = std::slice::Iter<'a, ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_descriptor_normalizes_to_list() {
        let set = ResourceSet::from_value(json!({"kind": "host", "target": "h1"})).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].target(), "h1");
        assert!(set.to_value().unwrap().is_array());
    }

    #[test]
    fn test_list_keeps_order() {
        let set = ResourceSet::from_value(json!([
            {"kind": "host", "target": "h2"},
            {"kind": "host", "target": "h1"},
            {"kind": "instance", "instance_id": "i-1", "region": "eu-west-1"},
        ]))
        .unwrap();
        let targets: Vec<_> = set.iter().map(|r| r.target()).collect();
        assert_eq!(targets, vec!["h2", "h1", "i-1"]);
    }

    #[test]
    fn test_rejects_unknown_shape() {
        assert!(ResourceSet::from_value(json!("h1")).is_err());
        assert!(ResourceSet::from_value(json!({"kind": "mainframe"})).is_err());
    }
}
