// Copyright 2025 eraflo
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

//! Kind tags attached to techniques and the sets used to filter them.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;

/// The classification tags of a technique (`"building"`, `["road", "bridge"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindTags(Vec<String>);

impl KindTags {
    /// Creates tags from any list of names. Empty names are dropped.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            tags.into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        )
    }

    /// `true` when no tag resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the tags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for KindTags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
            Nothing(()),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(tag) => KindTags::new([tag]),
            Raw::Many(tags) => KindTags::new(tags),
            Raw::Nothing(()) => KindTags::default(),
        })
    }
}

/// A set of kind names used as an allow- or deny-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryKindSet(BTreeSet<String>);

impl GeometryKindSet {
    /// Builds a set from kind names.
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(kinds.into_iter().map(Into::into).collect())
    }

    /// `true` if any of `tags` is a member of the set.
    ///
    /// ```
    /// use tessera_core::technique::{GeometryKindSet, KindTags};
    /// let set = GeometryKindSet::new(["building"]);
    /// assert!(set.has_or_intersects(&KindTags::new(["road", "building"])));
    /// assert!(!set.has_or_intersects(&KindTags::new(["road"])));
    /// ```
    pub fn has_or_intersects(&self, tags: &KindTags) -> bool {
        tags.iter().any(|tag| self.0.contains(tag))
    }

    /// Number of kinds in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the set holds no kind.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_deserialize_from_string_or_array() {
        let one: KindTags = serde_json::from_str(r#""water""#).unwrap();
        let many: KindTags = serde_json::from_str(r#"["road", "tunnel"]"#).unwrap();
        let none: KindTags = serde_json::from_str("null").unwrap();
        assert_eq!(one, KindTags::new(["water"]));
        assert_eq!(many.iter().count(), 2);
        assert!(none.is_empty());
    }

    #[test]
    fn empty_tag_names_are_ignored() {
        assert!(KindTags::new([""]).is_empty());
    }
}
