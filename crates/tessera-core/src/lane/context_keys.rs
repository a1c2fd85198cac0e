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

//! Context key types for [`LaneContext`](super::LaneContext).
//!
//! Agents insert these newtypes and lanes extract them. Owned tile data
//! (`DecodedTile`, `Tile`, `ViewState`, `MaterializerConfig`) is inserted
//! directly under its own type.
//!
//! | Key                 | Meaning                                         |
//! |---------------------|-------------------------------------------------|
//! | [`KindFilterSets`]  | Allow/deny kind sets of the current tile pass    |
//! | [`TechniqueFilter`] | Caller predicate rejecting techniques            |

use crate::technique::{GeometryKindSet, Technique};
use std::fmt;
use std::sync::Arc;

/// Allow- and deny-lists applied by the kind filter.
#[derive(Debug, Clone, Default)]
pub struct KindFilterSets {
    /// Kinds explicitly enabled.
    pub allow: Option<GeometryKindSet>,
    /// Kinds explicitly disabled.
    pub deny: Option<GeometryKindSet>,
}

/// Caller-supplied predicate; techniques it rejects produce nothing.
#[derive(Clone)]
pub struct TechniqueFilter(pub Arc<dyn Fn(&Technique) -> bool + Send + Sync>);

impl TechniqueFilter {
    /// Wraps a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Technique) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Applies the predicate.
    pub fn accepts(&self, technique: &Technique) -> bool {
        (self.0)(technique)
    }
}

impl fmt::Debug for TechniqueFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TechniqueFilter(..)")
    }
}
