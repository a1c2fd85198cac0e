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

use super::{Geometry, PathGeometry, PoiGeometry, TextGeometry, TextPathGeometry};
use crate::technique::Technique;
use std::collections::BTreeSet;

/// Flags computed for one decoded-tile generation, indexed like the techniques.
///
/// Kept apart from the technique records so that tiles sharing a technique
/// catalog never observe each other's filter results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechniqueStates {
    /// `None` until the kind filter resolved the technique.
    pub enabled: Vec<Option<bool>>,
    /// Tile offsets whose labels were already extracted.
    pub text_offsets: BTreeSet<i32>,
}

impl TechniqueStates {
    /// Whether technique `index` of `techniques` may produce output.
    ///
    /// Unresolved techniques fall back to their static override, then to
    /// enabled. Out-of-range indices are never enabled.
    pub fn is_enabled(&self, techniques: &[Technique], index: usize) -> bool {
        let Some(technique) = techniques.get(index) else {
            return false;
        };
        self.enabled
            .get(index)
            .copied()
            .flatten()
            .or(technique.enabled)
            .unwrap_or(true)
    }
}

/// The decoder's output, consumed by the materializer.
#[derive(Debug, Clone, Default)]
pub struct DecodedTile {
    /// Technique catalog referenced by index.
    pub techniques: Vec<Technique>,
    /// Mesh and line geometries.
    pub geometries: Vec<Geometry>,
    /// Point labels.
    pub text_geometries: Option<Vec<TextGeometry>>,
    /// Path labels.
    pub text_path_geometries: Option<Vec<TextPathGeometry>>,
    /// Icons and line markers.
    pub poi_geometries: Option<Vec<PoiGeometry>>,
    /// Raw feature paths.
    pub path_geometries: Option<Vec<PathGeometry>>,
    /// Per-generation flags.
    pub states: TechniqueStates,
}

impl DecodedTile {
    /// A decoded tile with mesh geometries only.
    pub fn new(techniques: Vec<Technique>, geometries: Vec<Geometry>) -> Self {
        Self {
            techniques,
            geometries,
            ..Self::default()
        }
    }

    /// Whether technique `index` may produce output.
    pub fn technique_enabled(&self, index: usize) -> bool {
        self.states.is_enabled(&self.techniques, index)
    }

    /// Forgets which tile offsets were materialized.
    pub fn reset_created_offsets(&mut self) {
        for geometry in &mut self.geometries {
            for group in &mut geometry.groups {
                group.created_offsets.clear();
            }
        }
        self.states.text_offsets.clear();
    }

    /// Total number of draw groups across all geometries.
    pub fn group_count(&self) -> usize {
        self.geometries.iter().map(|g| g.groups.len()).sum()
    }
}
