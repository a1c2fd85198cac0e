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

//! Per-tile materials.

use super::ObjectRole;
use crate::math::LinearRgba;
use crate::technique::LineCaps;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Handle to a material inside a [`MaterialCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

/// Shader family of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Point sprites.
    Points,
    /// Hairlines.
    Line,
    /// Wide lines.
    SolidLine,
    /// Unlit mesh.
    Basic,
    /// Lit mesh.
    Standard,
    /// Polygon outline.
    Edge,
    /// Depth-only.
    DepthPrePass,
    /// Custom shader.
    Shader,
}

/// Distances over which an object fades out. Negative values disable fading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadingParameters {
    /// Fade start.
    pub fade_near: f32,
    /// Fade end.
    pub fade_far: f32,
}

impl FadingParameters {
    /// No fading.
    pub const DISABLED: Self = Self {
        fade_near: -1.0,
        fade_far: -1.0,
    };

    /// `true` when the range describes an actual fade.
    pub fn is_enabled(&self) -> bool {
        self.fade_near >= 0.0 && self.fade_far > self.fade_near
    }
}

impl Default for FadingParameters {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Shader parameters of wide lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParameters {
    /// Stroke width in world units.
    pub width: f32,
    /// Outline width in world units.
    pub outline_width: f32,
    /// Outline color.
    pub outline_color: Option<LinearRgba>,
    /// Caps.
    pub caps: LineCaps,
    /// Dash length, for dashed lines.
    pub dash_size: Option<f32>,
    /// Gap length, for dashed lines.
    pub gap_size: Option<f32>,
}

impl Default for LineParameters {
    fn default() -> Self {
        Self {
            width: 1.0,
            outline_width: 0.0,
            outline_color: None,
            caps: LineCaps::Round,
            dash_size: None,
            gap_size: None,
        }
    }
}

/// Extrusion progress in `[0, 1]`, shared by every material of one
/// animation group.
#[derive(Clone)]
pub struct ExtrusionRatio(Arc<AtomicU32>);

impl ExtrusionRatio {
    /// Creates a ratio starting at `value`.
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    /// Current ratio.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Stores a new ratio, clamped to `[0, 1]`.
    pub fn set(&self, value: f32) {
        self.0
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// `true` if both handles drive the same ratio.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ExtrusionRatio {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for ExtrusionRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExtrusionRatio").field(&self.get()).finish()
    }
}

/// Render state resolved from a technique at one view state.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMaterial {
    /// Shader family.
    pub kind: MaterialKind,
    /// Role of the objects using it.
    pub role: ObjectRole,
    /// Source technique; `None` for the ground plane.
    pub technique_index: Option<usize>,
    /// Base color.
    pub color: LinearRgba,
    /// Opacity.
    pub opacity: f32,
    /// Blending enabled.
    pub transparent: bool,
    /// Reads the per-vertex `color` attribute.
    pub vertex_colors: bool,
    /// Writes depth.
    pub depth_write: bool,
    /// Writes color.
    pub color_write: bool,
    /// Fade range.
    pub fading: FadingParameters,
    /// Wide-line parameters.
    pub line: Option<LineParameters>,
    /// Point sprite size.
    pub point_size: Option<f32>,
    /// Fill color share of outlines.
    pub edge_color_mix: Option<f32>,
    /// Roughness of lit meshes.
    pub roughness: Option<f32>,
    /// Metalness of lit meshes.
    pub metalness: Option<f32>,
    /// Emissive color of lit meshes.
    pub emissive: Option<LinearRgba>,
    /// Shared extrusion progress, for animated extrusions.
    pub extrusion: Option<ExtrusionRatio>,
}

impl TileMaterial {
    /// An opaque white material.
    pub fn new(kind: MaterialKind, role: ObjectRole, technique_index: Option<usize>) -> Self {
        Self {
            kind,
            role,
            technique_index,
            color: LinearRgba::WHITE,
            opacity: 1.0,
            transparent: false,
            vertex_colors: false,
            depth_write: true,
            color_write: true,
            fading: FadingParameters::DISABLED,
            line: None,
            point_size: None,
            edge_color_mix: None,
            roughness: None,
            metalness: None,
            emissive: None,
            extrusion: None,
        }
    }
}

/// One material per technique and role per tile.
///
/// The primary material of a technique is shared by every object built from
/// it; outlines, secondary strokes and depth pre-passes get their own entry.
/// Untracked materials (the ground plane) are stored with [`add`](Self::add).
#[derive(Debug, Default)]
pub struct MaterialCache {
    materials: Vec<TileMaterial>,
    by_technique: HashMap<(usize, ObjectRole), MaterialId>,
}

impl MaterialCache {
    /// The primary material of a technique, if created.
    pub fn primary(&self, technique_index: usize) -> Option<MaterialId> {
        self.lookup(technique_index, ObjectRole::Primary)
    }

    /// The material of a technique for `role`, if created.
    pub fn lookup(&self, technique_index: usize, role: ObjectRole) -> Option<MaterialId> {
        self.by_technique.get(&(technique_index, role)).copied()
    }

    /// Returns the technique's material for `role`, creating it with
    /// `create` on first use. `create` returning `None` caches nothing.
    pub fn get_or_insert_with<F>(
        &mut self,
        technique_index: usize,
        role: ObjectRole,
        create: F,
    ) -> Option<MaterialId>
    where
        F: FnOnce() -> Option<TileMaterial>,
    {
        if let Some(id) = self.lookup(technique_index, role) {
            return Some(id);
        }
        let id = self.add(create()?);
        self.by_technique.insert((technique_index, role), id);
        Some(id)
    }

    /// Stores a material not tied to a technique.
    pub fn add(&mut self, material: TileMaterial) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Reads a material.
    pub fn get(&self, id: MaterialId) -> Option<&TileMaterial> {
        self.materials.get(id.0)
    }

    /// Mutates a material in place.
    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut TileMaterial> {
        self.materials.get_mut(id.0)
    }

    /// Iterates mutably over every material.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MaterialId, &mut TileMaterial)> {
        self.materials
            .iter_mut()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }

    /// Iterates over every material.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &TileMaterial)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// `true` when no material exists.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Drops every material.
    pub fn clear(&mut self) {
        self.materials.clear();
        self.by_technique.clear();
    }
}
