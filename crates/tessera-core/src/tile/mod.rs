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

//! # Tile Outputs
//!
//! What materialization produces: renderable [`TileObject`]s, their
//! per-technique materials and the [`TextElement`] label candidates, all
//! owned by a [`Tile`].

mod label;
mod material;

pub use self::label::{LabelAnchor, PoiInfo, TextElement, TextLayoutStyle, TextRenderStyle};
pub use self::material::{
    ExtrusionRatio, FadingParameters, LineParameters, MaterialCache, MaterialId, MaterialKind,
    TileMaterial,
};

use crate::expr::Properties;
use crate::geometry::{BufferAttribute, GeometryType, PathGeometry};
use std::fmt;
use std::sync::Arc;

/// Address of a tile in the quadtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level.
    pub level: u32,
    /// Row.
    pub row: u32,
    /// Column.
    pub column: u32,
}

impl TileKey {
    /// Creates a key.
    pub const fn new(level: u32, row: u32, column: u32) -> Self {
        Self { level, row, column }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.row, self.column)
    }
}

/// Draw primitive of a [`TileObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Point sprites.
    Points,
    /// Connected hairline strip.
    Line,
    /// Disjoint hairline segments.
    LineSegments,
    /// Triangulated wide line.
    SolidLineMesh,
    /// Triangle mesh.
    Mesh,
}

/// Why an object exists relative to its technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRole {
    /// The technique's main object.
    Primary,
    /// Polygon outline.
    Edge,
    /// Casing stroke drawn under a solid line.
    SecondaryStroke,
    /// Depth-only pass of a transparent extrusion.
    DepthPrePass,
    /// Background quad covering the tile.
    GroundPlane,
}

/// Range of the index (or vertex) buffer an object draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawRange {
    /// First element.
    pub start: u32,
    /// Element count.
    pub count: u32,
}

/// Buffers of one object; attribute storage is shared with the source geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGeometry {
    /// Named attributes.
    pub attributes: Vec<BufferAttribute>,
    /// Index buffer, if any.
    pub index: Option<BufferAttribute>,
    /// Range to draw.
    pub draw_range: DrawRange,
}

impl ObjectGeometry {
    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// What a pick on the object resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum PickingInfo {
    /// Not pickable.
    None,
    /// The whole tile.
    Tile,
    /// Individual features.
    Features {
        /// Source primitive.
        geometry_type: GeometryType,
        /// First index of every feature.
        feature_starts: Arc<[u32]>,
        /// Per-feature attributes.
        obj_infos: Option<Arc<[Properties]>>,
    },
}

/// Identity of one extrusion animation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtrusionGroupKey {
    /// Owning tile.
    pub tile: TileKey,
    /// Owning tile offset.
    pub offset: i32,
    /// Technique instance.
    pub technique_index: usize,
}

/// A renderable object.
#[derive(Debug, Clone, PartialEq)]
pub struct TileObject {
    /// Draw primitive.
    pub kind: ObjectKind,
    /// Relationship to the technique.
    pub role: ObjectRole,
    /// Buffers.
    pub geometry: Arc<ObjectGeometry>,
    /// Material in the tile's [`MaterialCache`].
    pub material: MaterialId,
    /// Resolved render order.
    pub render_order: f64,
    /// Source technique; `None` for the ground plane.
    pub technique_index: Option<usize>,
    /// Picking metadata.
    pub picking: PickingInfo,
    /// Extrusion animation membership.
    pub extrusion_group: Option<ExtrusionGroupKey>,
}

/// Everything materialized for one tile at one offset.
#[derive(Debug, Default)]
pub struct Tile {
    /// Tile address.
    pub key: TileKey,
    /// World-wrap copy index.
    pub offset: i32,
    /// Data source name.
    pub data_source: String,
    /// Edge length of the tile in world units.
    pub extent: f32,
    /// Renderable objects in emission order.
    pub objects: Vec<TileObject>,
    /// Materials referenced by `objects`.
    pub materials: MaterialCache,
    /// Label candidates, highest priority first.
    pub text_elements: Vec<TextElement>,
    /// Extrusion groups registered for this tile.
    pub extrusion_groups: Vec<ExtrusionGroupKey>,
    /// Raw feature paths, when preserved.
    pub paths: Vec<PathGeometry>,
}

impl Tile {
    /// An empty tile.
    pub fn new(key: TileKey, offset: i32) -> Self {
        Self {
            key,
            offset,
            ..Self::default()
        }
    }

    /// Sets the data source name.
    pub fn with_data_source(mut self, name: impl Into<String>) -> Self {
        self.data_source = name.into();
        self
    }

    /// Sets the world-space extent.
    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    /// Objects with the given role.
    pub fn objects_with_role(&self, role: ObjectRole) -> impl Iterator<Item = &TileObject> {
        self.objects.iter().filter(move |o| o.role == role)
    }

    /// Drops every output. Returns the extrusion groups the caller must
    /// unregister from its animation handler.
    pub fn clear(&mut self) -> Vec<ExtrusionGroupKey> {
        self.objects.clear();
        self.materials.clear();
        self.text_elements.clear();
        self.paths.clear();
        std::mem::take(&mut self.extrusion_groups)
    }
}
