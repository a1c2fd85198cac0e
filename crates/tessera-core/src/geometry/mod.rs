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

//! # Decoded Geometry
//!
//! The input side of materialization: attribute buffers, draw groups tagged
//! with technique indices, and the label geometries shipped alongside them.

mod buffer;
mod decoded;
mod text;

pub use self::buffer::{
    BufferAttribute, BufferData, BufferElementType, BufferError, InterleavedAttribute,
    InterleavedBuffer,
};
pub use self::decoded::{DecodedTile, TechniqueStates};
pub use self::text::{PathGeometry, PoiGeometry, TextGeometry, TextPathGeometry};

use crate::expr::Properties;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Source primitive of a geometry, kept for picking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// Unknown.
    #[default]
    Unspecified,
    /// Points.
    Point,
    /// Hairlines.
    Line,
    /// Wide lines.
    SolidLine,
    /// Point labels.
    Text,
    /// Path labels.
    TextPath,
    /// Extruded lines.
    ExtrudedLine,
    /// Flat polygons.
    Polygon,
    /// Extruded polygons.
    ExtrudedPolygon,
    /// Arbitrary meshes.
    Object3D,
}

/// A contiguous index range drawn with one technique.
///
/// `created_offsets` records the tile offsets that already materialized the
/// group; a `(group, offset)` pair produces geometry at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    /// First index (or vertex, for non-indexed geometry).
    pub start: u32,
    /// Number of indices (or vertices).
    pub count: u32,
    /// Index into [`DecodedTile::techniques`].
    pub technique_index: usize,
    /// Added to the technique's render order.
    pub render_order_offset: Option<f64>,
    /// Tile offsets already materialized in this generation.
    pub created_offsets: BTreeSet<i32>,
}

impl Group {
    /// Creates a group with no offset materialized.
    pub fn new(start: u32, count: u32, technique_index: usize) -> Self {
        Self {
            start,
            count,
            technique_index,
            ..Self::default()
        }
    }

    /// Sets the render order offset.
    pub fn with_render_order_offset(mut self, offset: f64) -> Self {
        self.render_order_offset = Some(offset);
        self
    }

    /// One past the last element of the range.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.count)
    }
}

/// One attribute-buffer set with its index buffers and draw groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Source primitive.
    pub geometry_type: GeometryType,
    /// Tightly packed attributes.
    pub vertex_attributes: Vec<BufferAttribute>,
    /// Interleaved attribute buffers.
    pub interleaved_attributes: Vec<InterleavedBuffer>,
    /// Triangle or line index buffer.
    pub index: Option<BufferAttribute>,
    /// Outline line-segment indices.
    pub edge_index: Option<BufferAttribute>,
    /// Draw groups in emission order.
    pub groups: Vec<Group>,
    /// First index of every feature, for picking.
    pub feature_starts: Option<Arc<[u32]>>,
    /// Opaque per-feature attributes, for picking.
    pub obj_infos: Option<Arc<[Properties]>>,
}

impl Geometry {
    /// An empty geometry of the given type.
    pub fn new(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type,
            ..Self::default()
        }
    }

    /// Adds a tightly packed attribute.
    pub fn with_attribute(mut self, attribute: BufferAttribute) -> Self {
        self.vertex_attributes.push(attribute);
        self
    }

    /// Adds an interleaved buffer.
    pub fn with_interleaved(mut self, buffer: InterleavedBuffer) -> Self {
        self.interleaved_attributes.push(buffer);
        self
    }

    /// Sets the index buffer.
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(BufferAttribute::index(index));
        self
    }

    /// Sets the outline index buffer.
    pub fn with_edge_index(mut self, edge_index: Vec<u32>) -> Self {
        self.edge_index = Some(BufferAttribute::new(
            "edgeIndex",
            BufferData::U32(edge_index),
            1,
        ));
        self
    }

    /// Appends a draw group.
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Looks up a tightly packed attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.vertex_attributes.iter().find(|a| a.name == name)
    }
}
