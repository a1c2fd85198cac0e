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

//! Buffer assembly for merged runs.

use super::ObjectBuildError;
use crate::group_merge::MergedRun;
use tessera_core::geometry::{BufferAttribute, BufferError, Geometry};
use tessera_core::math::Vec3;
use tessera_core::technique::Technique;
use tessera_core::tile::{DrawRange, ObjectGeometry, PickingInfo};

/// Name of the vertex position attribute.
pub const POSITION: &str = "position";
/// Name of the vertex normal attribute.
pub const NORMAL: &str = "normal";
/// Name of the vertex color attribute.
pub const COLOR: &str = "color";

/// Gathers the buffers of `geometry` into an object covering `run`.
///
/// Interleaved buffers are split into strided views over the same storage.
/// Normals are computed when `needs_normals` is set and the decoder did not
/// provide them.
pub fn assemble_geometry(
    geometry: &Geometry,
    run: &MergedRun,
    needs_normals: bool,
) -> Result<ObjectGeometry, ObjectBuildError> {
    let mut attributes: Vec<BufferAttribute> = geometry.vertex_attributes.clone();
    for buffer in &geometry.interleaved_attributes {
        attributes.extend(buffer.views());
    }

    let position = attributes
        .iter()
        .find(|a| a.name == POSITION)
        .ok_or(ObjectBuildError::MissingPosition)?;

    let end = run.start as usize + run.count as usize;
    match &geometry.index {
        Some(index) => index.check_items(end)?,
        None => position.check_items(end)?,
    }

    if needs_normals && !attributes.iter().any(|a| a.name == NORMAL) {
        let normals = compute_vertex_normals(position, geometry.index.as_ref())?;
        attributes.push(BufferAttribute::from_f32(NORMAL, normals, 3));
    }

    Ok(ObjectGeometry {
        attributes,
        index: geometry.index.clone(),
        draw_range: DrawRange {
            start: run.start,
            count: run.count,
        },
    })
}

/// Area-weighted smooth normals of a triangle list.
///
/// Vertices touched by no (or only degenerate) triangles point up.
pub fn compute_vertex_normals(
    position: &BufferAttribute,
    index: Option<&BufferAttribute>,
) -> Result<Vec<f32>, BufferError> {
    let vertex_count = position.count();
    let vertex = |i: usize| -> Result<Vec3, BufferError> {
        if i >= vertex_count {
            return Err(BufferError::OutOfBounds {
                name: position.name.clone(),
                needed: i,
                available: vertex_count,
            });
        }
        Ok(Vec3::new(
            position.get(i, 0).unwrap_or(0.0),
            position.get(i, 1).unwrap_or(0.0),
            position.get(i, 2).unwrap_or(0.0),
        ))
    };

    let corners: Vec<usize> = match index {
        Some(index) => (0..index.count())
            .map(|i| index.get_index(i).unwrap_or(0) as usize)
            .collect(),
        None => (0..vertex_count).collect(),
    };

    let mut accumulated = vec![Vec3::ZERO; vertex_count];
    for triangle in corners.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        let (pa, pb, pc) = (vertex(a)?, vertex(b)?, vertex(c)?);
        // Unnormalized: the cross product length weights by face area.
        let face = (pb - pa).cross(pc - pa);
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }

    for n in &mut accumulated {
        let unit = n.normalize();
        *n = if unit == Vec3::ZERO { Vec3::Z } else { unit };
    }
    Ok(bytemuck::cast_slice::<Vec3, f32>(&accumulated).to_vec())
}

/// Picking data attached to objects built from `technique`.
pub fn picking_info(technique: &Technique, geometry: &Geometry) -> PickingInfo {
    if technique.params.uses_tile_picking() {
        return PickingInfo::Tile;
    }
    match &geometry.feature_starts {
        Some(starts) => PickingInfo::Features {
            geometry_type: geometry.geometry_type,
            feature_starts: starts.clone(),
            obj_infos: geometry.obj_infos.clone(),
        },
        None => PickingInfo::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tessera_core::geometry::{BufferData, GeometryType, InterleavedAttribute, InterleavedBuffer};
    use std::sync::Arc;

    fn run(start: u32, count: u32) -> MergedRun {
        MergedRun {
            start,
            count,
            technique_index: 0,
            render_order_offset: None,
            groups: 1,
        }
    }

    fn quad() -> Geometry {
        Geometry::new(GeometryType::Polygon)
            .with_attribute(BufferAttribute::from_f32(
                POSITION,
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                3,
            ))
            .with_index(vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn flat_quad_normals_point_up() {
        let built = assemble_geometry(&quad(), &run(0, 6), true).unwrap();
        let normal = built.attribute(NORMAL).unwrap();

        assert_eq!(normal.count(), 4);
        for i in 0..4 {
            assert_relative_eq!(normal.get(i, 2).unwrap(), 1.0);
        }
    }

    #[test]
    fn draw_range_past_index_is_rejected() {
        let err = assemble_geometry(&quad(), &run(3, 6), false).unwrap_err();
        assert!(matches!(err, ObjectBuildError::Buffer(_)));
    }

    #[test]
    fn missing_position_is_an_error() {
        let geometry = Geometry::new(GeometryType::Polygon);
        assert!(matches!(
            assemble_geometry(&geometry, &run(0, 0), false),
            Err(ObjectBuildError::MissingPosition)
        ));
    }

    #[test]
    fn interleaved_buffers_become_views() {
        // Two vertices of (x, y, z, u, v).
        let data = Arc::new(BufferData::F32(vec![
            0.0, 0.0, 0.0, 0.1, 0.2, //
            1.0, 0.0, 0.0, 0.3, 0.4,
        ]));
        let geometry = Geometry::new(GeometryType::Line).with_interleaved(InterleavedBuffer {
            data,
            stride: 5,
            attributes: vec![
                InterleavedAttribute {
                    name: POSITION.into(),
                    item_size: 3,
                    offset: 0,
                },
                InterleavedAttribute {
                    name: "uv".into(),
                    item_size: 2,
                    offset: 3,
                },
            ],
        });

        let built = assemble_geometry(&geometry, &run(0, 2), false).unwrap();
        let uv = built.attribute("uv").unwrap();
        assert_eq!(uv.count(), 2);
        assert_eq!(uv.get(1, 1), Some(0.4));
        assert!(built.index.is_none());
    }

    #[test]
    fn larger_faces_dominate_shared_normals() {
        // A big horizontal triangle and a small vertical one share vertex 0.
        let position = BufferAttribute::from_f32(
            POSITION,
            vec![
                0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0, //
                0.0, 0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.1,
            ],
            3,
        );
        let index = BufferAttribute::index(vec![0, 1, 2, 0, 4, 5]);
        let normals = compute_vertex_normals(&position, Some(&index)).unwrap();
        assert!(normals[2] > 0.99);
    }
}
