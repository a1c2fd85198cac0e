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

use std::sync::Arc;
use tessera_core::geometry::BufferAttribute;
use tessera_core::tile::{
    DrawRange, MaterialId, ObjectGeometry, ObjectKind, ObjectRole, PickingInfo, Tile, TileObject,
};

/// Quad covering the tile's extent, facing up.
pub(crate) fn ground_plane_geometry(extent: f32) -> ObjectGeometry {
    let h = extent * 0.5;
    #[rustfmt::skip]
    let position = vec![
        -h, -h, 0.0,
         h, -h, 0.0,
         h,  h, 0.0,
        -h,  h, 0.0,
    ];
    let normal = [0.0, 0.0, 1.0].repeat(4);
    ObjectGeometry {
        attributes: vec![
            BufferAttribute::from_f32("position", position, 3),
            BufferAttribute::from_f32("normal", normal, 3),
        ],
        index: Some(BufferAttribute::index(vec![0, 1, 2, 0, 2, 3])),
        draw_range: DrawRange { start: 0, count: 6 },
    }
}

/// Ground object drawn beneath everything else of `tile`.
pub(crate) fn ground_plane_object(tile: &Tile, material: MaterialId) -> TileObject {
    TileObject {
        kind: ObjectKind::Mesh,
        role: ObjectRole::GroundPlane,
        geometry: Arc::new(ground_plane_geometry(tile.extent)),
        material,
        render_order: f64::MIN,
        technique_index: None,
        picking: PickingInfo::Tile,
        extrusion_group: None,
    }
}
