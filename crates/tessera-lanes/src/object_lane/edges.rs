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

//! Companion objects of a primary object: polygon outlines and the
//! secondary stroke of solid lines.

use crate::materials::{build_edge_material, build_secondary_material};
use std::sync::Arc;
use tessera_core::expr::attr_f32;
use tessera_core::geometry::Geometry;
use tessera_core::technique::{Technique, TechniqueParams};
use tessera_core::tile::{
    DrawRange, MaterialCache, ObjectGeometry, ObjectKind, ObjectRole, PickingInfo, TileObject,
};
use tessera_core::{MaterializerConfig, ViewState};

/// Builds the outline object of a fill or extruded-polygon run.
///
/// Outlines draw the whole edge index buffer of the geometry, slightly above
/// the fill. Returns `None` when the geometry has no edges or the technique
/// sets a zero `lineWidth`.
#[allow(clippy::too_many_arguments)]
pub fn polygon_edge_object(
    materials: &mut MaterialCache,
    technique: &Technique,
    technique_index: usize,
    geometry: &Geometry,
    primary: &ObjectGeometry,
    primary_render_order: f64,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileObject> {
    let edges = technique.params.edges()?;
    let edge_index = geometry.edge_index.as_ref()?;
    if attr_f32(&edges.line_width, &view.eval_context()) == Some(0.0) {
        return None;
    }

    let material = materials.get_or_insert_with(technique_index, ObjectRole::Edge, || {
        build_edge_material(technique, technique_index, view, config)
    })?;

    let edge_geometry = ObjectGeometry {
        attributes: primary.attributes.clone(),
        index: Some(edge_index.clone()),
        draw_range: DrawRange {
            start: 0,
            count: edge_index.count() as u32,
        },
    };
    Some(TileObject {
        kind: ObjectKind::LineSegments,
        role: ObjectRole::Edge,
        geometry: Arc::new(edge_geometry),
        material,
        render_order: primary_render_order + config.edge_render_order_offset,
        technique_index: Some(technique_index),
        picking: PickingInfo::None,
        extrusion_group: None,
    })
}

/// Builds the secondary stroke drawn beneath a solid line.
///
/// The object shares the primary geometry. It is emitted even when its
/// width collapses to zero, so a later zoom change can widen it.
#[allow(clippy::too_many_arguments)]
pub fn secondary_stroke_object(
    materials: &mut MaterialCache,
    technique: &Technique,
    technique_index: usize,
    primary: &Arc<ObjectGeometry>,
    primary_render_order: f64,
    picking: &PickingInfo,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileObject> {
    let (TechniqueParams::SolidLine(params) | TechniqueParams::DashedLine(params)) =
        &technique.params
    else {
        return None;
    };
    params.secondary_width.as_ref()?;

    let material =
        materials.get_or_insert_with(technique_index, ObjectRole::SecondaryStroke, || {
            build_secondary_material(technique, technique_index, view, config)
        })?;

    let render_order = params
        .secondary_render_order
        .unwrap_or(primary_render_order - config.secondary_render_order_offset);
    Some(TileObject {
        kind: ObjectKind::SolidLineMesh,
        role: ObjectRole::SecondaryStroke,
        geometry: Arc::clone(primary),
        material,
        render_order,
        technique_index: Some(technique_index),
        picking: picking.clone(),
        extrusion_group: None,
    })
}
