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

//! # Object Lane
//!
//! Turns the geometry groups of a decoded tile into renderable
//! [`TileObject`]s. Groups are merged into runs, each run becomes one
//! primary object plus its companions (depth pre-pass, outline, secondary
//! stroke). A run that fails to build is logged and skipped; the rest of
//! the tile still materializes.

pub mod builder;
pub mod edges;
pub mod terrain;

use crate::extrusion::{AnimatedExtrusionHandler, ExtrusionAnimationCoordinator};
use crate::group_merge::{merge_groups, MergedRun};
use crate::materials::{build_depth_prepass_material, build_primary_material};
use log::{debug, warn};
use std::sync::Arc;
use tessera_core::geometry::{BufferError, DecodedTile, Geometry};
use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind, TechniqueFilter};
use tessera_core::technique::{Technique, TechniqueParams, TerrainParams};
use tessera_core::tile::{ObjectKind, ObjectRole, PickingInfo, Tile, TileObject};
use tessera_core::{MaterializerConfig, ViewState};

/// Reasons a merged run cannot become an object.
#[derive(Debug, thiserror::Error)]
pub enum ObjectBuildError {
    /// The geometry carries no `position` attribute.
    #[error("geometry has no position attribute")]
    MissingPosition,
    /// A buffer is too short for the draw range.
    #[error(transparent)]
    Buffer(#[from] BufferError),
    /// `heightBasedColors` cannot be applied.
    #[error("invalid heightBasedColors: {0}")]
    InvalidHeightColors(String),
}

/// Outcome of an [`ObjectLane`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectReport {
    /// Objects appended to the tile.
    pub objects: usize,
    /// Merged runs visited.
    pub runs: usize,
    /// Runs dropped because they failed to build.
    pub skipped: usize,
}

struct BuildScope<'a> {
    techniques: &'a [Technique],
    view: &'a ViewState,
    config: &'a MaterializerConfig,
    extrusion: Option<&'a AnimatedExtrusionHandler>,
}

/// The lane building tile objects from geometry groups.
#[derive(Debug, Default)]
pub struct ObjectLane;

impl ObjectLane {
    /// Creates a new `ObjectLane`.
    pub fn new() -> Self {
        Self
    }

    /// Materializes every pending group of `decoded` into `tile`.
    ///
    /// Groups already created for `tile.offset` are skipped, so calling this
    /// again for the same tile instance adds nothing.
    pub fn run(
        &self,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
        view: &ViewState,
        config: &MaterializerConfig,
        filter: Option<&TechniqueFilter>,
        extrusion: Option<&AnimatedExtrusionHandler>,
    ) -> ObjectReport {
        let DecodedTile {
            techniques,
            geometries,
            states,
            ..
        } = decoded;
        let scope = BuildScope {
            techniques: techniques.as_slice(),
            view,
            config,
            extrusion,
        };

        let mut report = ObjectReport::default();
        for geometry in geometries.iter_mut() {
            let runs: Vec<MergedRun> = merge_groups(&mut geometry.groups, tile.offset, |index| {
                states.is_enabled(scope.techniques, index)
                    && filter.map_or(true, |f| {
                        scope.techniques.get(index).is_some_and(|t| f.accepts(t))
                    })
            })
            .collect();

            for run in runs {
                report.runs += 1;
                match self.build_run(tile, geometry, &run, &scope) {
                    Ok(created) => report.objects += created,
                    Err(err) => {
                        warn!(
                            "ObjectLane: tile {}: skipping run {}+{} of technique {}: {err}",
                            tile.key, run.start, run.count, run.technique_index
                        );
                        report.skipped += 1;
                    }
                }
            }
        }

        debug!(
            "ObjectLane: tile {}:{} got {} object(s) from {} run(s)",
            tile.key, tile.offset, report.objects, report.runs
        );
        report
    }

    fn build_run(
        &self,
        tile: &mut Tile,
        geometry: &Geometry,
        run: &MergedRun,
        scope: &BuildScope<'_>,
    ) -> Result<usize, ObjectBuildError> {
        let index = run.technique_index;
        let Some(technique) = scope.techniques.get(index) else {
            return Ok(0);
        };
        let Some(kind) = technique.params.object_kind() else {
            debug!(
                "ObjectLane: technique {index} ({}) has no object, run skipped",
                technique.name()
            );
            return Ok(0);
        };

        let mut object_geometry =
            builder::assemble_geometry(geometry, run, technique.params.needs_normals())?;
        if let TechniqueParams::Terrain(TerrainParams {
            height_based_colors: Some(bands),
            ..
        }) = &technique.params
        {
            let position = object_geometry
                .attribute(builder::POSITION)
                .ok_or(ObjectBuildError::MissingPosition)?;
            let colors = terrain::height_based_colors(position, bands)?;
            object_geometry.attributes.retain(|a| a.name != builder::COLOR);
            object_geometry.attributes.push(colors);
        }

        let Some(material) = tile.materials.get_or_insert_with(index, ObjectRole::Primary, || {
            build_primary_material(technique, index, scope.view, scope.config)
        }) else {
            return Ok(0);
        };
        let transparent = tile.materials.get(material).is_some_and(|m| m.transparent);
        let render_order = technique.render_order + run.render_order_offset.unwrap_or(0.0);
        let picking = builder::picking_info(technique, geometry);
        let object_geometry = Arc::new(object_geometry);

        let mut built = Vec::with_capacity(3);
        let extruded = matches!(technique.params, TechniqueParams::ExtrudedPolygon(_));
        if extruded && transparent {
            let prepass = tile.materials.get_or_insert_with(index, ObjectRole::DepthPrePass, || {
                build_depth_prepass_material(technique, index, scope.view, scope.config)
            });
            if let Some(prepass) = prepass {
                built.push(TileObject {
                    kind: ObjectKind::Mesh,
                    role: ObjectRole::DepthPrePass,
                    geometry: Arc::clone(&object_geometry),
                    material: prepass,
                    render_order,
                    technique_index: Some(index),
                    picking: PickingInfo::None,
                    extrusion_group: None,
                });
            }
        }

        built.push(TileObject {
            kind,
            role: ObjectRole::Primary,
            geometry: Arc::clone(&object_geometry),
            material,
            render_order,
            technique_index: Some(index),
            picking: picking.clone(),
            extrusion_group: None,
        });

        built.extend(edges::polygon_edge_object(
            &mut tile.materials,
            technique,
            index,
            geometry,
            &object_geometry,
            render_order,
            scope.view,
            scope.config,
        ));
        built.extend(edges::secondary_stroke_object(
            &mut tile.materials,
            technique,
            index,
            &object_geometry,
            render_order,
            &picking,
            scope.view,
            scope.config,
        ));

        let created = built.len();
        let ctx = scope.view.eval_context();
        let mut coordinator = scope.extrusion.and_then(|handler| {
            ExtrusionAnimationCoordinator::begin(tile, technique, index, handler, &ctx)
        });
        for object in built {
            if let Some(group) = coordinator.as_mut() {
                if object.role != ObjectRole::SecondaryStroke {
                    group.add(tile.objects.len(), object.material);
                }
            }
            tile.objects.push(object);
        }
        if let (Some(group), Some(handler)) = (coordinator, scope.extrusion) {
            group.finish(tile, handler);
        }
        Ok(created)
    }
}

impl Lane for ObjectLane {
    fn strategy_name(&self) -> &'static str {
        "ObjectBuilder"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Geometry
    }

    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let mut tile = ctx.remove::<Tile>().ok_or(LaneError::missing("Tile"))?;
        let Some(mut decoded) = ctx.remove::<DecodedTile>() else {
            ctx.insert(tile);
            return Err(LaneError::missing("DecodedTile"));
        };

        let result = self.run_from_context(ctx, &mut tile, &mut decoded);
        ctx.insert(tile);
        ctx.insert(decoded);
        ctx.insert(result?);
        Ok(())
    }
}

impl ObjectLane {
    fn run_from_context(
        &self,
        ctx: &LaneContext,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
    ) -> Result<ObjectReport, LaneError> {
        let view = ctx.get::<ViewState>().ok_or(LaneError::missing("ViewState"))?;
        let config = ctx
            .get::<MaterializerConfig>()
            .ok_or(LaneError::missing("MaterializerConfig"))?;
        let filter = ctx.get::<TechniqueFilter>();
        let extrusion = ctx
            .get::<Arc<AnimatedExtrusionHandler>>()
            .map(|handler| handler.as_ref());
        Ok(self.run(tile, decoded, view, config, filter, extrusion))
    }
}
