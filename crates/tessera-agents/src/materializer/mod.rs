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

//! # Tile Materializer
//!
//! The agent turning decoded tiles into renderable tiles. It owns the lanes
//! and the per-engine state they share (style cache, extrusion animations),
//! and runs them over a [`LaneContext`] assembled for each call.

mod ground;

use log::{debug, info, trace};
use std::sync::Arc;
use tessera_core::geometry::DecodedTile;
use tessera_core::lane::{KindFilterSets, Lane, LaneContext, LaneError, TechniqueFilter};
use tessera_core::technique::GeometryKindSet;
use tessera_core::tile::{ObjectRole, Tile};
use tessera_core::{MaterializerConfig, ViewState};
use tessera_lanes::materials::build_ground_material;
use tessera_lanes::{
    AnimatedExtrusionHandler, KindFilterLane, MaterialRefreshLane, ObjectLane, ObjectReport,
    RefreshReport, TextLane, TextReport,
};

/// Outcome of [`TileMaterializer::create_all_geometries`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Geometry pass results.
    pub objects: ObjectReport,
    /// Label pass results.
    pub text: TextReport,
    /// Whether a ground plane was added.
    pub ground_plane: bool,
}

/// Builds renderable objects and label candidates for tiles.
#[derive(Debug)]
pub struct TileMaterializer {
    config: MaterializerConfig,
    kind_filter: KindFilterLane,
    objects: ObjectLane,
    text: TextLane,
    refresh: MaterialRefreshLane,
    extrusion: Arc<AnimatedExtrusionHandler>,
    filter: Option<TechniqueFilter>,
}

impl TileMaterializer {
    /// Creates a materializer with its own extrusion animation handler.
    pub fn new(config: MaterializerConfig) -> Self {
        let extrusion = Arc::new(AnimatedExtrusionHandler::from_config(&config));
        info!(
            "TileMaterializer: created (ground plane: {}, animated extrusion: {})",
            config.add_ground_plane, config.animate_extrusion
        );
        Self {
            config,
            kind_filter: KindFilterLane::new(),
            objects: ObjectLane::new(),
            text: TextLane::new(),
            refresh: MaterialRefreshLane::new(),
            extrusion,
            filter: None,
        }
    }

    /// Shares an extrusion handler driven by the caller's frame loop.
    pub fn with_extrusion_handler(mut self, handler: Arc<AnimatedExtrusionHandler>) -> Self {
        self.extrusion = handler;
        self
    }

    /// Installs a predicate applied to every technique before building.
    pub fn with_technique_filter(mut self, filter: TechniqueFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    /// The handler animating extruded buildings.
    pub fn extrusion_handler(&self) -> &Arc<AnimatedExtrusionHandler> {
        &self.extrusion
    }

    /// The label style cache, shared by every tile.
    pub fn text_lane(&self) -> &TextLane {
        &self.text
    }

    /// Resolves which techniques are enabled for a freshly decoded tile and
    /// resets its build bookkeeping.
    pub fn init_decoded_tile(
        &self,
        decoded: &mut DecodedTile,
        allow: Option<&GeometryKindSet>,
        deny: Option<&GeometryKindSet>,
    ) -> Result<(), LaneError> {
        let mut ctx = LaneContext::new();
        ctx.insert(std::mem::take(decoded));
        ctx.insert(KindFilterSets {
            allow: allow.cloned(),
            deny: deny.cloned(),
        });

        let result = self.kind_filter.execute(&mut ctx);
        if let Some(back) = ctx.remove::<DecodedTile>() {
            *decoded = back;
        }
        result
    }

    /// Builds every object and label candidate of `decoded` into `tile`.
    ///
    /// Calling it again for the same tile and offset adds nothing new.
    pub fn create_all_geometries(
        &self,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
        view: &ViewState,
    ) -> Result<MaterializeReport, LaneError> {
        let mut report = MaterializeReport::default();
        let has_ground = tile.objects_with_role(ObjectRole::GroundPlane).next().is_some();
        if self.config.add_ground_plane && !has_ground {
            let material = tile.materials.add(build_ground_material(&self.config));
            let ground = ground::ground_plane_object(tile, material);
            tile.objects.insert(0, ground);
            report.ground_plane = true;
        }

        let mut ctx = self.context(tile, decoded, view);
        let lanes: [&dyn Lane; 2] = [&self.objects, &self.text];
        let result = run_lanes(&lanes, &mut ctx);
        restore(&mut ctx, tile, decoded);
        result?;

        report.objects = ctx.remove::<ObjectReport>().unwrap_or_default();
        report.text = ctx.remove::<TextReport>().unwrap_or_default();

        if self.config.preserve_tile_paths && tile.paths.is_empty() {
            if let Some(paths) = &decoded.path_geometries {
                tile.paths = paths.clone();
            }
        }

        debug!(
            "TileMaterializer: tile {} (offset {}) gained {} object(s) and {} label(s)",
            tile.key, tile.offset, report.objects.objects, report.text.elements
        );
        Ok(report)
    }

    /// Re-evaluates the tile's materials for a new view.
    pub fn refresh_materials(
        &self,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
        view: &ViewState,
    ) -> Result<RefreshReport, LaneError> {
        let mut ctx = self.context(tile, decoded, view);
        let result = self.refresh.execute(&mut ctx);
        restore(&mut ctx, tile, decoded);
        result?;
        Ok(ctx.remove::<RefreshReport>().unwrap_or_default())
    }

    /// Empties `tile` and stops its extrusion animations. Returns how many
    /// animation groups were released.
    pub fn dispose_tile(&self, tile: &mut Tile) -> usize {
        let groups = tile.clear();
        let removed = self.extrusion.remove_groups(&groups);
        trace!("TileMaterializer: tile {} disposed, {} animation(s) released", tile.key, removed);
        removed
    }

    fn context(&self, tile: &mut Tile, decoded: &mut DecodedTile, view: &ViewState) -> LaneContext {
        let mut ctx = LaneContext::new();
        ctx.insert(std::mem::take(tile));
        ctx.insert(std::mem::take(decoded));
        ctx.insert(view.clone());
        ctx.insert(self.config.clone());
        ctx.insert(Arc::clone(&self.extrusion));
        if let Some(filter) = &self.filter {
            ctx.insert(filter.clone());
        }
        ctx
    }
}

fn run_lanes(lanes: &[&dyn Lane], ctx: &mut LaneContext) -> Result<(), LaneError> {
    for lane in lanes {
        trace!("TileMaterializer: running {} ({})", lane.strategy_name(), lane.lane_kind());
        lane.execute(ctx)?;
    }
    Ok(())
}

fn restore(ctx: &mut LaneContext, tile: &mut Tile, decoded: &mut DecodedTile) {
    if let Some(back) = ctx.remove::<Tile>() {
        *tile = back;
    }
    if let Some(back) = ctx.remove::<DecodedTile>() {
        *decoded = back;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_view_is_reported_and_inputs_survive() {
        let materializer = TileMaterializer::new(MaterializerConfig::default());
        let mut ctx = LaneContext::new();
        ctx.insert(Tile::default());
        ctx.insert(DecodedTile::default());

        let lanes: [&dyn Lane; 1] = [&materializer.objects];

        let err = run_lanes(&lanes, &mut ctx).unwrap_err();

        assert!(matches!(
            err,
            LaneError::InvalidContext { expected: "ViewState", .. }
        ));
        assert!(ctx.contains::<Tile>());
        assert!(ctx.contains::<DecodedTile>());
    }

    #[test]
    fn ground_plane_is_added_once() {
        let config = MaterializerConfig {
            add_ground_plane: true,
            ..Default::default()
        };
        let materializer = TileMaterializer::new(config);
        let mut tile = Tile::default().with_extent(2.0);
        let mut decoded = DecodedTile::default();
        let view = ViewState::default();

        let first = materializer.create_all_geometries(&mut tile, &mut decoded, &view).unwrap();
        let second = materializer.create_all_geometries(&mut tile, &mut decoded, &view).unwrap();

        assert!(first.ground_plane);
        assert!(!second.ground_plane);
        assert_eq!(tile.objects.len(), 1);
        assert_eq!(tile.objects[0].render_order, f64::MIN);
    }
}
