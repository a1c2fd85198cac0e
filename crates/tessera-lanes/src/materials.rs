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

//! Material construction from techniques, and the refresh lane that
//! re-evaluates them when the view changes.

use crate::fading::{fading_parameters, polygon_fading_parameters};
use log::{debug, trace};
use tessera_core::expr::{attr_color, attr_f32, EvalContext};
use tessera_core::geometry::DecodedTile;
use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::math::{saturate, LinearRgba};
use tessera_core::technique::{
    MetricUnit, Shading, SolidLineParams, Technique, TechniqueParams,
};
use tessera_core::tile::{
    FadingParameters, LineParameters, MaterialKind, ObjectRole, Tile, TileMaterial,
};
use tessera_core::{MaterializerConfig, ViewState};

/// Builds the primary material of technique `index`.
///
/// Returns `None` for label techniques, which have no renderable object.
pub fn build_primary_material(
    technique: &Technique,
    index: usize,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileMaterial> {
    let ctx = view.eval_context();
    let params = &technique.params;
    let kind = match params {
        TechniqueParams::Squares(_) | TechniqueParams::Circles(_) => MaterialKind::Points,
        TechniqueParams::Line(_) | TechniqueParams::Segments(_) => MaterialKind::Line,
        TechniqueParams::SolidLine(_) | TechniqueParams::DashedLine(_) => MaterialKind::SolidLine,
        TechniqueParams::Fill(_) => MaterialKind::Basic,
        TechniqueParams::Standard(_)
        | TechniqueParams::Terrain(_)
        | TechniqueParams::ExtrudedPolygon(_) => MaterialKind::Standard,
        TechniqueParams::ExtrudedLine(p) => match p.shading {
            Shading::Basic => MaterialKind::Basic,
            Shading::Standard => MaterialKind::Standard,
        },
        TechniqueParams::Shader(_) => MaterialKind::Shader,
        TechniqueParams::Text(_)
        | TechniqueParams::LabeledIcon(_)
        | TechniqueParams::LineMarker(_) => return None,
    };

    let mut material = TileMaterial::new(kind, ObjectRole::Primary, Some(index));
    material.color = params
        .color()
        .and_then(|attr| attr.eval_color(&ctx))
        .unwrap_or(LinearRgba::WHITE);
    material.opacity = saturate(
        params
            .opacity()
            .and_then(|attr| attr.eval_f32(&ctx))
            .unwrap_or(1.0),
    );
    material.transparent = params.transparent().unwrap_or(false) || material.opacity < 1.0;
    material.fading = fading_parameters(technique, &ctx, config);

    match params {
        TechniqueParams::Squares(p) | TechniqueParams::Circles(p) => {
            material.point_size = Some(attr_f32(&p.size, &ctx).unwrap_or(1.0));
        }
        TechniqueParams::Line(p) | TechniqueParams::Segments(p) => {
            material.line = Some(LineParameters {
                width: attr_f32(&p.line_width, &ctx).unwrap_or(1.0),
                ..LineParameters::default()
            });
        }
        TechniqueParams::SolidLine(p) | TechniqueParams::DashedLine(p) => {
            let dashed = matches!(params, TechniqueParams::DashedLine(_));
            material.line = Some(solid_line_parameters(p, dashed, view, &ctx));
        }
        TechniqueParams::Standard(p) => {
            material.roughness = attr_f32(&p.roughness, &ctx);
            material.metalness = attr_f32(&p.metalness, &ctx);
            material.emissive = attr_color(&p.emissive, &ctx);
        }
        TechniqueParams::Terrain(p) => {
            material.roughness = attr_f32(&p.standard.roughness, &ctx);
            material.metalness = attr_f32(&p.standard.metalness, &ctx);
            material.emissive = attr_color(&p.standard.emissive, &ctx);
            material.vertex_colors = p.height_based_colors.is_some();
        }
        TechniqueParams::ExtrudedPolygon(p) => {
            material.roughness = attr_f32(&p.roughness, &ctx);
            material.emissive = attr_color(&p.emissive, &ctx);
        }
        _ => {}
    }
    Some(material)
}

/// Width scale of a line technique: pixel widths follow the view.
fn unit_scale(unit: MetricUnit, view: &ViewState) -> f32 {
    match unit {
        MetricUnit::Meter => 1.0,
        MetricUnit::Pixel => view.pixel_to_world,
    }
}

fn solid_line_parameters(
    params: &SolidLineParams,
    dashed: bool,
    view: &ViewState,
    ctx: &EvalContext<'_>,
) -> LineParameters {
    let scale = unit_scale(params.metric_unit, view);
    let (dash_size, gap_size) = if dashed {
        (
            Some(attr_f32(&params.dash_size, ctx).unwrap_or(1.0) * scale),
            Some(attr_f32(&params.gap_size, ctx).unwrap_or(1.0) * scale),
        )
    } else {
        (None, None)
    };
    LineParameters {
        width: attr_f32(&params.line_width, ctx).unwrap_or(1.0) * scale,
        outline_width: attr_f32(&params.outline_width, ctx).unwrap_or(0.0) * scale,
        outline_color: attr_color(&params.outline_color, ctx),
        caps: params.caps,
        dash_size,
        gap_size,
    }
}

/// Width of the secondary stroke drawn below a solid line.
///
/// A secondary stroke no wider than an opaque primary line would be hidden
/// completely, so it collapses to zero.
///
/// ```
/// use tessera_lanes::materials::secondary_stroke_width;
/// assert_eq!(secondary_stroke_width(4.0, 3.0, None), 0.0);
/// assert_eq!(secondary_stroke_width(4.0, 3.0, Some(0.5)), 3.0);
/// assert_eq!(secondary_stroke_width(4.0, 6.0, None), 6.0);
/// ```
pub fn secondary_stroke_width(primary: f32, secondary: f32, opacity: Option<f32>) -> f32 {
    let opaque = opacity.map_or(true, |o| o >= 1.0);
    if secondary <= primary && opaque {
        0.0
    } else {
        secondary
    }
}

/// Builds the secondary-stroke material of a solid-line technique.
///
/// Returns `None` when the technique has no `secondaryWidth`.
pub fn build_secondary_material(
    technique: &Technique,
    index: usize,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileMaterial> {
    let (TechniqueParams::SolidLine(params) | TechniqueParams::DashedLine(params)) =
        &technique.params
    else {
        return None;
    };
    let ctx = view.eval_context();
    let secondary = attr_f32(&params.secondary_width, &ctx)?;
    let primary_width = attr_f32(&params.line_width, &ctx).unwrap_or(1.0);
    let opacity = attr_f32(&params.opacity, &ctx);
    let scale = unit_scale(params.metric_unit, view);

    let mut material = build_primary_material(technique, index, view, config)?;
    material.role = ObjectRole::SecondaryStroke;
    if let Some(color) = attr_color(&params.secondary_color, &ctx) {
        material.color = color;
    }
    material.line = Some(LineParameters {
        width: secondary_stroke_width(primary_width, secondary, opacity) * scale,
        outline_width: 0.0,
        outline_color: None,
        caps: params.secondary_caps.unwrap_or(params.caps),
        dash_size: None,
        gap_size: None,
    });
    Some(material)
}

/// Builds the outline material of a polygon technique.
pub fn build_edge_material(
    technique: &Technique,
    index: usize,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileMaterial> {
    let edges = technique.params.edges()?;
    let ctx = view.eval_context();
    let polygon = polygon_fading_parameters(technique, &ctx, config);

    let mut material = TileMaterial::new(MaterialKind::Edge, ObjectRole::Edge, Some(index));
    material.color = polygon.color;
    material.edge_color_mix = Some(polygon.color_mix);
    material.fading = polygon.line_fading;
    material.line = Some(LineParameters {
        width: attr_f32(&edges.line_width, &ctx).unwrap_or(1.0),
        ..LineParameters::default()
    });
    Some(material)
}

/// Builds the depth-only material drawn before a transparent extruded mesh.
pub fn build_depth_prepass_material(
    technique: &Technique,
    index: usize,
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileMaterial> {
    technique.params.object_kind()?;
    let mut material =
        TileMaterial::new(MaterialKind::DepthPrePass, ObjectRole::DepthPrePass, Some(index));
    material.color_write = false;
    material.depth_write = true;
    material.fading = fading_parameters(technique, &view.eval_context(), config);
    Some(material)
}

/// Builds the flat ground-plane material.
pub fn build_ground_material(config: &MaterializerConfig) -> TileMaterial {
    let mut material = TileMaterial::new(MaterialKind::Basic, ObjectRole::GroundPlane, None);
    material.color = config.ground_plane_color();
    material.fading = FadingParameters::DISABLED;
    material
}

/// Rebuilds a material for its role from the current view.
///
/// Ground-plane and technique-less materials are static and yield `None`.
pub fn rebuild_material(
    material: &TileMaterial,
    techniques: &[Technique],
    view: &ViewState,
    config: &MaterializerConfig,
) -> Option<TileMaterial> {
    let index = material.technique_index?;
    let technique = techniques.get(index)?;
    let mut rebuilt = match material.role {
        ObjectRole::Primary => build_primary_material(technique, index, view, config),
        ObjectRole::Edge => build_edge_material(technique, index, view, config),
        ObjectRole::SecondaryStroke => build_secondary_material(technique, index, view, config),
        ObjectRole::DepthPrePass => build_depth_prepass_material(technique, index, view, config),
        ObjectRole::GroundPlane => None,
    }?;
    rebuilt.extrusion = material.extrusion.clone();
    Some(rebuilt)
}

/// Outcome of a [`MaterialRefreshLane`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Materials whose parameters changed.
    pub changed: usize,
}

/// Lane re-evaluating every material of a tile for the current view.
#[derive(Debug, Default)]
pub struct MaterialRefreshLane;

impl MaterialRefreshLane {
    /// Creates a new `MaterialRefreshLane`.
    pub fn new() -> Self {
        Self
    }

    /// Re-evaluates zoom-dependent parameters in place.
    pub fn refresh(
        &self,
        tile: &mut Tile,
        techniques: &[Technique],
        view: &ViewState,
        config: &MaterializerConfig,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        for (id, material) in tile.materials.iter_mut() {
            let Some(rebuilt) = rebuild_material(material, techniques, view, config) else {
                continue;
            };
            if rebuilt != *material {
                trace!("MaterialRefreshLane: material {:?} changed", id);
                *material = rebuilt;
                report.changed += 1;
            }
        }
        if report.changed > 0 {
            debug!(
                "MaterialRefreshLane: {} material(s) of tile {} updated at zoom {}",
                report.changed, tile.key, view.zoom_level
            );
        }
        report
    }
}

impl Lane for MaterialRefreshLane {
    fn strategy_name(&self) -> &'static str {
        "MaterialRefresh"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Material
    }

    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let mut tile = ctx.remove::<Tile>().ok_or(LaneError::missing("Tile"))?;
        let result = self.refresh_from_context(ctx, &mut tile);
        ctx.insert(tile);
        ctx.insert(result?);
        Ok(())
    }
}

impl MaterialRefreshLane {
    fn refresh_from_context(
        &self,
        ctx: &LaneContext,
        tile: &mut Tile,
    ) -> Result<RefreshReport, LaneError> {
        let decoded = ctx
            .get::<DecodedTile>()
            .ok_or(LaneError::missing("DecodedTile"))?;
        let view = ctx.get::<ViewState>().ok_or(LaneError::missing("ViewState"))?;
        let config = ctx
            .get::<MaterializerConfig>()
            .ok_or(LaneError::missing("MaterializerConfig"))?;
        Ok(self.refresh(tile, &decoded.techniques, view, config))
    }
}
