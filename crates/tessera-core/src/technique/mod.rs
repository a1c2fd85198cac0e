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

//! # Techniques
//!
//! A technique is a style-driven recipe telling the materializer how to turn
//! one draw group into a renderable object or into label candidates.
//! Techniques deserialize from the JSON shape emitted by style sheets:
//!
//! ```
//! use tessera_core::technique::{Technique, TechniqueParams};
//! let t: Technique = serde_json::from_value(serde_json::json!({
//!     "name": "fill",
//!     "kind": "water",
//!     "renderOrder": 3,
//!     "color": "#0000ff",
//! })).unwrap();
//! assert!(matches!(t.params, TechniqueParams::Fill(_)));
//! assert_eq!(t.render_order, 3.0);
//! ```

mod kind;

pub use self::kind::{GeometryKindSet, KindTags};

use crate::expr::StyleAttr;
use crate::tile::ObjectKind;
use serde::Deserialize;

/// A named rendering recipe shared by every group that references it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technique {
    /// Classification tags used by the kind filter.
    #[serde(default)]
    pub kind: KindTags,
    /// Base render order of objects built from this technique.
    #[serde(default)]
    pub render_order: f64,
    /// Distance at which fading starts.
    #[serde(default)]
    pub fade_near: Option<StyleAttr>,
    /// Distance at which the object is fully faded out.
    #[serde(default)]
    pub fade_far: Option<StyleAttr>,
    /// Static override of the kind filter.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Lowest zoom level at which the technique applies.
    #[serde(default)]
    pub min_zoom_level: Option<f32>,
    /// Highest zoom level at which the technique applies.
    #[serde(default)]
    pub max_zoom_level: Option<f32>,
    /// Position of the authoring rule in the theme's style set. Identical
    /// across every tile decoded with the same theme, unlike the index into
    /// a tile's technique list.
    #[serde(default, rename = "_styleSetIndex")]
    pub style_set_index: Option<usize>,
    /// Variant-specific parameters, tagged by `name`.
    #[serde(flatten)]
    pub params: TechniqueParams,
}

impl Technique {
    /// Creates a technique with default common fields.
    pub fn new(params: TechniqueParams) -> Self {
        Self {
            kind: KindTags::default(),
            render_order: 0.0,
            fade_near: None,
            fade_far: None,
            enabled: None,
            min_zoom_level: None,
            max_zoom_level: None,
            style_set_index: None,
            params,
        }
    }

    /// Sets the style-set index.
    pub fn with_style_set_index(mut self, index: usize) -> Self {
        self.style_set_index = Some(index);
        self
    }

    /// Replaces the kind tags.
    pub fn with_kind<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = KindTags::new(tags);
        self
    }

    /// Replaces the render order.
    pub fn with_render_order(mut self, render_order: f64) -> Self {
        self.render_order = render_order;
        self
    }

    /// The style-sheet name of the technique.
    pub fn name(&self) -> &'static str {
        self.params.name()
    }
}

/// Unit of a line width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum MetricUnit {
    /// World units.
    #[default]
    Meter,
    /// Screen pixels, scaled by the view's pixel-to-world factor.
    Pixel,
}

/// Line cap style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LineCaps {
    /// Squared-off end extending past the vertex.
    Square,
    /// Rounded end.
    #[default]
    Round,
    /// Flat end at the vertex.
    None,
    /// Outward-pointing triangle.
    TriangleOut,
    /// Inward-pointing triangle.
    TriangleIn,
}

/// Lighting model of extruded lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shading {
    /// Unlit.
    #[default]
    Basic,
    /// Physically based, requires normals.
    Standard,
}

/// Primitive drawn by a custom shader technique.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderPrimitive {
    /// Point sprites.
    Point,
    /// Connected line strip.
    Line,
    /// Disjoint line segments.
    Segments,
    /// Triangle mesh.
    #[default]
    Mesh,
}

/// Outline parameters shared by fill and extruded-polygon techniques.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeStyle {
    /// Outline color; overrides the engine default.
    pub line_color: Option<StyleAttr>,
    /// Fraction of the fill color mixed into the outline.
    pub line_color_mix: Option<StyleAttr>,
    /// Outline width; `0` disables outlines.
    pub line_width: Option<StyleAttr>,
    /// Outline fade start distance.
    pub line_fade_near: Option<StyleAttr>,
    /// Outline fade end distance.
    pub line_fade_far: Option<StyleAttr>,
}

/// Parameters of `squares` and `circles`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointParams {
    /// Point color.
    pub color: Option<StyleAttr>,
    /// Point opacity.
    pub opacity: Option<StyleAttr>,
    /// Point size in pixels.
    pub size: Option<StyleAttr>,
}

/// Parameters of hairline `line` and `segments` techniques.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicLineParams {
    /// Line color.
    pub color: Option<StyleAttr>,
    /// Line opacity.
    pub opacity: Option<StyleAttr>,
    /// Hairline width.
    pub line_width: Option<StyleAttr>,
}

/// Parameters of `solid-line` and `dashed-line`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolidLineParams {
    /// Line color.
    pub color: Option<StyleAttr>,
    /// Line opacity; a secondary stroke only shows through when below one.
    pub opacity: Option<StyleAttr>,
    /// Line width in `metric_unit`.
    pub line_width: Option<StyleAttr>,
    /// Unit of `line_width` and `secondary_width`.
    pub metric_unit: MetricUnit,
    /// Width of the outline drawn around the line.
    pub outline_width: Option<StyleAttr>,
    /// Color of the outline.
    pub outline_color: Option<StyleAttr>,
    /// Caps of the primary stroke.
    pub caps: LineCaps,
    /// Color of the secondary (casing) stroke.
    pub secondary_color: Option<StyleAttr>,
    /// Width of the secondary stroke; its presence enables the stroke.
    pub secondary_width: Option<StyleAttr>,
    /// Caps of the secondary stroke; defaults to `caps`.
    pub secondary_caps: Option<LineCaps>,
    /// Explicit render order of the secondary stroke.
    pub secondary_render_order: Option<f64>,
    /// Dash length (`dashed-line` only).
    pub dash_size: Option<StyleAttr>,
    /// Gap length (`dashed-line` only).
    pub gap_size: Option<StyleAttr>,
}

/// Parameters of `fill`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FillParams {
    /// Fill color.
    pub color: Option<StyleAttr>,
    /// Fill opacity.
    pub opacity: Option<StyleAttr>,
    /// Forces blending even when opaque.
    pub transparent: Option<bool>,
    /// Outline parameters.
    #[serde(flatten)]
    pub edges: EdgeStyle,
}

/// Parameters of lit `standard` meshes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StandardParams {
    /// Base color.
    pub color: Option<StyleAttr>,
    /// Opacity.
    pub opacity: Option<StyleAttr>,
    /// Surface roughness.
    pub roughness: Option<StyleAttr>,
    /// Metalness.
    pub metalness: Option<StyleAttr>,
    /// Emissive color.
    pub emissive: Option<StyleAttr>,
    /// Forces blending even when opaque.
    pub transparent: Option<bool>,
}

/// Height stops used to color terrain vertices.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeightBasedColors {
    /// Ascending heights.
    pub heights: Vec<f32>,
    /// One style-sheet color per height.
    pub colors: Vec<String>,
}

/// Parameters of `terrain`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerrainParams {
    /// Lit-mesh parameters.
    #[serde(flatten)]
    pub standard: StandardParams,
    /// Per-vertex coloring by height.
    pub height_based_colors: Option<HeightBasedColors>,
}

/// Parameters of `extruded-line`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtrudedLineParams {
    /// Line color.
    pub color: Option<StyleAttr>,
    /// Opacity.
    pub opacity: Option<StyleAttr>,
    /// Extrusion width.
    pub line_width: Option<StyleAttr>,
    /// Lighting model.
    pub shading: Shading,
    /// Cap style.
    pub caps: LineCaps,
}

/// Parameters of `extruded-polygon`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtrudedPolygonParams {
    /// Wall and roof color.
    pub color: Option<StyleAttr>,
    /// Opacity; below one adds a depth pre-pass.
    pub opacity: Option<StyleAttr>,
    /// Forces blending even when opaque.
    pub transparent: Option<bool>,
    /// Surface roughness.
    pub roughness: Option<StyleAttr>,
    /// Emissive color.
    pub emissive: Option<StyleAttr>,
    /// Animation flag; booleans or numbers, unset inherits the handler default.
    pub animate_extrusion: Option<StyleAttr>,
    /// Animation duration override in milliseconds.
    pub animate_extrusion_duration: Option<f64>,
    /// Outline parameters.
    #[serde(flatten)]
    pub edges: EdgeStyle,
}

/// Parameters of custom `shader` techniques.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShaderParams {
    /// Primitive the shader draws.
    pub primitive: ShaderPrimitive,
    /// Color passed to the shader.
    pub color: Option<StyleAttr>,
    /// Opacity passed to the shader.
    pub opacity: Option<StyleAttr>,
}

/// Horizontal label alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum HorizontalAlignment {
    /// Text starts at the anchor.
    Left,
    /// Text centered on the anchor.
    #[default]
    Center,
    /// Text ends at the anchor.
    Right,
}

/// Vertical label alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum VerticalAlignment {
    /// Text sits above the anchor.
    Above,
    /// Text centered on the anchor.
    #[default]
    Center,
    /// Text hangs below the anchor.
    Below,
}

/// Line wrapping policy for labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum WrappingMode {
    /// Never wrap.
    None,
    /// Wrap at any character.
    Character,
    /// Wrap at word boundaries.
    #[default]
    Word,
}

/// Parameters of the label techniques (`text`, `labeled-icon`, `line-marker`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextParams {
    /// Overrides the geometry's text, may read feature properties.
    pub text: Option<StyleAttr>,
    /// Font name.
    pub font_name: Option<String>,
    /// Glyph size in pixels.
    pub size: Option<StyleAttr>,
    /// Text color.
    pub color: Option<StyleAttr>,
    /// Text opacity.
    pub opacity: Option<StyleAttr>,
    /// Halo color.
    pub background_color: Option<StyleAttr>,
    /// Halo opacity.
    pub background_opacity: Option<StyleAttr>,
    /// Base placement priority.
    pub priority: Option<StyleAttr>,
    /// Horizontal alignment.
    pub horizontal_alignment: HorizontalAlignment,
    /// Vertical alignment.
    pub vertical_alignment: VerticalAlignment,
    /// Wrapping policy.
    pub wrapping_mode: WrappingMode,
    /// Extra spacing between glyphs, in ems.
    pub tracking: Option<f32>,
    /// Extra spacing between lines, in ems.
    pub leading: Option<f32>,
    /// Maximum number of lines.
    pub max_lines: Option<u32>,
    /// Wrap width in ems.
    pub line_width: Option<f32>,
    /// Icon image (`labeled-icon`, `line-marker`).
    pub image_texture: Option<String>,
}

/// Variant-specific technique parameters, tagged by the style-sheet `name`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum TechniqueParams {
    /// Square point sprites.
    Squares(PointParams),
    /// Round point sprites.
    Circles(PointParams),
    /// Hairline strip.
    Line(BasicLineParams),
    /// Hairline segments.
    Segments(BasicLineParams),
    /// Mesh-based wide line.
    SolidLine(SolidLineParams),
    /// Mesh-based dashed line.
    DashedLine(SolidLineParams),
    /// Unlit polygon fill.
    Fill(FillParams),
    /// Lit mesh.
    Standard(StandardParams),
    /// Lit terrain mesh.
    Terrain(TerrainParams),
    /// Extruded (tube-like) line.
    ExtrudedLine(ExtrudedLineParams),
    /// Extruded building footprint.
    ExtrudedPolygon(ExtrudedPolygonParams),
    /// Custom shader.
    Shader(ShaderParams),
    /// Text label.
    Text(TextParams),
    /// Icon with optional text.
    LabeledIcon(TextParams),
    /// Icons repeated along a line.
    LineMarker(TextParams),
}

impl TechniqueParams {
    /// The style-sheet name.
    pub fn name(&self) -> &'static str {
        match self {
            TechniqueParams::Squares(_) => "squares",
            TechniqueParams::Circles(_) => "circles",
            TechniqueParams::Line(_) => "line",
            TechniqueParams::Segments(_) => "segments",
            TechniqueParams::SolidLine(_) => "solid-line",
            TechniqueParams::DashedLine(_) => "dashed-line",
            TechniqueParams::Fill(_) => "fill",
            TechniqueParams::Standard(_) => "standard",
            TechniqueParams::Terrain(_) => "terrain",
            TechniqueParams::ExtrudedLine(_) => "extruded-line",
            TechniqueParams::ExtrudedPolygon(_) => "extruded-polygon",
            TechniqueParams::Shader(_) => "shader",
            TechniqueParams::Text(_) => "text",
            TechniqueParams::LabeledIcon(_) => "labeled-icon",
            TechniqueParams::LineMarker(_) => "line-marker",
        }
    }

    /// The object a group of this technique becomes, or `None` for
    /// techniques that only feed the label pipeline.
    pub fn object_kind(&self) -> Option<ObjectKind> {
        Some(match self {
            TechniqueParams::Squares(_) | TechniqueParams::Circles(_) => ObjectKind::Points,
            TechniqueParams::Line(_) => ObjectKind::Line,
            TechniqueParams::Segments(_) => ObjectKind::LineSegments,
            TechniqueParams::SolidLine(_) | TechniqueParams::DashedLine(_) => {
                ObjectKind::SolidLineMesh
            }
            TechniqueParams::Fill(_)
            | TechniqueParams::Standard(_)
            | TechniqueParams::Terrain(_)
            | TechniqueParams::ExtrudedLine(_)
            | TechniqueParams::ExtrudedPolygon(_) => ObjectKind::Mesh,
            TechniqueParams::Shader(p) => match p.primitive {
                ShaderPrimitive::Point => ObjectKind::Points,
                ShaderPrimitive::Line => ObjectKind::Line,
                ShaderPrimitive::Segments => ObjectKind::LineSegments,
                ShaderPrimitive::Mesh => ObjectKind::Mesh,
            },
            TechniqueParams::Text(_)
            | TechniqueParams::LabeledIcon(_)
            | TechniqueParams::LineMarker(_) => return None,
        })
    }

    /// Label parameters, for the label techniques.
    pub fn text(&self) -> Option<&TextParams> {
        match self {
            TechniqueParams::Text(p)
            | TechniqueParams::LabeledIcon(p)
            | TechniqueParams::LineMarker(p) => Some(p),
            _ => None,
        }
    }

    /// `true` when the mesh is lit and needs vertex normals.
    pub fn needs_normals(&self) -> bool {
        match self {
            TechniqueParams::Standard(_)
            | TechniqueParams::Terrain(_)
            | TechniqueParams::ExtrudedPolygon(_) => true,
            TechniqueParams::ExtrudedLine(p) => p.shading == Shading::Standard,
            _ => false,
        }
    }

    /// `true` when picking resolves to the whole tile instead of a feature.
    pub fn uses_tile_picking(&self) -> bool {
        matches!(self, TechniqueParams::Line(_) | TechniqueParams::Segments(_))
    }

    /// The main color attribute.
    pub fn color(&self) -> Option<&StyleAttr> {
        match self {
            TechniqueParams::Squares(p) | TechniqueParams::Circles(p) => p.color.as_ref(),
            TechniqueParams::Line(p) | TechniqueParams::Segments(p) => p.color.as_ref(),
            TechniqueParams::SolidLine(p) | TechniqueParams::DashedLine(p) => p.color.as_ref(),
            TechniqueParams::Fill(p) => p.color.as_ref(),
            TechniqueParams::Standard(p) => p.color.as_ref(),
            TechniqueParams::Terrain(p) => p.standard.color.as_ref(),
            TechniqueParams::ExtrudedLine(p) => p.color.as_ref(),
            TechniqueParams::ExtrudedPolygon(p) => p.color.as_ref(),
            TechniqueParams::Shader(p) => p.color.as_ref(),
            TechniqueParams::Text(p)
            | TechniqueParams::LabeledIcon(p)
            | TechniqueParams::LineMarker(p) => p.color.as_ref(),
        }
    }

    /// The opacity attribute.
    pub fn opacity(&self) -> Option<&StyleAttr> {
        match self {
            TechniqueParams::Squares(p) | TechniqueParams::Circles(p) => p.opacity.as_ref(),
            TechniqueParams::Line(p) | TechniqueParams::Segments(p) => p.opacity.as_ref(),
            TechniqueParams::SolidLine(p) | TechniqueParams::DashedLine(p) => p.opacity.as_ref(),
            TechniqueParams::Fill(p) => p.opacity.as_ref(),
            TechniqueParams::Standard(p) => p.opacity.as_ref(),
            TechniqueParams::Terrain(p) => p.standard.opacity.as_ref(),
            TechniqueParams::ExtrudedLine(p) => p.opacity.as_ref(),
            TechniqueParams::ExtrudedPolygon(p) => p.opacity.as_ref(),
            TechniqueParams::Shader(p) => p.opacity.as_ref(),
            TechniqueParams::Text(p)
            | TechniqueParams::LabeledIcon(p)
            | TechniqueParams::LineMarker(p) => p.opacity.as_ref(),
        }
    }

    /// The explicit `transparent` flag, where the variant has one.
    pub fn transparent(&self) -> Option<bool> {
        match self {
            TechniqueParams::Fill(p) => p.transparent,
            TechniqueParams::Standard(p) => p.transparent,
            TechniqueParams::Terrain(p) => p.standard.transparent,
            TechniqueParams::ExtrudedPolygon(p) => p.transparent,
            _ => None,
        }
    }

    /// Outline parameters of polygon techniques.
    pub fn edges(&self) -> Option<&EdgeStyle> {
        match self {
            TechniqueParams::Fill(p) => Some(&p.edges),
            TechniqueParams::ExtrudedPolygon(p) => Some(&p.edges),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn technique(value: serde_json::Value) -> Technique {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn style_set_index_is_read_from_the_decoder_field() {
        let t = technique(json!({ "name": "text", "_styleSetIndex": 42 }));
        assert_eq!(t.style_set_index, Some(42));
        assert_eq!(technique(json!({ "name": "text" })).style_set_index, None);
    }

    #[test]
    fn common_fields_and_kind_array() {
        let t = technique(json!({
            "name": "solid-line",
            "kind": ["road", "bridge"],
            "fadeNear": 0.8,
            "minZoomLevel": 12,
            "lineWidth": ["interpolate", ["linear"], ["zoom"], 10, 1, 16, 4],
            "secondaryWidth": 6,
            "secondaryRenderOrder": -1,
            "caps": "Square",
        }));
        assert_eq!(t.kind.iter().collect::<Vec<_>>(), ["road", "bridge"]);
        assert_eq!(t.min_zoom_level, Some(12.0));
        let TechniqueParams::SolidLine(p) = &t.params else {
            panic!("expected solid-line, got {}", t.name());
        };
        assert!(p.line_width.as_ref().unwrap().is_dynamic());
        assert_eq!(p.secondary_render_order, Some(-1.0));
        assert_eq!(p.caps, LineCaps::Square);
        assert_eq!(t.params.object_kind(), Some(ObjectKind::SolidLineMesh));
    }

    #[test]
    fn polygon_edge_fields_are_flattened() {
        let t = technique(json!({
            "name": "extruded-polygon",
            "lineColor": "#ff0000",
            "lineColorMix": 0.2,
            "animateExtrusion": 1,
        }));
        let edges = t.params.edges().unwrap();
        assert!(edges.line_color.is_some());
        assert!(edges.line_color_mix.is_some());
        assert!(t.params.needs_normals());
    }

    #[test]
    fn label_techniques_have_no_object() {
        let t = technique(json!({"name": "text", "priority": 5}));
        assert!(t.params.object_kind().is_none());
        assert!(t.params.text().is_some());
        assert!(t.kind.is_empty());
    }

    #[test]
    fn terrain_height_colors() {
        let t = technique(json!({
            "name": "terrain",
            "heightBasedColors": {"heights": [0, 100], "colors": ["#000", "#fff"]},
        }));
        let TechniqueParams::Terrain(p) = &t.params else {
            panic!("expected terrain");
        };
        assert_eq!(p.height_based_colors.as_ref().unwrap().heights, [0.0, 100.0]);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(serde_json::from_value::<Technique>(json!({"name": "hologram"})).is_err());
    }

    #[test]
    fn line_techniques_pick_per_tile() {
        assert!(TechniqueParams::Line(Default::default()).uses_tile_picking());
        assert!(TechniqueParams::Segments(Default::default()).uses_tile_picking());
        assert!(!TechniqueParams::Fill(Default::default()).uses_tile_picking());
    }
}
