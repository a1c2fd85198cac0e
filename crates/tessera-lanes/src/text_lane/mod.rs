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

//! # Text Lane
//!
//! Extracts label candidates from the text, path-text and POI geometries
//! of a decoded tile. Extraction runs once per tile offset; the resulting
//! [`TextElement`]s are ordered by descending priority for the placement
//! stage.

mod path_split;
mod style_cache;

pub use path_split::split_path;
pub use style_cache::TextStyleCache;

use ahash::AHashMap;
use log::debug;
use style_cache::StylePair;
use tessera_core::expr::{attr_f32, Properties};
use tessera_core::geometry::DecodedTile;
use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind, TechniqueFilter};
use tessera_core::technique::{Technique, TechniqueParams, TextParams};
use tessera_core::tile::{LabelAnchor, PoiInfo, TextElement, Tile};
use tessera_core::{MaterializerConfig, ViewState};

/// Outcome of a [`TextLane`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextReport {
    /// Label candidates appended to the tile.
    pub elements: usize,
    /// Path pieces produced by corner splitting.
    pub path_pieces: usize,
}

/// Everything needed to turn one anchor into a [`TextElement`].
struct LabelSource<'a> {
    technique_index: usize,
    technique: &'a Technique,
    params: &'a TextParams,
    text: &'a str,
    anchor: LabelAnchor,
    feature_id: Option<u64>,
    obj_info: Option<&'a Properties>,
    poi_info: Option<PoiInfo>,
}

/// The lane extracting label candidates.
#[derive(Debug, Default)]
pub struct TextLane {
    styles: TextStyleCache,
}

impl TextLane {
    /// Creates a lane with an empty style cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The style cache shared by every tile this lane processes.
    pub fn styles(&self) -> &TextStyleCache {
        &self.styles
    }

    /// Appends the label candidates of `decoded` to `tile`.
    ///
    /// Does nothing when labels were already extracted for `tile.offset`.
    pub fn run(
        &self,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
        view: &ViewState,
        config: &MaterializerConfig,
        filter: Option<&TechniqueFilter>,
    ) -> TextReport {
        if !decoded.states.text_offsets.insert(tile.offset) {
            return TextReport::default();
        }
        let decoded = &*decoded;
        let mut report = TextReport::default();
        let mut elements = Vec::new();
        // Labels of one technique in this tile share their styles.
        let mut tile_styles = AHashMap::new();

        let label = |index: usize| {
            if !decoded.technique_enabled(index) {
                return None;
            }
            let technique = decoded.techniques.get(index)?;
            if filter.is_some_and(|f| !f.accepts(technique)) {
                return None;
            }
            Some((technique, technique.params.text()?))
        };

        // Path labels first: their priority bias needs every piece's length.
        let mut pieces = Vec::new();
        for geometry in decoded.text_path_geometries.iter().flatten() {
            let Some((technique, params)) = label(geometry.technique_index) else {
                continue;
            };
            for piece in split_path(&geometry.path, config.corner_angle_threshold) {
                pieces.push(LabelSource {
                    technique_index: geometry.technique_index,
                    technique,
                    params,
                    text: geometry.text.as_str(),
                    anchor: LabelAnchor::Path(piece),
                    feature_id: geometry.feature_id,
                    obj_info: geometry.obj_info.as_ref(),
                    poi_info: None,
                });
            }
        }
        report.path_pieces = pieces.len();
        let max_length = pieces
            .iter()
            .map(|p| p.anchor.path_length())
            .fold(0.0f32, f32::max);
        for source in pieces {
            let bias = if max_length > 0.0 {
                config.path_length_priority_weight * source.anchor.path_length() / max_length
            } else {
                0.0
            };
            elements.extend(self.element(tile, &mut tile_styles, source, view, bias));
        }

        for geometry in decoded.text_geometries.iter().flatten() {
            let Some((technique, params)) = label(geometry.technique_index) else {
                continue;
            };
            for (i, (position, text)) in geometry.positions.iter().zip(&geometry.texts).enumerate()
            {
                let source = LabelSource {
                    technique_index: geometry.technique_index,
                    technique,
                    params,
                    text: text.as_str(),
                    anchor: LabelAnchor::Point(*position),
                    feature_id: geometry.feature_ids.as_ref().and_then(|ids| ids.get(i).copied()),
                    obj_info: geometry.obj_infos.as_ref().and_then(|infos| infos.get(i)),
                    poi_info: None,
                };
                elements.extend(self.element(tile, &mut tile_styles, source, view, 0.0));
            }
        }

        for geometry in decoded.poi_geometries.iter().flatten() {
            let Some((technique, params)) = label(geometry.technique_index) else {
                continue;
            };
            let image_at = |i: usize| {
                geometry
                    .image_textures
                    .as_ref()
                    .and_then(|images| images.get(i).cloned())
                    .or_else(|| params.image_texture.clone())
            };

            if matches!(technique.params, TechniqueParams::LineMarker(_)) {
                if geometry.positions.len() < 2 {
                    continue;
                }
                let source = LabelSource {
                    technique_index: geometry.technique_index,
                    technique,
                    params,
                    text: geometry.texts.first().map_or("", String::as_str),
                    anchor: LabelAnchor::Path(geometry.positions.clone()),
                    feature_id: geometry.feature_ids.as_ref().and_then(|ids| ids.first().copied()),
                    obj_info: geometry.obj_infos.as_ref().and_then(|infos| infos.first()),
                    poi_info: Some(PoiInfo {
                        image_name: image_at(0),
                        is_line_marker: true,
                    }),
                };
                elements.extend(self.element(tile, &mut tile_styles, source, view, 0.0));
                continue;
            }

            for (i, position) in geometry.positions.iter().enumerate() {
                let source = LabelSource {
                    technique_index: geometry.technique_index,
                    technique,
                    params,
                    text: geometry.texts.get(i).map_or("", String::as_str),
                    anchor: LabelAnchor::Point(*position),
                    feature_id: geometry.feature_ids.as_ref().and_then(|ids| ids.get(i).copied()),
                    obj_info: geometry.obj_infos.as_ref().and_then(|infos| infos.get(i)),
                    poi_info: Some(PoiInfo {
                        image_name: image_at(i),
                        is_line_marker: false,
                    }),
                };
                elements.extend(self.element(tile, &mut tile_styles, source, view, 0.0));
            }
        }

        report.elements = elements.len();
        tile.text_elements.extend(elements);
        // Stable: equal priorities keep extraction order.
        tile.text_elements
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));

        debug!(
            "TextLane: tile {}:{} got {} label candidate(s)",
            tile.key, tile.offset, report.elements
        );
        report
    }

    fn element(
        &self,
        tile: &Tile,
        tile_styles: &mut AHashMap<usize, StylePair>,
        source: LabelSource<'_>,
        view: &ViewState,
        priority_bias: f32,
    ) -> Option<TextElement> {
        let ctx = view.feature_context(source.obj_info);
        let text = source
            .params
            .text
            .as_ref()
            .and_then(|attr| attr.eval_string(&ctx))
            .unwrap_or_else(|| source.text.to_owned());
        let has_icon = source
            .poi_info
            .as_ref()
            .is_some_and(|poi| poi.image_name.is_some());
        if text.is_empty() && !has_icon {
            return None;
        }

        let technique = source.technique;
        let (render_style, layout_style) = tile_styles
            .entry(source.technique_index)
            .or_insert_with(|| {
                self.styles.resolve(
                    &tile.data_source,
                    technique.style_set_index,
                    source.params,
                    view,
                )
            })
            .clone();
        Some(TextElement {
            text,
            anchor: source.anchor,
            technique_index: source.technique_index,
            render_style,
            layout_style,
            priority: attr_f32(&source.params.priority, &ctx).unwrap_or(0.0) + priority_bias,
            min_zoom_level: technique.min_zoom_level.unwrap_or(view.min_zoom_level),
            max_zoom_level: technique.max_zoom_level.unwrap_or(view.max_zoom_level),
            fade_near: attr_f32(&technique.fade_near, &ctx),
            fade_far: attr_f32(&technique.fade_far, &ctx),
            feature_id: source.feature_id,
            user_data: source.obj_info.cloned(),
            poi_info: source.poi_info,
        })
    }
}

impl Lane for TextLane {
    fn strategy_name(&self) -> &'static str {
        "TextExtraction"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Text
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

impl TextLane {
    fn run_from_context(
        &self,
        ctx: &LaneContext,
        tile: &mut Tile,
        decoded: &mut DecodedTile,
    ) -> Result<TextReport, LaneError> {
        let view = ctx.get::<ViewState>().ok_or(LaneError::missing("ViewState"))?;
        let config = ctx
            .get::<MaterializerConfig>()
            .ok_or(LaneError::missing("MaterializerConfig"))?;
        let filter = ctx.get::<TechniqueFilter>();
        Ok(self.run(tile, decoded, view, config, filter))
    }
}
