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

//! Shared label styles.

use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tessera_core::expr::{attr_color, attr_f32, EvalContext};
use tessera_core::math::{saturate, LinearRgba};
use tessera_core::technique::TextParams;
use tessera_core::tile::{TextLayoutStyle, TextRenderStyle};
use tessera_core::ViewState;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleKey {
    data_source: String,
    style_set_index: usize,
    zoom: i32,
}

pub(crate) type StylePair = (Arc<TextRenderStyle>, Arc<TextLayoutStyle>);

/// Caches resolved label styles per data source, style-set rule and integer
/// zoom, across every tile.
///
/// Only techniques carrying a style-set index are cached: a technique's
/// position in a tile's own list says nothing about other tiles.
#[derive(Debug, Default)]
pub struct TextStyleCache {
    styles: Mutex<AHashMap<StyleKey, StylePair>>,
}

impl TextStyleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the styles of a label technique, evaluated at the floor of
    /// the view zoom. With a `style_set_index` the result is cached; without
    /// one it is resolved afresh.
    pub fn resolve(
        &self,
        data_source: &str,
        style_set_index: Option<usize>,
        params: &TextParams,
        view: &ViewState,
    ) -> StylePair {
        let zoom = view.zoom_level.floor();
        let build = || {
            let ctx = EvalContext::new(zoom as f64, view.pixel_to_world as f64);
            (
                Arc::new(render_style(params, &ctx)),
                Arc::new(layout_style(params)),
            )
        };
        let Some(style_set_index) = style_set_index else {
            return build();
        };

        let key = StyleKey {
            data_source: data_source.to_owned(),
            style_set_index,
            zoom: zoom as i32,
        };
        let mut styles = self.styles.lock().unwrap_or_else(PoisonError::into_inner);
        styles.entry(key).or_insert_with(build).clone()
    }

    /// Number of cached style pairs.
    pub fn len(&self) -> usize {
        self.styles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached style, e.g. after a theme change.
    pub fn clear(&self) {
        self.styles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn render_style(params: &TextParams, ctx: &EvalContext<'_>) -> TextRenderStyle {
    let defaults = TextRenderStyle::default();
    let background_color = attr_color(&params.background_color, ctx);
    let background_opacity = attr_f32(&params.background_opacity, ctx)
        .unwrap_or(if background_color.is_some() { 1.0 } else { 0.0 });
    TextRenderStyle {
        font_name: params.font_name.clone(),
        size: attr_f32(&params.size, ctx).unwrap_or(defaults.size),
        color: attr_color(&params.color, ctx).unwrap_or(LinearRgba::BLACK),
        opacity: saturate(attr_f32(&params.opacity, ctx).unwrap_or(1.0)),
        background_color,
        background_opacity: saturate(background_opacity),
    }
}

fn layout_style(params: &TextParams) -> TextLayoutStyle {
    TextLayoutStyle {
        horizontal_alignment: params.horizontal_alignment,
        vertical_alignment: params.vertical_alignment,
        wrapping_mode: params.wrapping_mode,
        tracking: params.tracking.unwrap_or(0.0),
        leading: params.leading.unwrap_or(0.0),
        max_lines: params.max_lines,
        line_width: params.line_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::expr::StyleAttr;

    #[test]
    fn same_integer_zoom_shares_styles() {
        let cache = TextStyleCache::new();
        let params = TextParams::default();
        let (a, _) = cache.resolve("osm", Some(0), &params, &ViewState::at_zoom(12.2));
        let (b, _) = cache.resolve("osm", Some(0), &params, &ViewState::at_zoom(12.9));
        let (c, _) = cache.resolve("osm", Some(0), &params, &ViewState::at_zoom(13.0));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn data_sources_do_not_collide() {
        let cache = TextStyleCache::new();
        let params = TextParams::default();
        cache.resolve("osm", Some(0), &params, &ViewState::default());
        cache.resolve("terrain", Some(0), &params, &ViewState::default());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn techniques_without_a_style_set_are_not_cached() {
        let cache = TextStyleCache::new();
        let params = TextParams::default();
        let (a, _) = cache.resolve("osm", None, &params, &ViewState::default());
        let (b, _) = cache.resolve("osm", None, &params, &ViewState::default());

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn background_color_implies_opaque_halo() {
        let params = TextParams {
            background_color: Some(StyleAttr::from("#ffffff")),
            size: Some(StyleAttr::from(20.0)),
            ..TextParams::default()
        };
        let (style, _) = TextStyleCache::new().resolve("osm", Some(1), &params, &ViewState::default());

        assert_eq!(style.size, 20.0);
        assert_eq!(style.background_opacity, 1.0);
        assert_eq!(style.background_color, Some(LinearRgba::WHITE));
    }
}
