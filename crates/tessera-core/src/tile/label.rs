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

//! Label candidates handed to the external placement stage.

use crate::expr::Properties;
use crate::math::{LinearRgba, Vec3};
use crate::technique::{HorizontalAlignment, VerticalAlignment, WrappingMode};
use std::sync::Arc;

/// Resolved glyph appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRenderStyle {
    /// Font name, `None` for the default font.
    pub font_name: Option<String>,
    /// Glyph size in pixels.
    pub size: f32,
    /// Glyph color.
    pub color: LinearRgba,
    /// Glyph opacity.
    pub opacity: f32,
    /// Halo color.
    pub background_color: Option<LinearRgba>,
    /// Halo opacity.
    pub background_opacity: f32,
}

impl Default for TextRenderStyle {
    fn default() -> Self {
        Self {
            font_name: None,
            size: 16.0,
            color: LinearRgba::BLACK,
            opacity: 1.0,
            background_color: None,
            background_opacity: 0.0,
        }
    }
}

/// Resolved text layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayoutStyle {
    /// Horizontal alignment.
    pub horizontal_alignment: HorizontalAlignment,
    /// Vertical alignment.
    pub vertical_alignment: VerticalAlignment,
    /// Wrapping policy.
    pub wrapping_mode: WrappingMode,
    /// Glyph spacing in ems.
    pub tracking: f32,
    /// Line spacing in ems.
    pub leading: f32,
    /// Maximum number of lines.
    pub max_lines: Option<u32>,
    /// Wrap width in ems.
    pub line_width: Option<f32>,
}

/// Where a label is placed.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelAnchor {
    /// At a point.
    Point(Vec3),
    /// Along a path.
    Path(Vec<Vec3>),
}

impl LabelAnchor {
    /// Length of a path anchor; zero for points.
    pub fn path_length(&self) -> f32 {
        match self {
            LabelAnchor::Point(_) => 0.0,
            LabelAnchor::Path(path) => path.windows(2).map(|w| w[0].distance(w[1])).sum(),
        }
    }
}

/// Icon attached to a label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoiInfo {
    /// Icon image name.
    pub image_name: Option<String>,
    /// Repeated along the anchor path instead of placed once.
    pub is_line_marker: bool,
}

/// A label candidate with its resolved style and placement metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    /// Text to render; may be empty for icon-only labels.
    pub text: String,
    /// Anchor geometry.
    pub anchor: LabelAnchor,
    /// Source technique.
    pub technique_index: usize,
    /// Glyph appearance, shared between labels of one technique and zoom.
    pub render_style: Arc<TextRenderStyle>,
    /// Layout, shared like `render_style`.
    pub layout_style: Arc<TextLayoutStyle>,
    /// Placement priority; higher places first.
    pub priority: f32,
    /// Lowest visible zoom level.
    pub min_zoom_level: f32,
    /// Highest visible zoom level.
    pub max_zoom_level: f32,
    /// Fade start distance.
    pub fade_near: Option<f32>,
    /// Fade end distance.
    pub fade_far: Option<f32>,
    /// Source feature.
    pub feature_id: Option<u64>,
    /// Opaque feature attributes for picking.
    pub user_data: Option<Properties>,
    /// Icon, for labeled icons and line markers.
    pub poi_info: Option<PoiInfo>,
}
