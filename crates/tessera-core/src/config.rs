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

//! Engine-wide constants used while materializing tiles.

use crate::math::{LinearRgba, FRAC_PI_8};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised when a [`MaterializerConfig`] cannot be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The RON document could not be parsed.
    Parse(String),
    /// A color entry is not a valid style-sheet color.
    InvalidColor {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Failed to parse materializer config: {msg}"),
            ConfigError::InvalidColor { field, value } => {
                write!(f, "Invalid color '{value}' for config field '{field}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Defaults and tuning knobs shared by every tile a materializer builds.
///
/// Values that a technique leaves unset fall back to the entries here.
/// Missing keys in a RON document fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    /// Fade-in start distance; negative disables fading.
    pub fade_near: f32,
    /// Fade-out end distance; negative disables fading.
    pub fade_far: f32,
    /// Color of polygon outlines when the technique has no `lineColor`.
    pub edge_color: String,
    /// How much of the fill color is mixed into outlines, in `[0, 1]`.
    pub edge_color_mix: f32,
    /// Added to the primary render order for outline objects.
    pub edge_render_order_offset: f64,
    /// Subtracted from the primary render order for secondary strokes
    /// that have no explicit `secondaryRenderOrder`.
    pub secondary_render_order_offset: f64,
    /// Label paths turning by more than this many radians are split.
    pub corner_angle_threshold: f32,
    /// Weight of the normalized path length added to path label priority.
    pub path_length_priority_weight: f32,
    /// Whether extruded buildings animate when the technique does not say.
    pub animate_extrusion: bool,
    /// Extrusion animation duration in milliseconds.
    pub extrusion_duration_ms: u64,
    /// Emits a tile-sized background quad under every tile.
    pub add_ground_plane: bool,
    /// Color of the ground plane quad.
    pub ground_plane_color: String,
    /// Copies the decoded tile's raw path geometries onto the tile.
    pub preserve_tile_paths: bool,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            fade_near: -1.0,
            fade_far: -1.0,
            edge_color: "#000000".to_string(),
            edge_color_mix: 0.6,
            edge_render_order_offset: 0.1,
            secondary_render_order_offset: 1e-7,
            corner_angle_threshold: FRAC_PI_8,
            path_length_priority_weight: 0.01,
            animate_extrusion: false,
            extrusion_duration_ms: 750,
            add_ground_plane: false,
            ground_plane_color: "#ffffff".to_string(),
            preserve_tile_paths: false,
        }
    }
}

impl MaterializerConfig {
    /// Parses a config from RON text and validates its color entries.
    ///
    /// ```
    /// use tessera_core::MaterializerConfig;
    /// let cfg = MaterializerConfig::from_ron_str("(edge_color_mix: 0.25)").unwrap();
    /// assert_eq!(cfg.edge_color_mix, 0.25);
    /// assert_eq!(cfg.extrusion_duration_ms, 750);
    /// ```
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        for (field, value) in [
            ("edge_color", &config.edge_color),
            ("ground_plane_color", &config.ground_plane_color),
        ] {
            if LinearRgba::parse(value).is_none() {
                return Err(ConfigError::InvalidColor {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(config)
    }

    /// The default outline color.
    pub fn edge_color(&self) -> LinearRgba {
        LinearRgba::parse(&self.edge_color).unwrap_or(LinearRgba::BLACK)
    }

    /// The ground plane color.
    pub fn ground_plane_color(&self) -> LinearRgba {
        LinearRgba::parse(&self.ground_plane_color).unwrap_or(LinearRgba::WHITE)
    }
}
