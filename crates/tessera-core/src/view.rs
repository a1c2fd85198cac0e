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

//! Per-view runtime values consulted while materializing.

use crate::expr::{EvalContext, Properties};

/// Snapshot of the view a tile is being materialized for.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Current (possibly fractional) zoom level.
    pub zoom_level: f32,
    /// Lowest zoom level the view allows; inherited by labels without bounds.
    pub min_zoom_level: f32,
    /// Highest zoom level the view allows; inherited by labels without bounds.
    pub max_zoom_level: f32,
    /// World units covered by one screen pixel at the current zoom.
    pub pixel_to_world: f32,
    /// Name of the data source owning the tiles.
    pub data_source: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_level: 0.0,
            min_zoom_level: 0.0,
            max_zoom_level: 20.0,
            pixel_to_world: 1.0,
            data_source: String::new(),
        }
    }
}

impl ViewState {
    /// Creates a view at `zoom_level` with default bounds and scale.
    pub fn at_zoom(zoom_level: f32) -> Self {
        Self {
            zoom_level,
            ..Self::default()
        }
    }

    /// Expression environment without feature properties.
    pub fn eval_context(&self) -> EvalContext<'_> {
        EvalContext::new(self.zoom_level as f64, self.pixel_to_world as f64)
    }

    /// Expression environment bound to one feature's properties.
    pub fn feature_context<'a>(&self, properties: Option<&'a Properties>) -> EvalContext<'a> {
        EvalContext::new(self.zoom_level as f64, self.pixel_to_world as f64)
            .with_properties(properties)
    }
}
