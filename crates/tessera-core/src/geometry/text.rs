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

//! Label geometries decoded next to the mesh buffers.

use crate::expr::Properties;
use crate::math::Vec3;

/// Point-anchored labels sharing one technique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGeometry {
    /// Technique index.
    pub technique_index: usize,
    /// Anchor of every label.
    pub positions: Vec<Vec3>,
    /// Text of every label.
    pub texts: Vec<String>,
    /// Feature id of every label.
    pub feature_ids: Option<Vec<u64>>,
    /// Feature attributes of every label.
    pub obj_infos: Option<Vec<Properties>>,
}

/// A label that follows a path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPathGeometry {
    /// Technique index.
    pub technique_index: usize,
    /// Tile-local path vertices.
    pub path: Vec<Vec3>,
    /// Label text.
    pub text: String,
    /// Feature id.
    pub feature_id: Option<u64>,
    /// Feature attributes.
    pub obj_info: Option<Properties>,
}

/// Icons, optionally with text, sharing one technique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoiGeometry {
    /// Technique index.
    pub technique_index: usize,
    /// Icon anchors; for line markers, the line they repeat along.
    pub positions: Vec<Vec3>,
    /// Text of every icon; may be empty strings.
    pub texts: Vec<String>,
    /// Per-icon image names, overriding the technique's.
    pub image_textures: Option<Vec<String>>,
    /// Feature id of every icon.
    pub feature_ids: Option<Vec<u64>>,
    /// Feature attributes of every icon.
    pub obj_infos: Option<Vec<Properties>>,
}

/// A raw feature path kept for clients that inspect tile data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathGeometry {
    /// Tile-local path vertices.
    pub path: Vec<Vec3>,
    /// Feature id.
    pub feature_id: Option<u64>,
}
