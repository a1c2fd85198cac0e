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

//! Splitting of label paths at sharp corners.

use tessera_core::math::Vec3;

/// Splits `path` wherever its planar direction turns by more than
/// `threshold` radians.
///
/// The corner vertex ends one piece and starts the next, so consecutive
/// pieces share exactly one point. Paths with fewer than two points yield
/// nothing.
///
/// ```
/// use tessera_core::math::{Vec3, FRAC_PI_8};
/// use tessera_lanes::text_lane::split_path;
///
/// let hairpin = [
///     Vec3::new(0.0, 0.0, 0.0),
///     Vec3::new(10.0, 0.0, 0.0),
///     Vec3::new(0.0, 1.0, 0.0),
/// ];
/// let pieces = split_path(&hairpin, FRAC_PI_8);
/// assert_eq!(pieces.len(), 2);
/// assert_eq!(pieces[0].last(), pieces[1].first());
/// ```
pub fn split_path(path: &[Vec3], threshold: f32) -> Vec<Vec<Vec3>> {
    if path.len() < 2 {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for corner in 1..path.len() - 1 {
        let incoming = (path[corner] - path[corner - 1]).xy();
        let outgoing = (path[corner + 1] - path[corner]).xy();
        if incoming.angle_to(outgoing).abs() > threshold {
            pieces.push(path[start..=corner].to_vec());
            start = corner;
        }
    }
    pieces.push(path[start..].to_vec());
    pieces
}
