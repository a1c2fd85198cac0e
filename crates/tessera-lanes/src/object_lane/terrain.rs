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

//! Vertex colors of terrain meshes from height bands.

use super::builder::COLOR;
use super::ObjectBuildError;
use tessera_core::geometry::BufferAttribute;
use tessera_core::math::LinearRgba;
use tessera_core::technique::HeightBasedColors;

/// Colors every vertex of `position` by its height.
///
/// Heights between two stops blend linearly; heights outside the stops take
/// the nearest stop's color.
pub fn height_based_colors(
    position: &BufferAttribute,
    bands: &HeightBasedColors,
) -> Result<BufferAttribute, ObjectBuildError> {
    if bands.heights.is_empty() || bands.heights.len() != bands.colors.len() {
        return Err(ObjectBuildError::InvalidHeightColors(format!(
            "{} heights for {} colors",
            bands.heights.len(),
            bands.colors.len()
        )));
    }
    if bands.heights.windows(2).any(|w| w[0] > w[1]) {
        return Err(ObjectBuildError::InvalidHeightColors(
            "heights must be ascending".into(),
        ));
    }
    let colors = bands
        .colors
        .iter()
        .map(|c| {
            LinearRgba::parse(c)
                .ok_or_else(|| ObjectBuildError::InvalidHeightColors(format!("bad color `{c}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = Vec::with_capacity(position.count() * 3);
    for i in 0..position.count() {
        let color = color_at(&bands.heights, &colors, position.get(i, 2).unwrap_or(0.0));
        values.extend_from_slice(&[color.r, color.g, color.b]);
    }
    Ok(BufferAttribute::from_f32(COLOR, values, 3))
}

fn color_at(heights: &[f32], colors: &[LinearRgba], height: f32) -> LinearRgba {
    let upper = heights.partition_point(|&h| h <= height);
    match upper {
        0 => colors[0],
        n if n == heights.len() => colors[n - 1],
        n => {
            let (h0, h1) = (heights[n - 1], heights[n]);
            let t = if h1 > h0 { (height - h0) / (h1 - h0) } else { 0.0 };
            LinearRgba::lerp(colors[n - 1], colors[n], t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bands() -> HeightBasedColors {
        HeightBasedColors {
            heights: vec![0.0, 100.0],
            colors: vec!["#000000".into(), "#ffffff".into()],
        }
    }

    #[test]
    fn heights_blend_and_clamp() {
        let position = BufferAttribute::from_f32(
            "position",
            vec![0.0, 0.0, -50.0, 0.0, 0.0, 50.0, 0.0, 0.0, 500.0],
            3,
        );
        let colors = height_based_colors(&position, &bands()).unwrap();

        assert_eq!(colors.get(0, 0), Some(0.0));
        assert_relative_eq!(colors.get(1, 0).unwrap(), 0.5);
        assert_eq!(colors.get(2, 0), Some(1.0));
    }

    #[test]
    fn mismatched_stops_are_rejected() {
        let mut bad = bands();
        bad.colors.pop();
        let position = BufferAttribute::from_f32("position", vec![0.0; 3], 3);
        assert!(height_based_colors(&position, &bad).is_err());
    }
}
