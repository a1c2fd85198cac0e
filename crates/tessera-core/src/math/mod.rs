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

//! Minimal math primitives needed to materialize tile geometry.
//!
//! Tile-local coordinates are expressed relative to the tile center, so `f32`
//! precision is sufficient. Angles are in **radians**.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, FRAC_PI_8, PI};

pub mod color;
pub mod vector;

pub use self::color::LinearRgba;
pub use self::vector::{Vec2, Vec3};

/// Clamps a floating-point value to the `[0.0, 1.0]` range.
#[inline]
pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Performs an approximate equality comparison using [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Symmetric ease-in-out cubic curve over `t` in `[0, 1]`.
///
/// ```
/// use tessera_core::math::ease_in_out_cubic;
/// assert_eq!(ease_in_out_cubic(0.0), 0.0);
/// assert_eq!(ease_in_out_cubic(1.0), 1.0);
/// assert_eq!(ease_in_out_cubic(0.5), 0.5);
/// ```
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = saturate(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let f = -2.0 * t + 2.0;
        1.0 - f * f * f / 2.0
    }
}
