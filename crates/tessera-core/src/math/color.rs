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

//! Defines the `LinearRgba` color type and the style-sheet color syntax.

/// A color in **linear RGBA** space with `f32` components.
///
/// Style sheets author colors in sRGB (`#rrggbb`, `rgb(...)`); parsing converts
/// the RGB channels to linear space so that mixing (edge color mix, terrain
/// gradients) happens in a physically meaningful space.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component in linear space.
    pub r: f32,
    /// The green component in linear space.
    pub g: f32,
    /// The blue component in linear space.
    pub b: f32,
    /// The alpha (opacity) component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Creates a color from explicit linear components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from linear components.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses a style-sheet color.
    ///
    /// Accepted forms: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and
    /// `rgba(r, g, b, a)` with 0-255 channels and a 0-1 alpha. Returns `None`
    /// for anything else.
    ///
    /// ```
    /// use tessera_core::math::LinearRgba;
    /// assert_eq!(LinearRgba::parse("#fff"), Some(LinearRgba::WHITE));
    /// assert_eq!(LinearRgba::parse("rgb(0, 0, 0)"), Some(LinearRgba::BLACK));
    /// assert!(LinearRgba::parse("blue-ish").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let (body, has_alpha) = if let Some(rest) = text.strip_prefix("rgba(") {
            (rest.strip_suffix(')')?, true)
        } else if let Some(rest) = text.strip_prefix("rgb(") {
            (rest.strip_suffix(')')?, false)
        } else {
            return None;
        };
        let parts: Vec<f32> = body
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;
        match (parts.as_slice(), has_alpha) {
            ([r, g, b], false) => Some(Self::from_srgb8(*r, *g, *b, 1.0)),
            ([r, g, b, a], true) => Some(Self::from_srgb8(*r, *g, *b, *a)),
            _ => None,
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f32::from);
        match hex.len() {
            3 => {
                let mut c = hex.chars().map(|ch| ch.to_digit(16).map(|d| (d * 17) as f32));
                let (r, g, b) = (c.next()??, c.next()??, c.next()??);
                Some(Self::from_srgb8(r, g, b, 1.0))
            }
            6 | 8 => {
                let r = channel(&hex[0..2])?;
                let g = channel(&hex[2..4])?;
                let b = channel(&hex[4..6])?;
                let a = if hex.len() == 8 {
                    channel(&hex[6..8])? / 255.0
                } else {
                    1.0
                };
                Some(Self::from_srgb8(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Builds a color from a packed `0xRRGGBB` integer, as style sheets store numeric colors.
    pub fn from_rgb_u32(packed: u32) -> Self {
        Self::from_srgb8(
            ((packed >> 16) & 0xff) as f32,
            ((packed >> 8) & 0xff) as f32,
            (packed & 0xff) as f32,
            1.0,
        )
    }

    #[inline]
    fn from_srgb8(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: srgb_to_linear(r / 255.0),
            g: srgb_to_linear(g / 255.0),
            b: srgb_to_linear(b / 255.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Returns the same color with a different alpha.
    #[inline]
    pub fn with_alpha(&self, a: f32) -> Self {
        Self { a, ..*self }
    }

    /// Linearly interpolates between two colors; `t` is clamped to `[0, 1]`.
    #[inline]
    pub fn lerp(start: Self, end: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: start.r + (end.r - start.r) * t,
            g: start.g + (end.g - start.g) * t,
            b: start.b + (end.b - start.b) * t,
            a: start.a + (end.a - start.a) * t,
        }
    }
}

impl Default for LinearRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
