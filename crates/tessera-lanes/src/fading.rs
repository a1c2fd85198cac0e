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

//! Fade distances of primary objects and polygon outlines.

use tessera_core::expr::{attr_color, attr_f32, EvalContext};
use tessera_core::math::{saturate, LinearRgba};
use tessera_core::technique::Technique;
use tessera_core::tile::FadingParameters;
use tessera_core::MaterializerConfig;

/// Fade distances of a technique, falling back to the configured defaults.
pub fn fading_parameters(
    technique: &Technique,
    ctx: &EvalContext<'_>,
    config: &MaterializerConfig,
) -> FadingParameters {
    FadingParameters {
        fade_near: attr_f32(&technique.fade_near, ctx).unwrap_or(config.fade_near),
        fade_far: attr_f32(&technique.fade_far, ctx).unwrap_or(config.fade_far),
    }
}

/// Everything an outline material needs from a polygon technique.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonFadingParameters {
    /// Outline color before mixing.
    pub color: LinearRgba,
    /// How much of the fill color is mixed into the outline.
    pub color_mix: f32,
    /// Fade distances of the fill.
    pub fading: FadingParameters,
    /// Fade distances of the outline.
    pub line_fading: FadingParameters,
}

/// Resolves outline color, mix and fades of a polygon technique.
///
/// Outline fades default to the fill fades, which default to the config.
pub fn polygon_fading_parameters(
    technique: &Technique,
    ctx: &EvalContext<'_>,
    config: &MaterializerConfig,
) -> PolygonFadingParameters {
    let fading = fading_parameters(technique, ctx, config);
    let Some(edges) = technique.params.edges() else {
        return PolygonFadingParameters {
            color: config.edge_color(),
            color_mix: saturate(config.edge_color_mix),
            fading,
            line_fading: fading,
        };
    };

    let color = attr_color(&edges.line_color, ctx).unwrap_or_else(|| config.edge_color());
    let color_mix = attr_f32(&edges.line_color_mix, ctx).unwrap_or(config.edge_color_mix);
    let line_fading = FadingParameters {
        fade_near: attr_f32(&edges.line_fade_near, ctx).unwrap_or(fading.fade_near),
        fade_far: attr_f32(&edges.line_fade_far, ctx).unwrap_or(fading.fade_far),
    };

    PolygonFadingParameters {
        color,
        color_mix: saturate(color_mix),
        fading,
        line_fading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::expr::StyleAttr;
    use tessera_core::technique::{FillParams, TechniqueParams};

    #[test]
    fn defaults_come_from_config() {
        let config = MaterializerConfig {
            fade_near: 0.7,
            fade_far: 0.9,
            ..MaterializerConfig::default()
        };
        let technique = Technique::new(TechniqueParams::Fill(FillParams::default()));
        let params = polygon_fading_parameters(&technique, &EvalContext::default(), &config);

        assert_eq!(params.fading.fade_near, 0.7);
        assert_eq!(params.line_fading, params.fading);
        assert_eq!(params.color, LinearRgba::BLACK);
        assert_eq!(params.color_mix, 0.6);
    }

    #[test]
    fn line_fades_override_fill_fades() {
        let mut fill = FillParams::default();
        fill.edges.line_fade_near = Some(StyleAttr::from(0.2));
        fill.edges.line_color_mix = Some(StyleAttr::from(3.0));
        let mut technique = Technique::new(TechniqueParams::Fill(fill));
        technique.fade_near = Some(StyleAttr::from(0.5));
        technique.fade_far = Some(StyleAttr::from(0.8));

        let params = polygon_fading_parameters(
            &technique,
            &EvalContext::default(),
            &MaterializerConfig::default(),
        );
        assert_eq!(params.fading.fade_near, 0.5);
        assert_eq!(params.line_fading.fade_near, 0.2);
        assert_eq!(params.line_fading.fade_far, 0.8);
        assert_eq!(params.color_mix, 1.0);
    }
}
