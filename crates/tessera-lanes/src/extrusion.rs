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

//! Animated extrusion of buildings.
//!
//! Every extruded-polygon technique of a tile forms one animation group: its
//! mesh, depth pre-pass and outline share a single [`ExtrusionRatio`] that
//! grows from 0 to 1 over the group's duration.

use log::{debug, trace};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tessera_core::expr::EvalContext;
use tessera_core::math::ease_in_out_cubic;
use tessera_core::technique::{Technique, TechniqueParams};
use tessera_core::tile::{ExtrusionGroupKey, ExtrusionRatio, MaterialId, Tile, TileKey};
use tessera_core::MaterializerConfig;

#[derive(Debug)]
struct ExtrusionAnimation {
    ratio: ExtrusionRatio,
    duration_ms: f64,
    elapsed_ms: f64,
}

impl ExtrusionAnimation {
    fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// Drives the extrusion ratio of every registered group.
///
/// Shared between the materializer (which registers groups) and the frame
/// loop (which calls [`update`](Self::update)).
#[derive(Debug)]
pub struct AnimatedExtrusionHandler {
    enabled: bool,
    duration_ms: f64,
    groups: Mutex<BTreeMap<ExtrusionGroupKey, ExtrusionAnimation>>,
}

impl Default for AnimatedExtrusionHandler {
    fn default() -> Self {
        Self::from_config(&MaterializerConfig::default())
    }
}

impl AnimatedExtrusionHandler {
    /// Creates a handler with the default enable flag and duration.
    pub fn new(enabled: bool, duration_ms: f64) -> Self {
        Self {
            enabled,
            duration_ms: duration_ms.max(0.0),
            groups: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates a handler from `animate_extrusion` and `extrusion_duration_ms`.
    pub fn from_config(config: &MaterializerConfig) -> Self {
        Self::new(config.animate_extrusion, config.extrusion_duration_ms as f64)
    }

    /// Whether a technique animates, given its own (optional) flag.
    pub fn should_animate(&self, flag: Option<bool>) -> bool {
        flag.unwrap_or(self.enabled)
    }

    /// Duration used when a technique does not set one.
    pub fn default_duration_ms(&self) -> f64 {
        self.duration_ms
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ExtrusionGroupKey, ExtrusionAnimation>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the ratio of group `key`, creating it at 0 if needed.
    pub fn register(&self, key: ExtrusionGroupKey, duration_ms: f64) -> ExtrusionRatio {
        let mut groups = self.lock();
        let animation = groups.entry(key).or_insert_with(|| {
            trace!(
                "AnimatedExtrusionHandler: new group {}:{} technique {} ({duration_ms} ms)",
                key.tile,
                key.offset,
                key.technique_index
            );
            let duration_ms = duration_ms.max(0.0);
            ExtrusionAnimation {
                ratio: ExtrusionRatio::new(if duration_ms > 0.0 { 0.0 } else { 1.0 }),
                duration_ms,
                elapsed_ms: 0.0,
            }
        });
        animation.ratio.clone()
    }

    /// Advances every animation by `dt_ms`. Returns how many are still running.
    pub fn update(&self, dt_ms: f64) -> usize {
        let mut running = 0;
        for animation in self.lock().values_mut() {
            if animation.is_finished() {
                continue;
            }
            animation.elapsed_ms += dt_ms.max(0.0);
            let t = if animation.duration_ms > 0.0 {
                (animation.elapsed_ms / animation.duration_ms) as f32
            } else {
                1.0
            };
            animation.ratio.set(ease_in_out_cubic(t));
            if !animation.is_finished() {
                running += 1;
            }
        }
        running
    }

    /// Whether any group is still growing.
    pub fn is_animating(&self) -> bool {
        self.lock().values().any(|a| !a.is_finished())
    }

    /// Current ratio of a group.
    pub fn ratio(&self, key: &ExtrusionGroupKey) -> Option<f32> {
        self.lock().get(key).map(|a| a.ratio.get())
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.lock().len()
    }

    /// Forgets the given groups, typically those of a disposed tile.
    pub fn remove_groups(&self, keys: &[ExtrusionGroupKey]) -> usize {
        let mut groups = self.lock();
        keys.iter().filter(|k| groups.remove(*k).is_some()).count()
    }

    /// Forgets every group of one tile instance.
    pub fn remove_tile(&self, tile: TileKey, offset: i32) -> usize {
        let mut groups = self.lock();
        let before = groups.len();
        groups.retain(|k, _| !(k.tile == tile && k.offset == offset));
        let removed = before - groups.len();
        if removed > 0 {
            debug!("AnimatedExtrusionHandler: dropped {removed} group(s) of tile {tile}:{offset}");
        }
        removed
    }
}

/// Collects the objects and materials of one extrusion group while a tile
/// is being materialized, then registers them as a single unit.
#[derive(Debug)]
pub struct ExtrusionAnimationCoordinator {
    key: ExtrusionGroupKey,
    duration_ms: f64,
    objects: Vec<usize>,
    materials: Vec<MaterialId>,
}

impl ExtrusionAnimationCoordinator {
    /// Starts a group for technique `technique_index` of `tile`, or returns
    /// `None` when the technique is not an animated extruded polygon.
    pub fn begin(
        tile: &Tile,
        technique: &Technique,
        technique_index: usize,
        handler: &AnimatedExtrusionHandler,
        ctx: &EvalContext<'_>,
    ) -> Option<Self> {
        let TechniqueParams::ExtrudedPolygon(params) = &technique.params else {
            return None;
        };
        let flag = params
            .animate_extrusion
            .as_ref()
            .and_then(|attr| attr.eval_bool(ctx));
        if !handler.should_animate(flag) {
            return None;
        }
        Some(Self {
            key: ExtrusionGroupKey {
                tile: tile.key,
                offset: tile.offset,
                technique_index,
            },
            duration_ms: params
                .animate_extrusion_duration
                .unwrap_or_else(|| handler.default_duration_ms()),
            objects: Vec::new(),
            materials: Vec::new(),
        })
    }

    /// Adds the object at `object_index` of `tile.objects` and its material.
    pub fn add(&mut self, object_index: usize, material: MaterialId) {
        self.objects.push(object_index);
        if !self.materials.contains(&material) {
            self.materials.push(material);
        }
    }

    /// The group key.
    pub fn key(&self) -> ExtrusionGroupKey {
        self.key
    }

    /// Registers the group with `handler` and wires its shared ratio into
    /// every collected material and object.
    pub fn finish(self, tile: &mut Tile, handler: &AnimatedExtrusionHandler) -> ExtrusionRatio {
        let ratio = handler.register(self.key, self.duration_ms);
        for id in &self.materials {
            if let Some(material) = tile.materials.get_mut(*id) {
                material.extrusion = Some(ratio.clone());
            }
        }
        for &index in &self.objects {
            if let Some(object) = tile.objects.get_mut(index) {
                object.extrusion_group = Some(self.key);
            }
        }
        if !tile.extrusion_groups.contains(&self.key) {
            tile.extrusion_groups.push(self.key);
        }
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn key(technique_index: usize) -> ExtrusionGroupKey {
        ExtrusionGroupKey {
            tile: TileKey::new(14, 1, 2),
            offset: 0,
            technique_index,
        }
    }

    #[test]
    fn ratio_eases_to_one() {
        let handler = AnimatedExtrusionHandler::new(true, 100.0);
        let ratio = handler.register(key(0), 100.0);
        assert_eq!(ratio.get(), 0.0);

        assert_eq!(handler.update(50.0), 1);
        assert_relative_eq!(ratio.get(), 0.5);
        assert_eq!(handler.update(60.0), 0);
        assert_eq!(ratio.get(), 1.0);
        assert!(!handler.is_animating());
    }

    #[test]
    fn registering_twice_shares_the_ratio() {
        let handler = AnimatedExtrusionHandler::default();
        let a = handler.register(key(1), 200.0);
        let b = handler.register(key(1), 999.0);
        assert!(a.same_as(&b));
        assert_eq!(handler.group_count(), 1);
    }

    #[test]
    fn zero_duration_starts_finished() {
        let handler = AnimatedExtrusionHandler::default();
        assert_eq!(handler.register(key(0), 0.0).get(), 1.0);
        assert_eq!(handler.update(16.0), 0);
    }

    #[test]
    fn remove_tile_only_drops_its_groups() {
        let handler = AnimatedExtrusionHandler::default();
        handler.register(key(0), 10.0);
        handler.register(key(1), 10.0);
        handler.register(
            ExtrusionGroupKey {
                offset: 1,
                ..key(0)
            },
            10.0,
        );

        assert_eq!(handler.remove_tile(TileKey::new(14, 1, 2), 0), 2);
        assert_eq!(handler.group_count(), 1);
    }

    #[test]
    fn technique_flag_overrides_default() {
        let handler = AnimatedExtrusionHandler::new(false, 750.0);
        assert!(!handler.should_animate(None));
        assert!(handler.should_animate(Some(true)));
    }
}
