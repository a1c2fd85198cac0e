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

//! Resolution of per-technique enabled flags from geometry-kind filters.

use log::debug;
use tessera_core::geometry::DecodedTile;
use tessera_core::lane::{KindFilterSets, Lane, LaneContext, LaneError, LaneKind};
use tessera_core::technique::{GeometryKindSet, Technique};

/// Decides whether `technique` passes the kind filter.
///
/// A technique without kind tags is always enabled. Otherwise it is enabled
/// unless `deny` matches one of its tags, and an `allow` match re-enables a
/// denied technique.
pub fn is_technique_enabled(
    technique: &Technique,
    allow: Option<&GeometryKindSet>,
    deny: Option<&GeometryKindSet>,
) -> bool {
    if technique.kind.is_empty() {
        return true;
    }
    let denied = deny.is_some_and(|set| set.has_or_intersects(&technique.kind));
    let allowed = allow.is_some_and(|set| set.has_or_intersects(&technique.kind));
    !denied || allowed
}

/// Lane computing `DecodedTile::states.enabled` once per technique.
#[derive(Debug, Default)]
pub struct KindFilterLane;

impl KindFilterLane {
    /// Creates a new `KindFilterLane`.
    pub fn new() -> Self {
        Self
    }

    /// Prepares a freshly decoded tile for materialization.
    ///
    /// Techniques whose state is already resolved keep it; a static
    /// `enabled` on the technique wins over the filter. Every group's
    /// created-offset set is cleared. Returns how many states were resolved.
    pub fn run(
        &self,
        decoded: &mut DecodedTile,
        allow: Option<&GeometryKindSet>,
        deny: Option<&GeometryKindSet>,
    ) -> usize {
        let states = &mut decoded.states.enabled;
        states.resize(decoded.techniques.len(), None);

        let mut resolved = 0;
        for (technique, state) in decoded.techniques.iter().zip(states.iter_mut()) {
            if state.is_some() {
                continue;
            }
            let enabled = technique
                .enabled
                .unwrap_or_else(|| is_technique_enabled(technique, allow, deny));
            *state = Some(enabled);
            resolved += 1;
        }

        decoded.reset_created_offsets();
        debug!(
            "KindFilterLane: resolved {resolved} of {} technique states",
            decoded.techniques.len()
        );
        resolved
    }
}

impl Lane for KindFilterLane {
    fn strategy_name(&self) -> &'static str {
        "KindFilter"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Filter
    }

    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let sets = ctx.get::<KindFilterSets>().cloned().unwrap_or_default();
        let decoded = ctx
            .get_mut::<DecodedTile>()
            .ok_or(LaneError::missing("DecodedTile"))?;

        self.run(decoded, sets.allow.as_ref(), sets.deny.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::geometry::{Geometry, GeometryType, Group};
    use tessera_core::technique::{FillParams, TechniqueParams};

    fn fill() -> Technique {
        Technique::new(TechniqueParams::Fill(FillParams::default()))
    }

    #[test]
    fn technique_without_kind_ignores_filters() {
        let everything = GeometryKindSet::new(["water", "road", "building"]);
        assert!(is_technique_enabled(&fill(), None, Some(&everything)));
    }

    #[test]
    fn deny_disables_and_allow_reenables() {
        let road = fill().with_kind(["road"]);
        let deny = GeometryKindSet::new(["road"]);
        let allow = GeometryKindSet::new(["road"]);

        assert!(!is_technique_enabled(&road, None, Some(&deny)));
        assert!(is_technique_enabled(&road, Some(&allow), Some(&deny)));
        assert!(is_technique_enabled(&road, None, None));
    }

    #[test]
    fn states_are_computed_once() {
        let mut decoded = DecodedTile::new(vec![fill().with_kind(["road"])], vec![]);
        let lane = KindFilterLane::new();

        assert_eq!(lane.run(&mut decoded, None, None), 1);
        let deny = GeometryKindSet::new(["road"]);
        assert_eq!(lane.run(&mut decoded, None, Some(&deny)), 0);
        assert!(decoded.technique_enabled(0));
    }

    #[test]
    fn static_override_wins() {
        let mut pinned = fill().with_kind(["road"]);
        pinned.enabled = Some(true);
        let mut decoded = DecodedTile::new(vec![pinned], vec![]);

        let deny = GeometryKindSet::new(["road"]);
        KindFilterLane::new().run(&mut decoded, None, Some(&deny));
        assert_eq!(decoded.states.enabled, vec![Some(true)]);
    }

    #[test]
    fn created_offsets_are_cleared() {
        let mut group = Group::new(0, 3, 0);
        group.created_offsets.insert(0);
        let geometry = Geometry::new(GeometryType::Polygon).with_group(group);
        let mut decoded = DecodedTile::new(vec![fill()], vec![geometry]);

        KindFilterLane::new().run(&mut decoded, None, None);
        assert!(decoded.geometries[0].groups[0].created_offsets.is_empty());
    }

    #[test]
    fn execute_reads_sets_from_context() {
        let mut ctx = LaneContext::new();
        ctx.insert(DecodedTile::new(vec![fill().with_kind(["water"])], vec![]));
        ctx.insert(KindFilterSets {
            allow: None,
            deny: Some(GeometryKindSet::new(["water"])),
        });

        KindFilterLane::new().execute(&mut ctx).unwrap();
        assert!(!ctx.get::<DecodedTile>().unwrap().technique_enabled(0));
    }
}
