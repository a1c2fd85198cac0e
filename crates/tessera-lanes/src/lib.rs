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

//! # Tessera Lanes
//!
//! The hot-path steps of tile materialization, each one a [`Lane`] that an
//! agent drives through a [`LaneContext`]:
//!
//! - [`KindFilterLane`] resolves which techniques of a decoded tile are enabled.
//! - [`ObjectLane`] merges geometry groups and builds renderable objects.
//! - [`TextLane`] extracts label candidates.
//! - [`MaterialRefreshLane`] re-evaluates dynamic material parameters.
//!
//! [`Lane`]: tessera_core::lane::Lane
//! [`LaneContext`]: tessera_core::lane::LaneContext

pub mod extrusion;
pub mod fading;
pub mod group_merge;
pub mod kind_filter;
pub mod materials;
pub mod object_lane;
pub mod text_lane;

pub use extrusion::{AnimatedExtrusionHandler, ExtrusionAnimationCoordinator};
pub use group_merge::{merge_groups, GroupRuns, MergedRun};
pub use kind_filter::{is_technique_enabled, KindFilterLane};
pub use materials::{MaterialRefreshLane, RefreshReport};
pub use object_lane::{ObjectBuildError, ObjectLane, ObjectReport};
pub use text_lane::{TextLane, TextReport, TextStyleCache};
