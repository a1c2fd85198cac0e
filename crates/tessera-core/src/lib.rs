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

//! # Tessera Core
//!
//! Foundational crate containing the decoded-tile data model, the style
//! expression language, and the interface contracts shared by the
//! materialization lanes and the tile-loading agents.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod expr;
pub mod geometry;
pub mod lane;
pub mod loader;
pub mod math;
pub mod technique;
pub mod tile;
pub mod view;

pub use config::MaterializerConfig;
pub use view::ViewState;
