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

//! # Lane Abstraction
//!
//! A **Lane** is one self-contained step of tile materialization (kind
//! filtering, object building, label extraction...). Agents own the lanes,
//! fill a [`LaneContext`] with the data a step needs, and run them in order.
//!
//! ```rust,ignore
//! use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
//!
//! struct CountGroups;
//!
//! impl Lane for CountGroups {
//!     fn strategy_name(&self) -> &'static str { "CountGroups" }
//!     fn lane_kind(&self) -> LaneKind { LaneKind::Geometry }
//!
//!     fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
//!         let tile = ctx.get::<DecodedTile>().ok_or(LaneError::missing("DecodedTile"))?;
//!         let n = tile.group_count();
//!         ctx.insert(n);
//!         Ok(())
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

pub mod context_keys;
pub use context_keys::*;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The context passed to the lane lacks a required entry.
    InvalidContext {
        /// What the lane expected.
        expected: &'static str,
        /// Description of what was received.
        received: String,
    },
    /// A domain-specific error occurred during execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::InvalidContext { expected, received } => {
                write!(f, "Invalid lane context: expected {expected}, got {received}")
            }
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) => Some(e.as_ref()),
            LaneError::InvalidContext { .. } => None,
        }
    }
}

impl LaneError {
    /// A required context entry is absent.
    pub fn missing(type_name: &'static str) -> Self {
        LaneError::InvalidContext {
            expected: type_name,
            received: "not found in LaneContext".into(),
        }
    }
}

/// Classification of lanes, used for logging and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Technique enable/disable resolution.
    Filter,
    /// Object and buffer construction.
    Geometry,
    /// Material (re)evaluation.
    Material,
    /// Label candidate extraction.
    Text,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Filter => write!(f, "Filter"),
            LaneKind::Geometry => write!(f, "Geometry"),
            LaneKind::Material => write!(f, "Material"),
            LaneKind::Text => write!(f, "Text"),
        }
    }
}

/// A type-map carrying the inputs and outputs of lanes.
///
/// Values are keyed by concrete type; inserting a second value of the same
/// type replaces the first. Agents move owned data in before running a lane
/// and take it back out afterwards.
///
/// ```
/// use tessera_core::lane::LaneContext;
///
/// let mut ctx = LaneContext::new();
/// ctx.insert(42u32);
/// *ctx.get_mut::<u32>().unwrap() += 1;
/// assert_eq!(ctx.remove::<u32>(), Some(43));
/// assert!(!ctx.contains::<u32>());
/// ```
pub struct LaneContext {
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl LaneContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Inserts a value, keyed by its concrete type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) {
        self.data.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a shared reference to a value by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Returns a mutable reference to a value by type.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    /// Checks whether a value of the given type is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value by type.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        let boxed: Box<dyn Any> = self.data.remove(&TypeId::of::<T>())?;
        boxed.downcast().ok().map(|b| *b)
    }
}

impl Default for LaneContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LaneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneContext")
            .field("entries", &self.data.len())
            .finish()
    }
}

/// Base trait of every materialization step.
///
/// Lanes are shared (`&self`) and may be run for many tiles; any cache they
/// keep must be internally synchronized.
pub trait Lane: Send + Sync {
    /// Human-readable name identifying this lane's strategy.
    fn strategy_name(&self) -> &'static str;

    /// The kind of processing this lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Runs the lane on the data in `ctx`.
    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Lane for Doubler {
        fn strategy_name(&self) -> &'static str {
            "Doubler"
        }

        fn lane_kind(&self) -> LaneKind {
            LaneKind::Geometry
        }

        fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
            let value = ctx.get_mut::<u32>().ok_or(LaneError::missing("u32"))?;
            *value *= 2;
            Ok(())
        }
    }

    #[test]
    fn lane_reads_and_writes_context() {
        let mut ctx = LaneContext::new();
        ctx.insert(21u32);
        Doubler.execute(&mut ctx).unwrap();
        assert_eq!(ctx.get::<u32>(), Some(&42));
    }

    #[test]
    fn missing_entry_is_reported() {
        let err = Doubler.execute(&mut LaneContext::new()).unwrap_err();
        assert!(err.to_string().contains("u32"));
    }

    #[test]
    fn values_are_keyed_by_type() {
        let mut ctx = LaneContext::new();
        ctx.insert(1u8);
        ctx.insert(String::from("a"));
        ctx.insert(2u8);
        assert_eq!(ctx.get::<u8>(), Some(&2));
        assert_eq!(ctx.get::<String>().map(String::as_str), Some("a"));
        assert_eq!(ctx.remove::<u16>(), None);
    }
}
