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

//! Memoized evaluation and the technique-facing [`StyleAttr`] wrapper.

use super::{EvalContext, Expr, Value};
use crate::math::LinearRgba;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Entries kept per expression before the cache is flushed.
const MEMO_CAPACITY: usize = 256;

/// The inputs an [`Expr`] reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Reads the zoom level.
    pub zoom: bool,
    /// Reads the pixel-to-world scale.
    pub pixel_to_meters: bool,
    /// Feature properties read through `get` / `has`.
    pub properties: BTreeSet<String>,
}

impl Dependencies {
    /// `true` when the expression reads no input at all.
    pub fn is_empty(&self) -> bool {
        !self.zoom && !self.pixel_to_meters && self.properties.is_empty()
    }

    /// `true` when the expression reads feature properties.
    pub fn is_feature_dependent(&self) -> bool {
        !self.properties.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyAtom {
    Absent,
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    Color([u32; 4]),
}

impl From<Option<&Value>> for KeyAtom {
    fn from(value: Option<&Value>) -> Self {
        match value {
            None => KeyAtom::Absent,
            Some(Value::Null) => KeyAtom::Null,
            Some(Value::Bool(b)) => KeyAtom::Bool(*b),
            Some(Value::Number(n)) => KeyAtom::Number(n.to_bits()),
            Some(Value::String(s)) => KeyAtom::String(s.clone()),
            Some(Value::Color(c)) => {
                KeyAtom::Color([c.r.to_bits(), c.g.to_bits(), c.b.to_bits(), c.a.to_bits()])
            }
        }
    }
}

/// A compiled expression with a result cache keyed by the values of
/// exactly the inputs it depends on.
#[derive(Debug)]
pub struct MemoizedExpr {
    expr: Expr,
    deps: Dependencies,
    cache: Mutex<HashMap<Vec<KeyAtom>, Value>>,
}

impl MemoizedExpr {
    /// Wraps `expr`, computing its dependency set once.
    pub fn new(expr: Expr) -> Self {
        let deps = expr.dependencies();
        Self {
            expr,
            deps,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The inputs the expression reads.
    pub fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    fn key(&self, ctx: &EvalContext<'_>) -> Vec<KeyAtom> {
        let mut key = Vec::with_capacity(2 + self.deps.properties.len());
        if self.deps.zoom {
            key.push(KeyAtom::Number(ctx.zoom.to_bits()));
        }
        if self.deps.pixel_to_meters {
            key.push(KeyAtom::Number(ctx.pixel_to_meters.to_bits()));
        }
        for name in &self.deps.properties {
            key.push(KeyAtom::from(ctx.property(name)));
        }
        key
    }

    /// Evaluates, reusing a cached result when the dependent inputs match.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Value {
        let key = self.key(ctx);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        let value = self.expr.evaluate(ctx);
        if cache.len() >= MEMO_CAPACITY {
            cache.clear();
        }
        cache.insert(key, value.clone());
        value
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// A technique field: constant, dynamic, or a failed compile.
///
/// Deserializes from any scalar or from a JSON expression array. A failed
/// compile is logged once and evaluates to `None`, so callers fall back to
/// their static default.
#[derive(Debug, Clone)]
pub enum StyleAttr {
    /// A fixed value.
    Constant(Value),
    /// A compiled expression that reads view or feature inputs.
    Dynamic(Arc<MemoizedExpr>),
    /// The authored value did not compile.
    Invalid,
}

impl StyleAttr {
    /// Compiles a JSON field value.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(_) => match Expr::from_json(json) {
                Ok(expr) if expr.dependencies().is_empty() => {
                    StyleAttr::Constant(expr.evaluate(&EvalContext::default()))
                }
                Ok(expr) => StyleAttr::Dynamic(Arc::new(MemoizedExpr::new(expr))),
                Err(e) => {
                    log::warn!("StyleAttr: expression {json} failed to compile: {e}");
                    StyleAttr::Invalid
                }
            },
            other => match Value::from_json(other) {
                Some(value) => StyleAttr::Constant(value),
                None => {
                    log::warn!("StyleAttr: unsupported attribute value {other}");
                    StyleAttr::Invalid
                }
            },
        }
    }

    /// Evaluates the attribute; `None` when absent, null or invalid.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Option<Value> {
        let value = match self {
            StyleAttr::Constant(v) => v.clone(),
            StyleAttr::Dynamic(expr) => expr.evaluate(ctx),
            StyleAttr::Invalid => return None,
        };
        (!value.is_null()).then_some(value)
    }

    /// Evaluates as a number.
    pub fn eval_f64(&self, ctx: &EvalContext<'_>) -> Option<f64> {
        self.evaluate(ctx)?.as_f64()
    }

    /// Evaluates as an `f32`.
    pub fn eval_f32(&self, ctx: &EvalContext<'_>) -> Option<f32> {
        self.eval_f64(ctx).map(|n| n as f32)
    }

    /// Evaluates as a color.
    pub fn eval_color(&self, ctx: &EvalContext<'_>) -> Option<LinearRgba> {
        self.evaluate(ctx)?.as_color()
    }

    /// Evaluates as a boolean: booleans pass through, numbers are non-zero.
    pub fn eval_bool(&self, ctx: &EvalContext<'_>) -> Option<bool> {
        match self.evaluate(ctx)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => Some(n != 0.0),
            _ => None,
        }
    }

    /// Evaluates as a string; numbers and booleans are formatted.
    pub fn eval_string(&self, ctx: &EvalContext<'_>) -> Option<String> {
        match self.evaluate(ctx)? {
            Value::Color(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// `true` when the value can change with the view or the feature.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, StyleAttr::Dynamic(_))
    }
}

impl From<Value> for StyleAttr {
    fn from(value: Value) -> Self {
        StyleAttr::Constant(value)
    }
}

impl From<f64> for StyleAttr {
    fn from(value: f64) -> Self {
        StyleAttr::Constant(Value::Number(value))
    }
}

impl From<&str> for StyleAttr {
    fn from(value: &str) -> Self {
        StyleAttr::Constant(Value::String(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for StyleAttr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(StyleAttr::from_json(&json))
    }
}

/// Evaluates an optional attribute as `f32`.
pub fn attr_f32(attr: &Option<StyleAttr>, ctx: &EvalContext<'_>) -> Option<f32> {
    attr.as_ref().and_then(|a| a.eval_f32(ctx))
}

/// Evaluates an optional attribute as a color.
pub fn attr_color(attr: &Option<StyleAttr>, ctx: &EvalContext<'_>) -> Option<LinearRgba> {
    attr.as_ref().and_then(|a| a.eval_color(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_is_keyed_by_dependencies_only() {
        let expr = Expr::from_json(&json!(["*", ["zoom"], 2])).unwrap();
        let memo = MemoizedExpr::new(expr);
        let mut props = crate::expr::Properties::new();
        props.insert("ignored".into(), Value::Number(1.0));

        let a = memo.evaluate(&EvalContext::new(3.0, 1.0));
        let b = memo.evaluate(&EvalContext::new(3.0, 7.0).with_properties(Some(&props)));
        assert_eq!(a, Value::Number(6.0));
        assert_eq!(a, b);
        assert_eq!(memo.cached_entries(), 1);

        memo.evaluate(&EvalContext::new(4.0, 1.0));
        assert_eq!(memo.cached_entries(), 2);
    }

    #[test]
    fn constant_arrays_fold() {
        let attr = StyleAttr::from_json(&json!(["+", 1, 2]));
        assert!(matches!(attr, StyleAttr::Constant(Value::Number(n)) if n == 3.0));
    }

    #[test]
    fn failed_compile_evaluates_to_none() {
        let attr: StyleAttr = serde_json::from_value(json!(["nope", 1])).unwrap();
        assert!(matches!(attr, StyleAttr::Invalid));
        assert_eq!(attr.eval_f64(&EvalContext::default()), None);
    }

    #[test]
    fn numbers_read_as_booleans() {
        let attr = StyleAttr::from(0.0);
        assert_eq!(attr.eval_bool(&EvalContext::default()), Some(false));
        let attr = StyleAttr::from(2.0);
        assert_eq!(attr.eval_bool(&EvalContext::default()), Some(true));
    }
}
