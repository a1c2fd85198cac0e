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

//! # Style Expressions
//!
//! Technique fields may hold JSON expression arrays such as
//! `["interpolate", ["linear"], ["zoom"], 10, 1, 16, 4]`. They are compiled
//! once into an [`Expr`] tree and evaluated against an [`EvalContext`].
//!
//! Compilation goes through the operator table in [`parse`]; evaluation is a
//! single `match` over the tree. [`MemoizedExpr`] and [`StyleAttr`] wrap a
//! compiled tree for use inside techniques.

mod memo;
mod parse;

pub use self::memo::{attr_color, attr_f32, Dependencies, MemoizedExpr, StyleAttr};

use crate::math::LinearRgba;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque per-feature attributes, as shipped by the decoder.
pub type Properties = BTreeMap<String, Value>;

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    String(String),
    /// Color (produced by `to-color` or color interpolation).
    Color(LinearRgba),
}

impl Value {
    /// Converts a scalar JSON value. Arrays and objects yield `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness: `false`, `0`, `null` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Color(_) => true,
        }
    }

    /// Interprets the value as a color: colors pass through, strings are
    /// parsed and numbers are read as packed `0xRRGGBB`.
    pub fn as_color(&self) -> Option<LinearRgba> {
        match self {
            Value::Color(c) => Some(*c),
            Value::String(s) => LinearRgba::parse(s),
            Value::Number(n) if *n >= 0.0 && *n <= f64::from(0xff_ffff_u32) => {
                Some(LinearRgba::from_rgb_u32(*n as u32))
            }
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Color(_) => "color",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
        }
    }
}

/// An error produced while compiling an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The operator name is not in the operator table.
    UnknownOperator(String),
    /// An array expression does not start with an operator name.
    MissingOperator,
    /// The operator received the wrong number of arguments.
    Arity {
        /// Operator name.
        op: &'static str,
        /// Human-readable arity requirement.
        expected: &'static str,
        /// Number of arguments received.
        found: usize,
    },
    /// An argument has the wrong shape.
    InvalidArgument {
        /// Operator name.
        op: &'static str,
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::UnknownOperator(op) => write!(f, "Unknown expression operator '{op}'"),
            ExprError::MissingOperator => {
                write!(f, "Expression array must start with an operator name")
            }
            ExprError::Arity {
                op,
                expected,
                found,
            } => write!(f, "'{op}' expects {expected} argument(s), got {found}"),
            ExprError::InvalidArgument { op, reason } => {
                write!(f, "Invalid argument for '{op}': {reason}")
            }
        }
    }
}

impl std::error::Error for ExprError {}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Variadic numeric operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `min`
    Min,
    /// `max`
    Max,
}

/// Curve used by `interpolate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Straight-line blend between adjacent stops.
    Linear,
    /// Exponential blend with the given base.
    Exponential(f64),
    /// Takes the lower stop's output, no blending.
    Discrete,
}

/// A compiled style expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant.
    Literal(Value),
    /// Reads a feature property.
    Get(String),
    /// Tests for a feature property.
    Has(String),
    /// The view's zoom level.
    Zoom,
    /// World units per screen pixel.
    PixelToMeters,
    /// Logical negation.
    Not(Box<Expr>),
    /// `true` when every operand is truthy.
    All(Vec<Expr>),
    /// `true` when any operand is truthy.
    Any(Vec<Expr>),
    /// Binary comparison.
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Variadic arithmetic.
    Arith(ArithOp, Vec<Expr>),
    /// Interpolates between numeric or color stops.
    Interpolate {
        /// Blending curve.
        curve: Curve,
        /// Numeric input.
        input: Box<Expr>,
        /// `(stop input, output)` pairs, ascending.
        stops: Vec<(f64, Expr)>,
    },
    /// Piecewise-constant function of `input`.
    Step {
        /// Numeric input.
        input: Box<Expr>,
        /// Output below the first stop.
        default: Box<Expr>,
        /// `(threshold, output)` pairs, ascending.
        stops: Vec<(f64, Expr)>,
    },
    /// Compares `input` against literal labels.
    Match {
        /// Value to match.
        input: Box<Expr>,
        /// `(labels, output)` arms.
        arms: Vec<(Vec<Value>, Expr)>,
        /// Output when no arm matches.
        fallback: Box<Expr>,
    },
    /// First branch whose condition is truthy.
    Case {
        /// `(condition, output)` branches.
        branches: Vec<(Expr, Expr)>,
        /// Output when no condition holds.
        fallback: Box<Expr>,
    },
    /// First non-null operand.
    Coalesce(Vec<Expr>),
    /// First operand convertible to a number.
    ToNumber(Vec<Expr>),
    /// First operand convertible to a color.
    ToColor(Vec<Expr>),
}

/// Inputs an expression can read.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Current zoom level.
    pub zoom: f64,
    /// World units per screen pixel.
    pub pixel_to_meters: f64,
    /// Feature properties, when evaluating per feature.
    pub properties: Option<&'a Properties>,
}

impl<'a> EvalContext<'a> {
    /// Creates a context without feature properties.
    pub fn new(zoom: f64, pixel_to_meters: f64) -> Self {
        Self {
            zoom,
            pixel_to_meters,
            properties: None,
        }
    }

    /// Binds feature properties.
    pub fn with_properties(mut self, properties: Option<&'a Properties>) -> Self {
        self.properties = properties;
        self
    }

    fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties.and_then(|p| p.get(name))
    }
}

impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl Expr {
    /// Compiles a JSON expression. Scalars compile to literals.
    ///
    /// ```
    /// use tessera_core::expr::{EvalContext, Expr, Value};
    /// let json = serde_json::json!(["step", ["zoom"], 1, 10, 2]);
    /// let expr = Expr::from_json(&json).unwrap();
    /// assert_eq!(expr.evaluate(&EvalContext::new(12.0, 1.0)), Value::Number(2.0));
    /// ```
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ExprError> {
        parse::parse(json)
    }

    /// Reports which inputs this expression reads.
    pub fn dependencies(&self) -> Dependencies {
        let mut deps = Dependencies::default();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut Dependencies) {
        match self {
            Expr::Literal(_) => {}
            Expr::Get(name) | Expr::Has(name) => {
                deps.properties.insert(name.clone());
            }
            Expr::Zoom => deps.zoom = true,
            Expr::PixelToMeters => deps.pixel_to_meters = true,
            Expr::Not(inner) => inner.collect_dependencies(deps),
            Expr::All(items)
            | Expr::Any(items)
            | Expr::Arith(_, items)
            | Expr::Coalesce(items)
            | Expr::ToNumber(items)
            | Expr::ToColor(items) => {
                for item in items {
                    item.collect_dependencies(deps);
                }
            }
            Expr::Compare(_, lhs, rhs) => {
                lhs.collect_dependencies(deps);
                rhs.collect_dependencies(deps);
            }
            Expr::Interpolate { input, stops, .. } => {
                input.collect_dependencies(deps);
                for (_, out) in stops {
                    out.collect_dependencies(deps);
                }
            }
            Expr::Step {
                input,
                default,
                stops,
            } => {
                input.collect_dependencies(deps);
                default.collect_dependencies(deps);
                for (_, out) in stops {
                    out.collect_dependencies(deps);
                }
            }
            Expr::Match {
                input,
                arms,
                fallback,
            } => {
                input.collect_dependencies(deps);
                for (_, out) in arms {
                    out.collect_dependencies(deps);
                }
                fallback.collect_dependencies(deps);
            }
            Expr::Case { branches, fallback } => {
                for (cond, out) in branches {
                    cond.collect_dependencies(deps);
                    out.collect_dependencies(deps);
                }
                fallback.collect_dependencies(deps);
            }
        }
    }

    /// Evaluates the expression. Type mismatches yield [`Value::Null`].
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Get(name) => ctx.property(name).cloned().unwrap_or(Value::Null),
            Expr::Has(name) => Value::Bool(ctx.property(name).is_some()),
            Expr::Zoom => Value::Number(ctx.zoom),
            Expr::PixelToMeters => Value::Number(ctx.pixel_to_meters),
            Expr::Not(inner) => Value::Bool(!inner.evaluate(ctx).is_truthy()),
            Expr::All(items) => Value::Bool(items.iter().all(|e| e.evaluate(ctx).is_truthy())),
            Expr::Any(items) => Value::Bool(items.iter().any(|e| e.evaluate(ctx).is_truthy())),
            Expr::Compare(op, lhs, rhs) => {
                Value::Bool(compare(*op, &lhs.evaluate(ctx), &rhs.evaluate(ctx)))
            }
            Expr::Arith(op, items) => arith(*op, items, ctx),
            Expr::Interpolate {
                curve,
                input,
                stops,
            } => match input.evaluate(ctx).as_f64() {
                Some(x) => interpolate(*curve, x, stops, ctx),
                None => Value::Null,
            },
            Expr::Step {
                input,
                default,
                stops,
            } => {
                let Some(x) = input.evaluate(ctx).as_f64() else {
                    return Value::Null;
                };
                stops
                    .iter()
                    .rev()
                    .find(|(threshold, _)| x >= *threshold)
                    .map(|(_, out)| out.evaluate(ctx))
                    .unwrap_or_else(|| default.evaluate(ctx))
            }
            Expr::Match {
                input,
                arms,
                fallback,
            } => {
                let value = input.evaluate(ctx);
                arms.iter()
                    .find(|(labels, _)| labels.iter().any(|l| loose_eq(l, &value)))
                    .map(|(_, out)| out.evaluate(ctx))
                    .unwrap_or_else(|| fallback.evaluate(ctx))
            }
            Expr::Case { branches, fallback } => branches
                .iter()
                .find(|(cond, _)| cond.evaluate(ctx).is_truthy())
                .map(|(_, out)| out.evaluate(ctx))
                .unwrap_or_else(|| fallback.evaluate(ctx)),
            Expr::Coalesce(items) => items
                .iter()
                .map(|e| e.evaluate(ctx))
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
            Expr::ToNumber(items) => items
                .iter()
                .find_map(|e| to_number(&e.evaluate(ctx)))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Expr::ToColor(items) => items
                .iter()
                .find_map(|e| e.evaluate(ctx).as_color())
                .map(Value::Color)
                .unwrap_or(Value::Null),
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => a == b,
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering;
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match op {
        CompareOp::Eq => loose_eq(lhs, rhs),
        CompareOp::Ne => !loose_eq(lhs, rhs),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn arith(op: ArithOp, items: &[Expr], ctx: &EvalContext<'_>) -> Value {
    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        match item.evaluate(ctx).as_f64() {
            Some(n) => numbers.push(n),
            None => return Value::Null,
        }
    }
    let Some((&first, rest)) = numbers.split_first() else {
        return Value::Null;
    };
    let result = rest.iter().fold(first, |acc, &n| match op {
        ArithOp::Add => acc + n,
        ArithOp::Sub => acc - n,
        ArithOp::Mul => acc * n,
        ArithOp::Div => acc / n,
        ArithOp::Min => acc.min(n),
        ArithOp::Max => acc.max(n),
    });
    if result.is_finite() {
        Value::Number(result)
    } else {
        Value::Null
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null | Value::Color(_) => None,
    }
}

fn interpolate(curve: Curve, x: f64, stops: &[(f64, Expr)], ctx: &EvalContext<'_>) -> Value {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Value::Null;
    };
    if x <= first.0 {
        return first.1.evaluate(ctx);
    }
    if x >= last.0 {
        return last.1.evaluate(ctx);
    }
    let Some(upper) = stops.iter().position(|(stop, _)| *stop > x) else {
        return last.1.evaluate(ctx);
    };
    let (lo_key, lo) = &stops[upper - 1];
    let (hi_key, hi) = &stops[upper];
    let range = hi_key - lo_key;
    let t = match curve {
        Curve::Discrete => return lo.evaluate(ctx),
        _ if range <= 0.0 => 0.0,
        Curve::Linear => (x - lo_key) / range,
        Curve::Exponential(base) if (base - 1.0).abs() < f64::EPSILON => (x - lo_key) / range,
        Curve::Exponential(base) => (base.powf(x - lo_key) - 1.0) / (base.powf(range) - 1.0),
    };
    blend(&lo.evaluate(ctx), &hi.evaluate(ctx), t)
}

fn blend(lo: &Value, hi: &Value, t: f64) -> Value {
    match (lo, hi) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + (b - a) * t),
        _ => match (lo.as_color(), hi.as_color()) {
            (Some(a), Some(b)) => Value::Color(LinearRgba::lerp(a, b, t as f32)),
            _ => lo.clone(),
        },
    }
}
