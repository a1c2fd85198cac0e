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

//! JSON to [`Expr`] compilation through a static operator table.

use super::{ArithOp, CompareOp, Curve, Expr, ExprError, Value};
use serde_json::Value as Json;

type ParseFn = fn(&'static str, &[Json]) -> Result<Expr, ExprError>;

/// Every operator the expression language understands.
const OPERATORS: &[(&str, ParseFn)] = &[
    ("literal", parse_literal),
    ("get", parse_get),
    ("has", parse_has),
    ("zoom", parse_zoom),
    ("pixel-to-meters", parse_pixel_to_meters),
    ("!", parse_not),
    ("all", parse_all),
    ("any", parse_any),
    ("==", parse_compare),
    ("!=", parse_compare),
    ("<", parse_compare),
    ("<=", parse_compare),
    (">", parse_compare),
    (">=", parse_compare),
    ("+", parse_arith),
    ("-", parse_arith),
    ("*", parse_arith),
    ("/", parse_arith),
    ("min", parse_arith),
    ("max", parse_arith),
    ("interpolate", parse_interpolate),
    ("step", parse_step),
    ("match", parse_match),
    ("case", parse_case),
    ("coalesce", parse_coalesce),
    ("to-number", parse_to_number),
    ("to-color", parse_to_color),
];

pub(super) fn parse(json: &Json) -> Result<Expr, ExprError> {
    let Json::Array(items) = json else {
        return literal(json, "literal");
    };
    let Some((head, args)) = items.split_first() else {
        return Err(ExprError::MissingOperator);
    };
    let name = head.as_str().ok_or(ExprError::MissingOperator)?;
    let (op, parse_fn) = OPERATORS
        .iter()
        .find(|(op, _)| *op == name)
        .ok_or_else(|| ExprError::UnknownOperator(name.to_string()))?;
    parse_fn(*op, args)
}

fn literal(json: &Json, op: &'static str) -> Result<Expr, ExprError> {
    Value::from_json(json)
        .map(Expr::Literal)
        .ok_or_else(|| ExprError::InvalidArgument {
            op,
            reason: format!("'{json}' is not a scalar"),
        })
}

fn exact(op: &'static str, args: &[Json], n: usize, expected: &'static str) -> Result<(), ExprError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(ExprError::Arity {
            op,
            expected,
            found: args.len(),
        })
    }
}

fn at_least(
    op: &'static str,
    args: &[Json],
    n: usize,
    expected: &'static str,
) -> Result<(), ExprError> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(ExprError::Arity {
            op,
            expected,
            found: args.len(),
        })
    }
}

fn parse_all_args(args: &[Json]) -> Result<Vec<Expr>, ExprError> {
    args.iter().map(parse).collect()
}

fn name_arg(op: &'static str, args: &[Json]) -> Result<String, ExprError> {
    exact(op, args, 1, "1")?;
    args[0]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExprError::InvalidArgument {
            op,
            reason: "property name must be a string".into(),
        })
}

fn number_arg(op: &'static str, json: &Json) -> Result<f64, ExprError> {
    json.as_f64().ok_or_else(|| ExprError::InvalidArgument {
        op,
        reason: format!("expected a numeric stop, got '{json}'"),
    })
}

fn parse_literal(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    exact(op, args, 1, "1")?;
    literal(&args[0], op)
}

fn parse_get(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    name_arg(op, args).map(Expr::Get)
}

fn parse_has(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    name_arg(op, args).map(Expr::Has)
}

fn parse_zoom(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    exact(op, args, 0, "0")?;
    Ok(Expr::Zoom)
}

/// `["pixel-to-meters"]` or `["pixel-to-meters", n]` (scaled by `n`).
fn parse_pixel_to_meters(_op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    match args {
        [] => Ok(Expr::PixelToMeters),
        [factor] => Ok(Expr::Arith(
            ArithOp::Mul,
            vec![Expr::PixelToMeters, parse(factor)?],
        )),
        _ => Err(ExprError::Arity {
            op: "pixel-to-meters",
            expected: "0 or 1",
            found: args.len(),
        }),
    }
}

fn parse_not(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    exact(op, args, 1, "1")?;
    Ok(Expr::Not(Box::new(parse(&args[0])?)))
}

fn parse_all(_op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    Ok(Expr::All(parse_all_args(args)?))
}

fn parse_any(_op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    Ok(Expr::Any(parse_all_args(args)?))
}

fn parse_compare(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    exact(op, args, 2, "2")?;
    let cmp = match op {
        "==" => CompareOp::Eq,
        "!=" => CompareOp::Ne,
        "<" => CompareOp::Lt,
        "<=" => CompareOp::Le,
        ">" => CompareOp::Gt,
        _ => CompareOp::Ge,
    };
    Ok(Expr::Compare(
        cmp,
        Box::new(parse(&args[0])?),
        Box::new(parse(&args[1])?),
    ))
}

fn parse_arith(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    let arith = match op {
        "+" => ArithOp::Add,
        "-" => ArithOp::Sub,
        "*" => ArithOp::Mul,
        "/" => ArithOp::Div,
        "min" => ArithOp::Min,
        _ => ArithOp::Max,
    };
    let mut operands = parse_all_args(args)?;
    match (arith, operands.len()) {
        (_, 0) => Err(ExprError::Arity {
            op,
            expected: "at least 1",
            found: 0,
        }),
        (ArithOp::Sub, 1) => {
            operands.insert(0, Expr::Literal(Value::Number(0.0)));
            Ok(Expr::Arith(arith, operands))
        }
        (ArithOp::Sub | ArithOp::Div, n) if n != 2 => Err(ExprError::Arity {
            op,
            expected: "2",
            found: n,
        }),
        _ => Ok(Expr::Arith(arith, operands)),
    }
}

fn parse_stops(op: &'static str, args: &[Json]) -> Result<Vec<(f64, Expr)>, ExprError> {
    if args.len() % 2 != 0 {
        return Err(ExprError::InvalidArgument {
            op,
            reason: "stops must come in (input, output) pairs".into(),
        });
    }
    let stops = args
        .chunks_exact(2)
        .map(|pair| Ok((number_arg(op, &pair[0])?, parse(&pair[1])?)))
        .collect::<Result<Vec<_>, ExprError>>()?;
    if stops.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(ExprError::InvalidArgument {
            op,
            reason: "stop inputs must be strictly ascending".into(),
        });
    }
    Ok(stops)
}

fn parse_curve(op: &'static str, json: &Json) -> Result<Curve, ExprError> {
    let invalid = || ExprError::InvalidArgument {
        op,
        reason: format!("unsupported interpolation curve '{json}'"),
    };
    let items = json.as_array().ok_or_else(invalid)?;
    match items.as_slice() {
        [name] if name == "linear" => Ok(Curve::Linear),
        [name] if name == "discrete" => Ok(Curve::Discrete),
        [name, base] if name == "exponential" => {
            Ok(Curve::Exponential(base.as_f64().ok_or_else(invalid)?))
        }
        _ => Err(invalid()),
    }
}

fn parse_interpolate(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 4, "a curve, an input and at least one stop")?;
    Ok(Expr::Interpolate {
        curve: parse_curve(op, &args[0])?,
        input: Box::new(parse(&args[1])?),
        stops: parse_stops(op, &args[2..])?,
    })
}

fn parse_step(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 2, "an input and a default")?;
    Ok(Expr::Step {
        input: Box::new(parse(&args[0])?),
        default: Box::new(parse(&args[1])?),
        stops: parse_stops(op, &args[2..])?,
    })
}

fn parse_match(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 2, "an input and a fallback")?;
    if args.len() % 2 != 0 {
        return Err(ExprError::Arity {
            op,
            expected: "input, (label, output) pairs and a fallback",
            found: args.len(),
        });
    }
    let last = args.len() - 1;
    let arms = args[1..last]
        .chunks_exact(2)
        .map(|pair| {
            let labels = match &pair[0] {
                Json::Array(many) => many
                    .iter()
                    .map(|l| literal_value(op, l))
                    .collect::<Result<Vec<_>, _>>()?,
                single => vec![literal_value(op, single)?],
            };
            Ok((labels, parse(&pair[1])?))
        })
        .collect::<Result<Vec<_>, ExprError>>()?;
    Ok(Expr::Match {
        input: Box::new(parse(&args[0])?),
        arms,
        fallback: Box::new(parse(&args[last])?),
    })
}

fn literal_value(op: &'static str, json: &Json) -> Result<Value, ExprError> {
    Value::from_json(json).ok_or_else(|| ExprError::InvalidArgument {
        op,
        reason: format!("match label '{json}' is not a scalar"),
    })
}

fn parse_case(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    if args.len() % 2 == 0 {
        return Err(ExprError::Arity {
            op,
            expected: "(condition, output) pairs and a fallback",
            found: args.len(),
        });
    }
    let last = args.len() - 1;
    let branches = args[..last]
        .chunks_exact(2)
        .map(|pair| Ok((parse(&pair[0])?, parse(&pair[1])?)))
        .collect::<Result<Vec<_>, ExprError>>()?;
    Ok(Expr::Case {
        branches,
        fallback: Box::new(parse(&args[last])?),
    })
}

fn parse_coalesce(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 1, "at least 1")?;
    Ok(Expr::Coalesce(parse_all_args(args)?))
}

fn parse_to_number(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 1, "at least 1")?;
    Ok(Expr::ToNumber(parse_all_args(args)?))
}

fn parse_to_color(op: &'static str, args: &[Json]) -> Result<Expr, ExprError> {
    at_least(op, args, 1, "at least 1")?;
    Ok(Expr::ToColor(parse_all_args(args)?))
}
