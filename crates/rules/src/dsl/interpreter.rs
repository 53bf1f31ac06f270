//! Tree-walking interpreter over a data/flag window.
//!
//! Identifiers only ever resolve to window columns, flag level names and a
//! few constants; calls only reach the builtins matched below.

use tsqc_core::{is_missing, TimeSeriesFrame};

use super::ast::{Arg, BinaryOp, Expr, UnaryOp};
use crate::error::{QcError, Result};
use crate::flagger::{Comparator, FlagTable, Flagger};
use crate::stats::math::{nan_max, nan_mean, nan_min, nan_std, nan_sum};

/// Runtime value of a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Bool(bool),
    Array(Vec<f64>),
    Mask(Vec<bool>),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "numeric array",
            Value::Mask(_) => "boolean array",
            Value::Str(_) => "string",
        }
    }
}

/// What identifiers in an expression can see.
pub struct Scope<'a> {
    pub data: &'a TimeSeriesFrame,
    pub flags: &'a FlagTable,
    /// The variable `this` refers to.
    pub field: &'a str,
    pub flagger: &'a dyn Flagger,
    pub nodata: f64,
}

/// Evaluate `expr` to a per-sample boolean mask over the scope's window.
///
/// `source` is the expression text quoted in shape errors.
pub fn eval_condition(expr: &Expr, source: &str, scope: &Scope<'_>) -> Result<Vec<bool>> {
    match eval(expr, Some(scope))? {
        Value::Mask(mask) if mask.len() == scope.data.len() => Ok(mask),
        Value::Mask(_) | Value::Scalar(_) | Value::Bool(_) => Err(QcError::NonArrayResult {
            expression: source.to_string(),
        }),
        Value::Array(_) | Value::Str(_) => Err(QcError::NonBooleanResult {
            expression: source.to_string(),
        }),
    }
}

/// Evaluate an expression that may not reference any data, such as a
/// numeric test parameter.
pub fn eval_constant(expr: &Expr) -> Result<Value> {
    eval(expr, None)
}

fn eval(expr: &Expr, scope: Option<&Scope<'_>>) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Scalar(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Duration { text, .. } => Err(type_error(format!(
            "duration '{}' is only valid as a test parameter",
            text
        ))),
        Expr::Ident(name) => resolve(name, scope),
        Expr::Unary { op, expr } => {
            let value = eval(expr, scope)?;
            match (op, value) {
                (UnaryOp::Neg, Value::Scalar(x)) => Ok(Value::Scalar(-x)),
                (UnaryOp::Neg, Value::Array(xs)) => {
                    Ok(Value::Array(xs.into_iter().map(|x| -x).collect()))
                }
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Not, Value::Mask(m)) => {
                    Ok(Value::Mask(m.into_iter().map(|b| !b).collect()))
                }
                (op, value) => Err(type_error(format!(
                    "operator '{}' does not apply to a {}",
                    if *op == UnaryOp::Neg { "-" } else { "~" },
                    value.kind()
                ))),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, scope)?;
            let r = eval(rhs, scope)?;
            binary(*op, l, r)
        }
        Expr::Call { name, args } => call(name, args, scope),
    }
}

fn resolve(name: &str, scope: Option<&Scope<'_>>) -> Result<Value> {
    match name {
        "nan" | "NaN" | "NAN" => return Ok(Value::Scalar(f64::NAN)),
        "inf" => return Ok(Value::Scalar(f64::INFINITY)),
        _ => {}
    }
    let Some(scope) = scope else {
        return Err(QcError::UnknownVariable(name.to_string()));
    };
    let column = if name == "this" { scope.field } else { name };
    if let Some(values) = scope.data.column(column) {
        return Ok(Value::Array(
            values
                .iter()
                .map(|&v| if is_missing(v, scope.nodata) { f64::NAN } else { v })
                .collect(),
        ));
    }
    match scope.flagger.severity(name) {
        Ok(severity) => Ok(Value::Str(scope.flagger.scale().label(Some(severity)))),
        Err(_) => Err(QcError::UnknownVariable(name.to_string())),
    }
}

// ── Operators ───────────────────────────────────────────────────────

/// A broadcast operand or result: one value or one per sample.
enum Lanes<T> {
    One(T),
    Many(Vec<T>),
}

fn zip_lanes<A: Copy, B: Copy, T>(
    op: BinaryOp,
    l: Lanes<A>,
    r: Lanes<B>,
    f: impl Fn(A, B) -> T,
) -> Result<Lanes<T>> {
    Ok(match (l, r) {
        (Lanes::One(a), Lanes::One(b)) => Lanes::One(f(a, b)),
        (Lanes::Many(a), Lanes::One(b)) => Lanes::Many(a.into_iter().map(|a| f(a, b)).collect()),
        (Lanes::One(a), Lanes::Many(b)) => Lanes::Many(b.into_iter().map(|b| f(a, b)).collect()),
        (Lanes::Many(a), Lanes::Many(b)) => {
            if a.len() != b.len() {
                return Err(type_error(format!(
                    "operands of '{}' differ in length ({} vs {})",
                    op.symbol(),
                    a.len(),
                    b.len()
                )));
            }
            Lanes::Many(a.into_iter().zip(b).map(|(a, b)| f(a, b)).collect())
        }
    })
}

fn numbers(v: &Value) -> Option<Lanes<f64>> {
    match v {
        Value::Scalar(x) => Some(Lanes::One(*x)),
        Value::Array(xs) => Some(Lanes::Many(xs.clone())),
        _ => None,
    }
}

fn booleans(v: &Value) -> Option<Lanes<bool>> {
    match v {
        Value::Bool(b) => Some(Lanes::One(*b)),
        Value::Mask(m) => Some(Lanes::Many(m.clone())),
        _ => None,
    }
}

fn numeric_value(lanes: Lanes<f64>) -> Value {
    match lanes {
        Lanes::One(x) => Value::Scalar(x),
        Lanes::Many(xs) => Value::Array(xs),
    }
}

fn boolean_value(lanes: Lanes<bool>) -> Value {
    match lanes {
        Lanes::One(b) => Value::Bool(b),
        Lanes::Many(m) => Value::Mask(m),
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    let mismatch = |l: &Value, r: &Value| {
        type_error(format!(
            "operator '{}' does not apply to {} and {}",
            op.symbol(),
            l.kind(),
            r.kind()
        ))
    };

    match op {
        BinaryOp::And | BinaryOp::Or => {
            let (Some(a), Some(b)) = (booleans(&l), booleans(&r)) else {
                return Err(mismatch(&l, &r));
            };
            let and = op == BinaryOp::And;
            zip_lanes(op, a, b, |x, y| if and { x && y } else { x || y }).map(boolean_value)
        }
        _ if op.is_comparison() => {
            if let (Value::Str(a), Value::Str(b)) = (&l, &r) {
                return match op {
                    BinaryOp::Eq => Ok(Value::Bool(a == b)),
                    BinaryOp::Ne => Ok(Value::Bool(a != b)),
                    _ => Err(mismatch(&l, &r)),
                };
            }
            let (Some(a), Some(b)) = (numbers(&l), numbers(&r)) else {
                return Err(mismatch(&l, &r));
            };
            let cmp: fn(f64, f64) -> bool = match op {
                BinaryOp::Eq => |x, y| x == y,
                BinaryOp::Ne => |x, y| x != y,
                BinaryOp::Lt => |x, y| x < y,
                BinaryOp::Le => |x, y| x <= y,
                BinaryOp::Gt => |x, y| x > y,
                _ => |x, y| x >= y,
            };
            zip_lanes(op, a, b, cmp).map(boolean_value)
        }
        _ => {
            let (Some(a), Some(b)) = (numbers(&l), numbers(&r)) else {
                return Err(mismatch(&l, &r));
            };
            let arith: fn(f64, f64) -> f64 = match op {
                BinaryOp::Add => |x, y| x + y,
                BinaryOp::Sub => |x, y| x - y,
                BinaryOp::Mul => |x, y| x * y,
                BinaryOp::Div => |x, y| x / y,
                BinaryOp::Rem => |x, y| x % y,
                _ => f64::powf,
            };
            zip_lanes(op, a, b, arith).map(numeric_value)
        }
    }
}

// ── Builtins ────────────────────────────────────────────────────────

fn call(name: &str, args: &[Arg], scope: Option<&Scope<'_>>) -> Result<Value> {
    if name == "isflagged" {
        let Some(scope) = scope else {
            return Err(type_error("isflagged needs a data window"));
        };
        return isflagged(args, scope);
    }

    let [arg] = args else {
        return Err(type_error(format!("{}() takes exactly one argument", name)));
    };
    if arg.key.is_some() {
        return Err(type_error(format!("{}() takes no keyword arguments", name)));
    }
    let value = eval(&arg.value, scope)?;

    match name {
        "mean" => aggregate(name, &value, nan_mean),
        "sum" => aggregate(name, &value, nan_sum),
        "min" => aggregate(name, &value, nan_min),
        "max" => aggregate(name, &value, nan_max),
        "std" => aggregate(name, &value, nan_std),
        "abs" => match value {
            Value::Scalar(x) => Ok(Value::Scalar(x.abs())),
            Value::Array(xs) => Ok(Value::Array(xs.into_iter().map(f64::abs).collect())),
            other => Err(type_error(format!("abs() expects numbers, got a {}", other.kind()))),
        },
        "len" => match value {
            Value::Array(xs) => Ok(Value::Scalar(xs.len() as f64)),
            Value::Mask(m) => Ok(Value::Scalar(m.len() as f64)),
            Value::Str(s) => Ok(Value::Scalar(s.chars().count() as f64)),
            Value::Scalar(_) | Value::Bool(_) => Ok(Value::Scalar(1.0)),
        },
        "ismissing" => match value {
            Value::Array(xs) => Ok(Value::Mask(xs.into_iter().map(f64::is_nan).collect())),
            Value::Scalar(x) => Ok(Value::Bool(x.is_nan())),
            other => Err(type_error(format!(
                "ismissing() expects numbers, got a {}",
                other.kind()
            ))),
        },
        _ => Err(type_error(format!("unknown function '{}'", name))),
    }
}

/// NaN-aware reduction of a number or numeric array to a scalar.
fn aggregate(name: &str, value: &Value, f: fn(&[f64]) -> f64) -> Result<Value> {
    match value {
        Value::Array(xs) => Ok(Value::Scalar(f(xs))),
        Value::Scalar(x) => Ok(Value::Scalar(f(&[*x]))),
        other => Err(type_error(format!(
            "{}() expects numbers, got a {}",
            name,
            other.kind()
        ))),
    }
}

/// `isflagged(var[, flag[, comparator]])`; also accepts `field=`, `flag=`
/// and `comparator=` keywords.
fn isflagged(args: &[Arg], scope: &Scope<'_>) -> Result<Value> {
    let mut field: Option<&Expr> = None;
    let mut flag: Option<&Expr> = None;
    let mut comparator: Option<&Expr> = None;
    for (i, arg) in args.iter().enumerate() {
        let slot = match (arg.key.as_deref(), i) {
            (Some("field"), _) | (None, 0) => &mut field,
            (Some("flag"), _) | (None, 1) => &mut flag,
            (Some("comparator"), _) | (None, 2) => &mut comparator,
            (Some(other), _) => {
                return Err(type_error(format!("isflagged() got unknown argument '{}'", other)))
            }
            (None, _) => return Err(type_error("isflagged() takes at most three arguments")),
        };
        *slot = Some(&arg.value);
    }

    let column_name = match field {
        None => scope.field,
        Some(expr) => match expr.as_ident() {
            Some("this") => scope.field,
            Some(name) => name,
            None => return Err(type_error("isflagged() expects a variable name")),
        },
    };
    let column = scope
        .flags
        .column(column_name)
        .ok_or_else(|| QcError::UnknownVariable(column_name.to_string()))?;

    let flagger = scope.flagger;
    let mask = match flag {
        None => flagger.is_flagged_default(column)?,
        Some(expr) => {
            let level = match expr {
                Expr::Ident(name) | Expr::Str(name) => flagger.severity(name)?,
                other => return Err(QcError::UnknownSeverity(other.to_string())),
            };
            let cmp = match comparator {
                None => Comparator::Ge,
                Some(Expr::Str(symbol)) => symbol.parse()?,
                Some(other) => {
                    return Err(QcError::invalid(
                        "isflagged",
                        "comparator",
                        format!("expected a quoted comparator, got {}", other),
                    ))
                }
            };
            flagger.is_flagged(column, cmp, level)?
        }
    };
    Ok(Value::Mask(mask))
}

fn type_error(reason: impl Into<String>) -> QcError {
    QcError::invalid("generic", "func", reason)
}
