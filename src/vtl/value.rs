//! Runtime value semantics on top of `serde_json::Value`.

use std::cmp::Ordering;
use std::fmt::Write as _;

use serde_json::{Number, Value};

use super::ast::BinaryOp;

/// Text a value renders as. Nested nulls print as `null`.
pub(crate) fn display(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push('=');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn format_number(n: &Number) -> String {
    if n.is_f64() {
        n.as_f64().map_or_else(|| n.to_string(), format_float)
    } else {
        n.to_string()
    }
}

/// Floats print the way `Double.toString` does: `2.0`, `0.5`, `1.0E7`.
pub(crate) fn format_float(f: f64) -> String {
    let magnitude = f.abs();
    if f == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let plain = format!("{f}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sci = format!("{f:e}");
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
        if mantissa.contains('.') {
            format!("{mantissa}E{exponent}")
        } else {
            format!("{mantissa}.0E{exponent}")
        }
    }
}

/// How many lists and maps deep `value` goes. Scalars are 0.
pub(crate) fn nesting_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0)];
    while let Some((value, depth)) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items.iter().map(|item| (item, depth + 1))),
            Value::Object(map) => pending.extend(map.values().map(|item| (item, depth + 1))),
            _ => continue,
        }
        deepest = deepest.max(depth + 1);
    }
    deepest
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// `==` semantics: numbers compare by value, mismatched types by their text.
pub(crate) fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::Number(_)) => {
            compare(lhs, rhs).is_some_and(Ordering::is_eq)
        }
        _ if std::mem::discriminant(lhs) == std::mem::discriminant(rhs) => lhs == rhs,
        _ => display(lhs) == display(rhs),
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`. `None` when the pair is not comparable.
pub(crate) fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(_), Value::Number(_)) => match (Num::of(lhs)?, Num::of(rhs)?) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        let Value::Number(n) = value else {
            return None;
        };
        n.as_i64()
            .map(Self::Int)
            .or_else(|| n.as_f64().map(Self::Float))
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub(crate) fn into_value(self) -> Result<Value, String> {
        match self {
            Self::Int(i) => Ok(Value::from(i)),
            Self::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| format!("Arithmetic produced a non-finite number ({f})")),
        }
    }
}

/// Evaluate an arithmetic operator. `+` concatenates when either side is a string.
pub(crate) fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, String> {
    let symbol = op.symbol();
    if lhs.is_null() || rhs.is_null() {
        return Err(format!("Cannot apply '{symbol}' to null"));
    }
    if op == BinaryOp::Add && (lhs.is_string() || rhs.is_string()) {
        return Ok(Value::String(display(lhs) + &display(rhs)));
    }
    let (Some(a), Some(b)) = (Num::of(lhs), Num::of(rhs)) else {
        return Err(format!(
            "Cannot apply '{symbol}' to {} and {}",
            type_name(lhs),
            type_name(rhs)
        ));
    };
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b.as_f64() == 0.0 {
        return Err(if op == BinaryOp::Div {
            "Division by zero".to_string()
        } else {
            "Modulo by zero".to_string()
        });
    }
    let result = match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            let checked = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => x.checked_div(y),
                BinaryOp::Rem => x.checked_rem(y),
                _ => return Err(format!("'{symbol}' is not an arithmetic operator")),
            };
            Num::Int(checked.ok_or_else(|| format!("Integer overflow in '{symbol}'"))?)
        }
        (x, y) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            Num::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                BinaryOp::Rem => x % y,
                _ => return Err(format!("'{symbol}' is not an arithmetic operator")),
            })
        }
    };
    result.into_value()
}

pub(crate) fn negate(value: &Value) -> Result<Value, String> {
    match Num::of(value) {
        Some(Num::Int(i)) => i
            .checked_neg()
            .map(Value::from)
            .ok_or_else(|| "Integer overflow in '-'".to_string()),
        Some(Num::Float(f)) => Num::Float(-f).into_value(),
        None => Err(format!("Cannot negate {}", type_name(value))),
    }
}
