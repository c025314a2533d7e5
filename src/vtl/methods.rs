//! Built-in methods callable on template values.
//!
//! Names and results mirror the Java collection and string APIs that Velocity
//! templates are written against. Indexes count chars, not bytes.

use regex::Regex;
use serde_json::{Map, Value};

use super::value::{Num, display, type_name, values_equal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MethodError {
    /// No method with this name exists for the receiver's type.
    Unknown,
    /// The method exists but the arguments are wrong.
    Invalid(String),
}

type MethodResult = Result<Value, MethodError>;

fn invalid<T>(message: impl Into<String>) -> Result<T, MethodError> {
    Err(MethodError::Invalid(message.into()))
}

/// Whether `name` changes the receiver in place.
pub(crate) fn is_mutating(receiver: &Value, name: &str) -> bool {
    match receiver {
        Value::Array(_) => matches!(name, "add" | "addAll" | "remove"),
        Value::Object(_) => matches!(name, "put" | "remove"),
        _ => false,
    }
}

/// Call a method that only reads its receiver.
pub(crate) fn call(receiver: &Value, name: &str, args: &[Value]) -> MethodResult {
    if name == "toString" {
        expect_arity(name, args, 0)?;
        return Ok(Value::String(display(receiver)));
    }
    match receiver {
        Value::String(s) => string_method(s, name, args),
        Value::Array(items) => list_method(items, name, args),
        Value::Object(map) => map_method(map, name, args),
        Value::Number(_) => number_method(receiver, name, args),
        Value::Bool(_) | Value::Null => Err(MethodError::Unknown),
    }
}

/// Call a method that may change its receiver.
pub(crate) fn call_mut(receiver: &mut Value, name: &str, args: &[Value]) -> MethodResult {
    match receiver {
        Value::Array(items) => match name {
            "add" => {
                expect_arity(name, args, 1)?;
                items.push(args[0].clone());
                Ok(Value::Bool(true))
            }
            "addAll" => {
                expect_arity(name, args, 1)?;
                let Value::Array(extra) = &args[0] else {
                    return invalid(format!("addAll expects a list, got {}", type_name(&args[0])));
                };
                items.extend(extra.iter().cloned());
                Ok(Value::Bool(!extra.is_empty()))
            }
            "remove" => {
                expect_arity(name, args, 1)?;
                let index = index_arg(&args[0], items.len())?;
                Ok(items.remove(index))
            }
            _ => call(receiver, name, args),
        },
        Value::Object(map) => match name {
            "put" => {
                expect_arity(name, args, 2)?;
                let key = key_arg(&args[0])?;
                Ok(map.insert(key, args[1].clone()).unwrap_or(Value::Null))
            }
            "remove" => {
                expect_arity(name, args, 1)?;
                let key = key_arg(&args[0])?;
                Ok(map.shift_remove(&key).unwrap_or(Value::Null))
            }
            _ => call(receiver, name, args),
        },
        _ => call(receiver, name, args),
    }
}

fn expect_arity(name: &str, args: &[Value], count: usize) -> Result<(), MethodError> {
    if args.len() == count {
        Ok(())
    } else {
        invalid(format!(
            "{name} expects {count} argument{}, got {}",
            if count == 1 { "" } else { "s" },
            args.len()
        ))
    }
}

fn str_arg(value: &Value) -> Result<String, MethodError> {
    match value {
        Value::Null => invalid("Expected a string argument, got null"),
        Value::String(s) => Ok(s.clone()),
        other => Ok(display(other)),
    }
}

fn int_arg(value: &Value) -> Result<i64, MethodError> {
    match Num::of(value) {
        Some(Num::Int(i)) => Ok(i),
        _ => invalid(format!("Expected an integer argument, got {}", type_name(value))),
    }
}

fn index_arg(value: &Value, len: usize) -> Result<usize, MethodError> {
    let index = int_arg(value)?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .map_or_else(
            || invalid(format!("Index {index} out of bounds for length {len}")),
            Ok,
        )
}

fn key_arg(value: &Value) -> Result<String, MethodError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => invalid("Map keys cannot be null"),
        other => Ok(display(other)),
    }
}

fn regex_arg(value: &Value, anchored: bool) -> Result<Regex, MethodError> {
    let pattern = str_arg(value)?;
    let pattern = if anchored {
        format!("^(?:{pattern})$")
    } else {
        pattern
    };
    Regex::new(&pattern).or_else(|err| invalid(format!("Invalid regular expression: {err}")))
}

fn char_index(s: &str, needle: &str, last: bool) -> Value {
    let found = if last { s.rfind(needle) } else { s.find(needle) };
    found.map_or_else(
        || Value::from(-1),
        |byte| Value::from(s[..byte].chars().count()),
    )
}

fn string_method(s: &str, name: &str, args: &[Value]) -> MethodResult {
    let arity = |count| expect_arity(name, args, count);
    let value = match name {
        "length" | "size" => {
            arity(0)?;
            Value::from(s.chars().count())
        }
        "isEmpty" => {
            arity(0)?;
            Value::Bool(s.is_empty())
        }
        "toUpperCase" => {
            arity(0)?;
            Value::String(s.to_uppercase())
        }
        "toLowerCase" => {
            arity(0)?;
            Value::String(s.to_lowercase())
        }
        "trim" => {
            arity(0)?;
            Value::String(s.trim().to_string())
        }
        "contains" => {
            arity(1)?;
            Value::Bool(s.contains(str_arg(&args[0])?.as_str()))
        }
        "startsWith" => {
            arity(1)?;
            Value::Bool(s.starts_with(str_arg(&args[0])?.as_str()))
        }
        "endsWith" => {
            arity(1)?;
            Value::Bool(s.ends_with(str_arg(&args[0])?.as_str()))
        }
        "indexOf" => {
            arity(1)?;
            char_index(s, &str_arg(&args[0])?, false)
        }
        "lastIndexOf" => {
            arity(1)?;
            char_index(s, &str_arg(&args[0])?, true)
        }
        "substring" => substring(s, args)?,
        "replace" => {
            arity(2)?;
            Value::String(s.replace(&str_arg(&args[0])?, &str_arg(&args[1])?))
        }
        "replaceAll" => {
            arity(2)?;
            let re = regex_arg(&args[0], false)?;
            Value::String(re.replace_all(s, str_arg(&args[1])?.as_str()).into_owned())
        }
        "matches" => {
            arity(1)?;
            Value::Bool(regex_arg(&args[0], true)?.is_match(s))
        }
        "split" => {
            arity(1)?;
            let re = regex_arg(&args[0], false)?;
            let mut parts: Vec<&str> = re.split(s).collect();
            while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
                parts.pop();
            }
            Value::Array(parts.into_iter().map(Value::from).collect())
        }
        "charAt" => {
            arity(1)?;
            let len = s.chars().count();
            let index = index_arg(&args[0], len)?;
            Value::String(s.chars().nth(index).map(String::from).unwrap_or_default())
        }
        "equals" => {
            arity(1)?;
            Value::Bool(matches!(&args[0], Value::String(other) if other == s))
        }
        "equalsIgnoreCase" => {
            arity(1)?;
            Value::Bool(
                matches!(&args[0], Value::String(other) if other.to_lowercase() == s.to_lowercase()),
            )
        }
        "concat" => {
            arity(1)?;
            Value::String(format!("{s}{}", str_arg(&args[0])?))
        }
        _ => return Err(MethodError::Unknown),
    };
    Ok(value)
}

fn substring(s: &str, args: &[Value]) -> MethodResult {
    let len = s.chars().count();
    let (begin, end) = match args {
        [begin] => (int_arg(begin)?, i64::try_from(len).unwrap_or(i64::MAX)),
        [begin, end] => (int_arg(begin)?, int_arg(end)?),
        _ => return invalid(format!("substring expects 1 or 2 arguments, got {}", args.len())),
    };
    let in_range = |i: i64| usize::try_from(i).ok().filter(|i| *i <= len);
    match (in_range(begin), in_range(end)) {
        (Some(b), Some(e)) if b <= e => Ok(Value::String(s.chars().skip(b).take(e - b).collect())),
        _ => invalid(format!(
            "substring({begin}, {end}) out of range for length {len}"
        )),
    }
}

fn list_method(items: &[Value], name: &str, args: &[Value]) -> MethodResult {
    let arity = |count| expect_arity(name, args, count);
    let value = match name {
        "size" => {
            arity(0)?;
            Value::from(items.len())
        }
        "isEmpty" => {
            arity(0)?;
            Value::Bool(items.is_empty())
        }
        "get" => {
            arity(1)?;
            items[index_arg(&args[0], items.len())?].clone()
        }
        "contains" => {
            arity(1)?;
            Value::Bool(items.iter().any(|item| values_equal(item, &args[0])))
        }
        "indexOf" => {
            arity(1)?;
            items
                .iter()
                .position(|item| values_equal(item, &args[0]))
                .map_or_else(|| Value::from(-1), Value::from)
        }
        "join" => {
            arity(1)?;
            let separator = str_arg(&args[0])?;
            let parts: Vec<String> = items.iter().map(display).collect();
            Value::String(parts.join(&separator))
        }
        _ => return Err(MethodError::Unknown),
    };
    Ok(value)
}

fn map_method(map: &Map<String, Value>, name: &str, args: &[Value]) -> MethodResult {
    let arity = |count| expect_arity(name, args, count);
    let value = match name {
        "size" => {
            arity(0)?;
            Value::from(map.len())
        }
        "isEmpty" => {
            arity(0)?;
            Value::Bool(map.is_empty())
        }
        "get" => {
            arity(1)?;
            map.get(&key_arg(&args[0])?).cloned().unwrap_or(Value::Null)
        }
        "containsKey" => {
            arity(1)?;
            Value::Bool(map.contains_key(&key_arg(&args[0])?))
        }
        "containsValue" => {
            arity(1)?;
            Value::Bool(map.values().any(|v| values_equal(v, &args[0])))
        }
        "keySet" => {
            arity(0)?;
            Value::Array(map.keys().cloned().map(Value::String).collect())
        }
        "values" => {
            arity(0)?;
            Value::Array(map.values().cloned().collect())
        }
        "entrySet" => {
            arity(0)?;
            Value::Array(
                map.iter()
                    .map(|(k, v)| {
                        let mut entry = Map::new();
                        entry.insert("key".to_string(), Value::String(k.clone()));
                        entry.insert("value".to_string(), v.clone());
                        Value::Object(entry)
                    })
                    .collect(),
            )
        }
        _ => return Err(MethodError::Unknown),
    };
    Ok(value)
}

#[allow(clippy::cast_possible_truncation)]
fn number_method(receiver: &Value, name: &str, args: &[Value]) -> MethodResult {
    let Some(num) = Num::of(receiver) else {
        return Err(MethodError::Unknown);
    };
    match name {
        "intValue" => {
            expect_arity(name, args, 0)?;
            Ok(match num {
                Num::Int(i) => Value::from(i),
                Num::Float(f) => Value::from(f.trunc() as i64),
            })
        }
        "doubleValue" => {
            expect_arity(name, args, 0)?;
            Num::Float(num.as_f64())
                .into_value()
                .or_else(|message| invalid(message))
        }
        _ => Err(MethodError::Unknown),
    }
}
