//! The core whitelist: `range`, `len`, `abs`, `min`, `max`, `round`,
//! `str`, `int`, `float`, `bool`.

use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::runtime::ops::py_cmp;
use crate::runtime::value::{Value, range_item, range_len};
use super::{BuiltinProvider, as_index, check_argc, items, keyword, reject_keywords};

const EXPORTS: &[&str] = &["range", "len", "abs", "min", "max", "round", "str", "int", "float", "bool"];

pub struct CoreBuiltins;

impl BuiltinProvider for CoreBuiltins {
    fn name(&self) -> &'static str { "core" }
    fn exports(&self) -> &'static [&'static str] { EXPORTS }

    fn call(
        &self,
        name: &str,
        args: &[Value],
        keywords: &[(String, Value)],
        line: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let v = match name {
            "range" => { reject_keywords(name, keywords, &[], line)?; range(args, line)? }
            "len" => {
                check_argc(name, args, 1, 1, line)?;
                len(&args[0], line)?
            }
            "abs" => {
                check_argc(name, args, 1, 1, line)?;
                abs(&args[0], line)?
            }
            "min" | "max" => {
                reject_keywords(name, keywords, &["default"], line)?;
                extremum(name, args, keyword(keywords, "default"), line)?
            }
            "round" => {
                reject_keywords(name, keywords, &["ndigits"], line)?;
                check_argc(name, args, 1, 2, line)?;
                let ndigits = args.get(1).or(keyword(keywords, "ndigits"));
                round(&args[0], ndigits, line)?
            }
            "str" => {
                check_argc(name, args, 0, 1, line)?;
                Value::Str(args.first().map(Value::to_str).unwrap_or_default())
            }
            "int" => {
                reject_keywords(name, keywords, &["base"], line)?;
                check_argc(name, args, 0, 2, line)?;
                let base = args.get(1).or(keyword(keywords, "base"));
                match args.first() {
                    Some(v) => to_int(v, base, line)?,
                    None => Value::Int(0),
                }
            }
            "float" => {
                check_argc(name, args, 0, 1, line)?;
                match args.first() {
                    Some(v) => to_float(v, line)?,
                    None => Value::Float(0.0),
                }
            }
            "bool" => {
                check_argc(name, args, 0, 1, line)?;
                Value::Bool(args.first().is_some_and(Value::truthy))
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

// ─── Implementations ──────────────────────────────────────────────────────────

fn range(args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    check_argc("range", args, 1, 3, line)?;
    let ints = args.iter().map(|a| as_index(a, line)).collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => (0, 0, 1),
    };
    if step == 0 {
        return Err(RuntimeError::value_error(line, "range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn len(v: &Value, line: usize) -> Result<Value, RuntimeError> {
    let n = match v {
        Value::Str(s) => s.chars().count() as i64,
        Value::List(items) | Value::Tuple(items) => items.len() as i64,
        Value::Dict(pairs) => pairs.len() as i64,
        Value::Range { start, stop, step } => range_len(*start, *stop, *step),
        other => {
            return Err(RuntimeError::type_error(
                line,
                format!("object of type '{}' has no len()", other.type_name()),
            ));
        }
    };
    Ok(Value::Int(n))
}

fn abs(v: &Value, line: usize) -> Result<Value, RuntimeError> {
    match v {
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Int(i) => Ok(i.checked_abs().map(Value::Int).unwrap_or(Value::Float((*i as f64).abs()))),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(RuntimeError::type_error(
            line,
            format!("bad operand type for abs(): '{}'", other.type_name()),
        )),
    }
}

/// `min`/`max` over positional arguments, or over a single iterable.
fn extremum(name: &str, args: &[Value], default: Option<&Value>, line: usize) -> Result<Value, RuntimeError> {
    let want = if name == "min" { Ordering::Less } else { Ordering::Greater };
    let mut iter: Box<dyn Iterator<Item = Value> + '_> = match args {
        [] => return Err(RuntimeError::type_error(line, format!("{name} expected at least 1 argument, got 0"))),
        [Value::Range { start, stop, step }] => {
            let len = range_len(*start, *stop, *step);
            // ends of a non-empty range, without walking it
            let ends = (len > 0).then(|| (*start, range_item(*start, *step, len - 1)));
            Box::new(ends.into_iter().map(move |(first, last)| {
                let ascending = *step > 0;
                Value::Int(if (want == Ordering::Less) == ascending { first } else { last })
            }))
        }
        [single] => items(single, line)?,
        many => Box::new(many.iter().cloned()),
    };

    let Some(mut best) = iter.next() else {
        return default.cloned().ok_or_else(|| {
            RuntimeError::value_error(line, format!("{name}() arg is an empty sequence"))
        });
    };
    for item in iter {
        match py_cmp(&item, &best) {
            Some(ord) if ord == want => best = item,
            Some(_) => {}
            None => {
                return Err(RuntimeError::type_error(
                    line,
                    format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        if name == "min" { "<" } else { ">" },
                        item.type_name(),
                        best.type_name()
                    ),
                ));
            }
        }
    }
    Ok(best)
}

/// Python `round`: half-to-even, returning an int when `ndigits` is omitted.
/// Past this many fractional digits every finite float is already exact.
const MAX_FLOAT_DIGITS: i64 = 1100;

fn round(v: &Value, ndigits: Option<&Value>, line: usize) -> Result<Value, RuntimeError> {
    let ndigits = match ndigits {
        None | Some(Value::None) => None,
        Some(n) => Some(as_index(n, line)?),
    };

    match (v, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(v.as_i64().unwrap_or(0))),
        (Value::Int(_) | Value::Bool(_), Some(n)) if n >= 0 => Ok(Value::Int(v.as_i64().unwrap_or(0))),
        (Value::Int(_) | Value::Bool(_), Some(n)) => {
            let i = v.as_i64().unwrap_or(0);
            let Some(scale) = u32::try_from(-n).ok().and_then(|e| 10i64.checked_pow(e)) else {
                return Ok(Value::Int(0));
            };
            let rounded = (i as f64 / scale as f64).round_ties_even() as i64;
            Ok(rounded.checked_mul(scale).map(Value::Int).unwrap_or(Value::Int(0)))
        }
        (Value::Float(x), None) => float_to_int(x.round_ties_even(), line),
        (Value::Float(x), Some(n)) => {
            if !x.is_finite() || n > MAX_FLOAT_DIGITS {
                return Ok(Value::Float(*x));
            }
            if n >= 0 {
                // the decimal expansion is exact, so ties follow the stored value
                let text = format!("{:.*}", n as usize, x);
                return Ok(Value::Float(text.parse().unwrap_or(*x)));
            }
            let scale = 10f64.powi(n.max(-308).unsigned_abs() as i32);
            Ok(Value::Float((x / scale).round_ties_even() * scale))
        }
        (other, _) => Err(RuntimeError::type_error(
            line,
            format!("type {} doesn't define __round__ method", other.type_name()),
        )),
    }
}

fn float_to_int(x: f64, line: usize) -> Result<Value, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::value_error(line, "cannot convert float NaN to integer"));
    }
    if x.is_infinite() {
        return Err(RuntimeError::new(line, "OverflowError: cannot convert float infinity to integer"));
    }
    let t = x.trunc();
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Ok(Value::Int(t as i64))
    } else {
        Ok(Value::Float(t))
    }
}

/// Python `int()`: truncates floats and parses strings in the given base.
fn to_int(v: &Value, base: Option<&Value>, line: usize) -> Result<Value, RuntimeError> {
    if let Some(base) = base {
        let Value::Str(s) = v else {
            return Err(RuntimeError::type_error(line, "int() can't convert non-string with explicit base"));
        };
        let base = as_index(base, line)?;
        return parse_int(s, base as u32, line);
    }
    match v {
        Value::Bool(_) | Value::Int(_) => Ok(Value::Int(v.as_i64().unwrap_or(0))),
        Value::Float(x) => float_to_int(*x, line),
        Value::Str(s) => parse_int(s, 10, line),
        other => Err(RuntimeError::type_error(
            line,
            format!("int() argument must be a string or a real number, not '{}'", other.type_name()),
        )),
    }
}

fn parse_int(s: &str, base: u32, line: usize) -> Result<Value, RuntimeError> {
    let invalid = || RuntimeError::value_error(line, format!("invalid literal for int() with base {base}: {}", Value::Str(s.into()).repr()));
    if !(base == 0 || (2..=36).contains(&base)) {
        return Err(RuntimeError::value_error(line, "int() base must be >= 2 and <= 36, or 0"));
    }
    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = match (base, lower.get(..2)) {
        (0 | 16, Some("0x")) => (16, &lower[2..]),
        (0 | 8, Some("0o")) => (8, &lower[2..]),
        (0 | 2, Some("0b")) => (2, &lower[2..]),
        (0, _) => (10, lower.as_str()),
        (b, _) => (b, lower.as_str()),
    };
    let digits = digits.strip_prefix('_').filter(|_| radix != 10).unwrap_or(digits);
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let clean: String = digits.chars().filter(|c| *c != '_').collect();
    match i64::from_str_radix(&clean, radix) {
        Ok(n) => Ok(Value::Int(if negative { -n } else { n })),
        Err(_) if clean.chars().all(|c| c.is_digit(radix)) => {
            // too large for i64
            let approx = clean.chars().fold(0f64, |acc, c| acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64);
            Ok(Value::Float(if negative { -approx } else { approx }))
        }
        Err(_) => Err(invalid()),
    }
}

/// Python `float()`, accepting `inf`, `infinity` and `nan` in any case.
fn to_float(v: &Value, line: usize) -> Result<Value, RuntimeError> {
    match v {
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(Value::Float(v.as_f64().unwrap_or(0.0))),
        Value::Str(s) => {
            let t = s.trim();
            let lower = t.to_ascii_lowercase();
            let unsigned = lower.trim_start_matches(['+', '-']);
            let negative = lower.starts_with('-');
            let special = match unsigned {
                "inf" | "infinity" => Some(f64::INFINITY),
                "nan" => Some(f64::NAN),
                _ => None,
            };
            if let Some(x) = special.filter(|_| lower.len() - unsigned.len() <= 1) {
                return Ok(Value::Float(if negative { -x } else { x }));
            }
            let valid_underscores = !t.starts_with('_') && !t.ends_with('_') && !t.contains("__");
            match t.replace('_', "").parse::<f64>() {
                Ok(x) if valid_underscores && !t.is_empty() && !t.contains(['i', 'I', 'n', 'N']) => Ok(Value::Float(x)),
                _ => Err(RuntimeError::value_error(
                    line,
                    format!("could not convert string to float: {}", v.repr()),
                )),
            }
        }
        other => Err(RuntimeError::type_error(
            line,
            format!("float() argument must be a string or a real number, not '{}'", other.type_name()),
        )),
    }
}
