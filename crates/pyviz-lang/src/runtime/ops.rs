//! Operator semantics over `Value`, following Python's numeric tower:
//! bool promotes to int, int promotes to float. Integer results that overflow
//! `i64` fall back to float arithmetic instead of failing.

use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::runtime::value::{Value, range_len};
use crate::syntax::ast::{BinOp, CmpOp, UnaryOp};

/// Sequence repetition beyond this many items is refused.
pub(crate) const MAX_REPEAT_LEN: usize = 10_000_000;

#[derive(Debug, Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn of(v: &Value) -> Option<Num> {
        match v {
            Value::Bool(b) => Some(Num::I(*b as i64)),
            Value::Int(i) => Some(Num::I(*i)),
            Value::Float(x) => Some(Num::F(*x)),
            _ => None,
        }
    }

    fn f(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(x) => x,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::I(i) => i == 0,
            Num::F(x) => x == 0.0,
        }
    }
}

// ─── Binary operators ────────────────────────────────────────────────────────

pub fn binary(op: BinOp, left: &Value, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    if let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) {
        if let Some(v) = numeric(op, a, b, left, right, line)? {
            return Ok(v);
        }
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b.as_slice()].concat())),
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple([a.as_slice(), b.as_slice()].concat())),
        (BinOp::Mul, seq, n) | (BinOp::Mul, n, seq)
            if is_sequence(seq) && matches!(n, Value::Int(_) | Value::Bool(_)) =>
        {
            repeat(seq, n.as_i64().unwrap_or(0), line)
        }
        // printf-style formatting is not modelled
        (BinOp::Mod, Value::Str(_), _) => Ok(Value::None),
        _ => Err(unsupported_operands(op, left, right, line)),
    }
}

/// Arithmetic on two numbers. `Ok(None)` means the operator does not apply to numbers.
fn numeric(op: BinOp, a: Num, b: Num, left: &Value, right: &Value, line: usize)
    -> Result<Option<Value>, RuntimeError>
{
    use Num::I;

    let v = match op {
        BinOp::Add => match (a, b) {
            (I(x), I(y)) => x.checked_add(y).map(Value::Int).unwrap_or(Value::Float(x as f64 + y as f64)),
            _ => Value::Float(a.f() + b.f()),
        },
        BinOp::Sub => match (a, b) {
            (I(x), I(y)) => x.checked_sub(y).map(Value::Int).unwrap_or(Value::Float(x as f64 - y as f64)),
            _ => Value::Float(a.f() - b.f()),
        },
        BinOp::Mul => match (a, b) {
            (I(x), I(y)) => x.checked_mul(y).map(Value::Int).unwrap_or(Value::Float(x as f64 * y as f64)),
            _ => Value::Float(a.f() * b.f()),
        },
        // Division by zero yields 0 instead of raising.
        BinOp::Div if b.is_zero() => Value::Int(0),
        BinOp::Div => Value::Float(a.f() / b.f()),
        BinOp::FloorDiv if b.is_zero() => Value::Int(0),
        BinOp::FloorDiv => match (a, b) {
            (I(x), I(y)) => match x.checked_div(y) {
                Some(q) if (x % y != 0) && ((x < 0) != (y < 0)) => Value::Int(q - 1),
                Some(q) => Value::Int(q),
                None => Value::Float((x as f64 / y as f64).floor()),
            },
            _ => Value::Float((a.f() / b.f()).floor()),
        },
        BinOp::Mod if b.is_zero() => Value::Int(0),
        BinOp::Mod => match (a, b) {
            (I(x), I(y)) => Value::Int(x.checked_rem(y).map(|r| floor_mod_i(r, y)).unwrap_or(0)),
            _ => Value::Float(floor_mod_f(a.f() % b.f(), b.f())),
        },
        BinOp::Pow => power(a, b),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift => {
            let (I(x), I(y)) = (a, b) else {
                return Err(unsupported_operands(op, left, right, line));
            };
            let both_bool = matches!((left, right), (Value::Bool(_), Value::Bool(_)));
            let result = match op {
                BinOp::BitAnd => x & y,
                BinOp::BitOr => x | y,
                BinOp::BitXor => x ^ y,
                BinOp::LShift | BinOp::RShift if y < 0 => {
                    return Err(RuntimeError::value_error(line, "negative shift count"));
                }
                BinOp::LShift => return Ok(Some(shift_left(x, y))),
                _ => if y >= 64 { if x < 0 { -1 } else { 0 } } else { x >> y },
            };
            if both_bool && matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
                Value::Bool(result != 0)
            } else {
                Value::Int(result)
            }
        }
        BinOp::MatMul => return Ok(None),
    };
    Ok(Some(v))
}

fn floor_mod_i(r: i64, divisor: i64) -> i64 {
    if r != 0 && ((r < 0) != (divisor < 0)) { r + divisor } else { r }
}

fn floor_mod_f(r: f64, divisor: f64) -> f64 {
    if r != 0.0 && ((r < 0.0) != (divisor < 0.0)) { r + divisor } else { r }
}

fn power(base: Num, exp: Num) -> Value {
    match (base, exp) {
        (Num::I(b), Num::I(e)) if e >= 0 => u32::try_from(e)
            .ok()
            .and_then(|e| b.checked_pow(e))
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float((b as f64).powf(e as f64))),
        // 0 ** negative would raise ZeroDivisionError; same policy as division.
        (b, e) if b.is_zero() && e.f() < 0.0 => Value::Int(0),
        (b, e) => Value::Float(b.f().powf(e.f())),
    }
}

fn shift_left(x: i64, y: i64) -> Value {
    if x == 0 {
        return Value::Int(0);
    }
    if y < 63 {
        let shifted = x.wrapping_shl(y as u32);
        if shifted >> y == x {
            return Value::Int(shifted);
        }
    }
    Value::Float(x as f64 * 2f64.powi(y.min(i32::MAX as i64) as i32))
}

fn is_sequence(v: &Value) -> bool {
    matches!(v, Value::Str(_) | Value::List(_) | Value::Tuple(_))
}

fn repeat(seq: &Value, n: i64, line: usize) -> Result<Value, RuntimeError> {
    let n = n.max(0) as usize;
    let len = match seq {
        Value::Str(s) => s.chars().count(),
        Value::List(items) | Value::Tuple(items) => items.len(),
        _ => 0,
    };
    if len.saturating_mul(n) > MAX_REPEAT_LEN {
        return Err(RuntimeError::new(line, "MemoryError: repeated sequence is too large"));
    }
    Ok(match seq {
        Value::Str(s) => Value::Str(s.repeat(n)),
        Value::List(items) => Value::List(repeat_items(items, n)),
        Value::Tuple(items) => Value::Tuple(repeat_items(items, n)),
        other => other.clone(),
    })
}

fn repeat_items(items: &[Value], n: usize) -> Vec<Value> {
    std::iter::repeat_n(items, n).flatten().cloned().collect()
}

fn unsupported_operands(op: BinOp, left: &Value, right: &Value, line: usize) -> RuntimeError {
    RuntimeError::type_error(
        line,
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}

// ─── Unary operators ─────────────────────────────────────────────────────────

pub fn unary(op: UnaryOp, operand: &Value, line: usize) -> Result<Value, RuntimeError> {
    let bad = |sym: &str| {
        RuntimeError::type_error(line, format!("bad operand type for unary {sym}: '{}'", operand.type_name()))
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
        UnaryOp::Neg => match Num::of(operand) {
            Some(Num::I(i)) => Ok(i.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(i as f64)))),
            Some(Num::F(x)) => Ok(Value::Float(-x)),
            None => Err(bad("-")),
        },
        UnaryOp::Pos => match Num::of(operand) {
            Some(Num::I(i)) => Ok(Value::Int(i)),
            Some(Num::F(x)) => Ok(Value::Float(x)),
            None => Err(bad("+")),
        },
        UnaryOp::Invert => match Num::of(operand) {
            Some(Num::I(i)) => Ok(Value::Int(!i)),
            _ => Err(bad("~")),
        },
    }
}

// ─── Comparison ──────────────────────────────────────────────────────────────

pub fn compare(op: CmpOp, left: &Value, right: &Value, line: usize) -> Result<bool, RuntimeError> {
    let ordering = |accept: fn(Ordering) -> bool| -> Result<bool, RuntimeError> {
        match py_cmp(left, right) {
            Some(ord) => Ok(accept(ord)),
            // NaN compares false against everything
            None if Num::of(left).is_some() && Num::of(right).is_some() => Ok(false),
            None => Err(RuntimeError::type_error(
                line,
                format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
            )),
        }
    };

    match op {
        CmpOp::Eq => Ok(py_eq(left, right)),
        CmpOp::NotEq => Ok(!py_eq(left, right)),
        CmpOp::Lt => ordering(Ordering::is_lt),
        CmpOp::LtEq => ordering(Ordering::is_le),
        CmpOp::Gt => ordering(Ordering::is_gt),
        CmpOp::GtEq => ordering(Ordering::is_ge),
        CmpOp::In => contains(right, left, line),
        CmpOp::NotIn => contains(right, left, line).map(|b| !b),
        CmpOp::Is => Ok(is_same(left, right)),
        CmpOp::IsNot => Ok(!is_same(left, right)),
    }
}

/// Python `==`.
pub fn py_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (Num::of(a), Num::of(b)) {
        return match (x, y) {
            (Num::I(x), Num::I(y)) => x == y,
            _ => x.f() == y.f(),
        };
    }
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| py_eq(p, q))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| lookup(y, k).is_some_and(|other| py_eq(v, other)))
        }
        (Value::Range { start: s1, stop: e1, step: d1 }, Value::Range { start: s2, stop: e2, step: d2 }) => {
            // same items: both empty, or same first item, length and (if it matters) step
            let (n1, n2) = (range_len(*s1, *e1, *d1), range_len(*s2, *e2, *d2));
            n1 == n2 && (n1 == 0 || (s1 == s2 && (n1 == 1 || d1 == d2)))
        }
        (Value::Opaque(x), Value::Opaque(y)) => x == y,
        _ => false,
    }
}

/// Python ordering for `<`-style comparisons, `sorted`, `min` and `max`.
/// `None` when the two values are not orderable.
pub fn py_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (Num::of(a), Num::of(b)) {
        return match (x, y) {
            (Num::I(x), Num::I(y)) => Some(x.cmp(&y)),
            _ => x.f().partial_cmp(&y.f()),
        };
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            for (p, q) in x.iter().zip(y) {
                if !py_eq(p, q) {
                    return py_cmp(p, q);
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

fn is_same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::None | Value::Bool(_), _) | (_, Value::None | Value::Bool(_)) => false,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b) && py_eq(a, b),
    }
}

/// Python `item in container`.
pub fn contains(container: &Value, item: &Value, line: usize) -> Result<bool, RuntimeError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(RuntimeError::type_error(
                line,
                format!("'in <string>' requires string as left operand, not {}", other.type_name()),
            )),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().any(|v| py_eq(v, item))),
        Value::Dict(pairs) => Ok(lookup(pairs, item).is_some()),
        Value::Range { start, stop, step } => {
            let n = match item {
                Value::Float(x) if x.fract() == 0.0 => *x as i64,
                other => match other.as_i64() {
                    Some(n) => n,
                    None => return Ok(false),
                },
            };
            let in_bounds = if *step > 0 { n >= *start && n < *stop } else { n <= *start && n > *stop };
            Ok(in_bounds && (i128::from(n) - i128::from(*start)) % i128::from(*step) == 0)
        }
        other => Err(RuntimeError::type_error(
            line,
            format!("argument of type '{}' is not iterable", other.type_name()),
        )),
    }
}

/// Dict lookup with Python key equality (`1`, `1.0` and `True` are the same key).
pub fn lookup<'v>(pairs: &'v [(Value, Value)], key: &Value) -> Option<&'v Value> {
    pairs.iter().find(|(k, _)| py_eq(k, key)).map(|(_, v)| v)
}
