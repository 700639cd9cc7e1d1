//! Read-only sequence helpers: `list`, `tuple`, `sum`, `sorted`, `type`.

use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::runtime::ops::{binary, py_cmp};
use crate::runtime::value::{Value, range_item, range_len};
use crate::syntax::ast::BinOp;
use super::{BuiltinProvider, check_argc, items, iterate, keyword, reject_keywords};

const EXPORTS: &[&str] = &["list", "tuple", "sum", "sorted", "type"];

pub struct SequenceBuiltins;

impl BuiltinProvider for SequenceBuiltins {
    fn name(&self) -> &'static str { "sequences" }
    fn exports(&self) -> &'static [&'static str] { EXPORTS }

    fn call(
        &self,
        name: &str,
        args: &[Value],
        keywords: &[(String, Value)],
        line: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let v = match name {
            "list" | "tuple" => {
                check_argc(name, args, 0, 1, line)?;
                let items = match args.first() {
                    Some(v) => iterate(v, line)?,
                    None => Vec::new(),
                };
                if name == "list" { Value::List(items) } else { Value::Tuple(items) }
            }
            "sum" => {
                reject_keywords(name, keywords, &["start"], line)?;
                check_argc(name, args, 1, 2, line)?;
                let start = args.get(1).or(keyword(keywords, "start")).cloned().unwrap_or(Value::Int(0));
                if matches!(start, Value::Str(_)) {
                    return Err(RuntimeError::type_error(line, "sum() can't sum strings [use ''.join(seq) instead]"));
                }
                match &args[0] {
                    Value::Range { start: first, stop, step } => {
                        binary(BinOp::Add, &start, &range_sum(*first, *stop, *step), line)?
                    }
                    other => items(other, line)?
                        .try_fold(start, |acc, item| binary(BinOp::Add, &acc, &item, line))?,
                }
            }
            "sorted" => {
                reject_keywords(name, keywords, &["reverse"], line)?;
                check_argc(name, args, 1, 1, line)?;
                let reverse = keyword(keywords, "reverse").is_some_and(Value::truthy);
                Value::List(sorted(iterate(&args[0], line)?, reverse, line)?)
            }
            "type" => {
                check_argc(name, args, 1, 1, line)?;
                Value::Opaque(format!("<class '{}'>", args[0].type_name()))
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

/// Arithmetic series sum of a range, falling back to float past `i64`.
fn range_sum(start: i64, stop: i64, step: i64) -> Value {
    let len = range_len(start, stop, step);
    if len == 0 {
        return Value::Int(0);
    }
    let ends = i128::from(start) + i128::from(range_item(start, step, len - 1));
    let total = i128::from(len).checked_mul(ends).map(|t| t / 2);
    match total.map(i64::try_from) {
        Some(Ok(t)) => Value::Int(t),
        _ => Value::Float(len as f64 * ends as f64 / 2.0),
    }
}

/// Stable sort by Python ordering. `reverse` flips the comparison rather than
/// the result so equal items keep their relative order.
fn sorted(mut items: Vec<Value>, reverse: bool, line: usize) -> Result<Vec<Value>, RuntimeError> {
    let mut failure = None;
    items.sort_by(|a, b| {
        let (x, y) = if reverse { (b, a) } else { (a, b) };
        py_cmp(x, y).unwrap_or_else(|| {
            failure.get_or_insert_with(|| (x.type_name(), y.type_name()));
            Ordering::Equal
        })
    });
    match failure {
        Some((l, r)) => Err(RuntimeError::type_error(
            line,
            format!("'<' not supported between instances of '{l}' and '{r}'"),
        )),
        None => Ok(items),
    }
}
