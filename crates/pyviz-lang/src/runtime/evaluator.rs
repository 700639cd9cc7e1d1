//! Expression evaluation. Pure: the environment is only read.
//!
//! Anything outside the supported grammar degrades instead of failing:
//! undefined names read as `0`, unsupported expressions and calls to names
//! outside the builtin whitelist evaluate to `None`.

use std::sync::LazyLock;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::runtime::builtins::BuiltinRegistry;
use crate::runtime::environment::Environment;
use crate::runtime::format::{convert, format_value};
use crate::runtime::ops;
use crate::runtime::value::{Value, range_item, range_len};
use crate::syntax::ast::{BoolOp, Expr, FStringPart};

static STANDARD_BUILTINS: LazyLock<BuiltinRegistry> = LazyLock::new(BuiltinRegistry::standard);
static DEFAULT_CONFIG: LazyLock<EngineConfig> = LazyLock::new(EngineConfig::default);

/// Evaluates with the standard builtins and default config, collapsing any
/// runtime error to `None`. Never fails.
pub fn evaluate(expr: &Expr, env: &Environment) -> Value {
    Evaluator::new(env, &STANDARD_BUILTINS, &DEFAULT_CONFIG)
        .eval(expr)
        .unwrap_or_else(|e| {
            debug!(line = e.line, error = %e.message, "expression fell back to None");
            Value::None
        })
}

pub struct Evaluator<'a> {
    env: &'a Environment,
    builtins: &'a BuiltinRegistry,
    config: &'a EngineConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a Environment, builtins: &'a BuiltinRegistry, config: &'a EngineConfig) -> Self {
        Self { env, builtins, config }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        let line = expr.span().line;
        match expr {
            Expr::Int(i, _) => Ok(Value::Int(*i)),
            Expr::Float(x, _) => Ok(Value::Float(*x)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::NoneLit(_) => Ok(Value::None),

            Expr::Name(name, _) => self.lookup(name, line),

            Expr::BinOp { left, op, right, .. } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                ops::binary(*op, &l, &r, line)
            }

            Expr::UnaryOp { op, operand, .. } => {
                let v = self.eval(operand)?;
                ops::unary(*op, &v, line)
            }

            // Returns the deciding operand, like Python.
            Expr::BoolOp { op, values, .. } => {
                let mut last = Value::None;
                for value in values {
                    last = self.eval(value)?;
                    let decided = match op {
                        BoolOp::And => !last.truthy(),
                        BoolOp::Or => last.truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }

            // `a < b < c` is `a < b and b < c`, with `b` evaluated once.
            Expr::Compare { left, ops: cmp_ops, comparators, .. } => {
                let mut lhs = self.eval(left)?;
                for (op, comparator) in cmp_ops.iter().zip(comparators) {
                    let rhs = self.eval(comparator)?;
                    if !ops::compare(*op, &lhs, &rhs, line)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }

            Expr::IfExp { test, body, orelse, .. } => {
                if self.eval(test)?.truthy() { self.eval(body) } else { self.eval(orelse) }
            }

            Expr::List(items, _) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Tuple(items, _) => Ok(Value::Tuple(self.eval_all(items)?)),

            Expr::Dict(pairs, _) => {
                let mut out: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = self.eval(k)?;
                    let value = self.eval(v)?;
                    match out.iter_mut().find(|(existing, _)| ops::py_eq(existing, &key)) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key, value)),
                    }
                }
                Ok(Value::Dict(out))
            }

            Expr::Call { func, args, keywords, .. } => {
                let Some(name) = expr.callee_name() else {
                    debug!(line, callee = %func, "call to non-name callee evaluates to None");
                    return Ok(Value::None);
                };
                if !self.builtins.contains(name) || self.env.contains(name) {
                    debug!(line, name, "call outside the builtin whitelist evaluates to None");
                    return Ok(Value::None);
                }
                let args = self.eval_all(args)?;
                let keywords = keywords
                    .iter()
                    .map(|(k, v)| -> Result<(String, Value), RuntimeError> { Ok((k.clone(), self.eval(v)?)) })
                    .collect::<Result<Vec<_>, _>>()?;
                self.builtins.call_with(name, &args, &keywords, line)
            }

            Expr::Subscript { value, index, .. } => {
                if matches!(index.as_ref(), Expr::Unsupported(..)) {
                    return Ok(Value::None);
                }
                let container = self.eval(value)?;
                let key = self.eval(index)?;
                subscript(&container, &key, line)
            }

            Expr::FString(parts, _) => Ok(Value::Str(self.render_fstring(parts, line)?)),

            Expr::Attribute { .. } | Expr::Unsupported(..) => {
                debug!(line, expr = %expr, "unsupported expression evaluates to None");
                Ok(Value::None)
            }
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(v) = self.env.get(name) {
            return Ok(v.clone());
        }
        if self.builtins.contains(name) {
            return Ok(Value::Opaque(format!("<built-in function {name}>")));
        }
        if self.config.strict {
            return Err(RuntimeError::new(line, format!("NameError: name '{name}' is not defined")));
        }
        debug!(line, name, "undefined name reads as 0");
        Ok(Value::Int(0))
    }

    fn render_fstring(&self, parts: &[FStringPart], line: usize) -> Result<String, RuntimeError> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(s) => out.push_str(s),
                FStringPart::Field { expr, conversion, spec, .. } => {
                    let mut value = self.eval(expr)?;
                    if let Some(c) = conversion {
                        value = convert(&value, *c);
                    }
                    let spec = self.render_fstring(spec, line)?;
                    out.push_str(&format_value(&value, &spec, line)?);
                }
            }
        }
        Ok(out)
    }
}

/// `container[key]` for sequences (negative indices allowed), dicts and ranges.
pub fn subscript(container: &Value, key: &Value, line: usize) -> Result<Value, RuntimeError> {
    let index_error = |what: &str| RuntimeError::new(line, format!("IndexError: {what} index out of range"));
    let as_index = |what: &str| {
        key.as_i64().ok_or_else(|| {
            RuntimeError::type_error(
                line,
                format!("{what} indices must be integers or slices, not {}", key.type_name()),
            )
        })
    };

    match container {
        Value::List(items) | Value::Tuple(items) => {
            let what = container.type_name();
            let i = normalize(as_index(what)?, items.len() as i64).ok_or_else(|| index_error(what))?;
            Ok(items[i as usize].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count() as i64;
            let i = normalize(as_index("string")?, len).ok_or_else(|| index_error("string"))?;
            Ok(s.chars().nth(i as usize).map(|c| Value::Str(c.to_string())).unwrap_or(Value::None))
        }
        Value::Dict(pairs) => ops::lookup(pairs, key)
            .cloned()
            .ok_or_else(|| RuntimeError::new(line, format!("KeyError: {}", key.repr()))),
        Value::Range { start, stop, step } => {
            let i = normalize(as_index("range object")?, range_len(*start, *stop, *step))
                .ok_or_else(|| index_error("range object"))?;
            Ok(Value::Int(range_item(*start, *step, i)))
        }
        other => Err(RuntimeError::type_error(
            line,
            format!("'{}' object is not subscriptable", other.type_name()),
        )),
    }
}

fn normalize(index: i64, len: i64) -> Option<i64> {
    let i = if index < 0 { index + len } else { index };
    (0..len).contains(&i).then_some(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_expression;

    fn eval_in(env: &Environment, src: &str) -> Result<Value, RuntimeError> {
        let expr = parse_expression(src).expect("parse failed");
        let builtins = BuiltinRegistry::standard();
        let config = EngineConfig::default();
        Evaluator::new(env, &builtins, &config).eval(&expr)
    }

    fn eval(src: &str) -> Value {
        eval_in(&Environment::new(), src).expect("eval failed")
    }

    #[test]
    fn literals_and_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("2 ** 3 ** 2"), Value::Int(512));
        assert_eq!(eval("-2 ** 2"), Value::Int(-4));
        assert_eq!(eval("7 / 2"), Value::Float(3.5));
        assert_eq!(eval("10 / 0"), Value::Int(0));
    }

    #[test]
    fn undefined_name_is_zero() {
        assert_eq!(eval("missing + 1"), Value::Int(1));
    }

    #[test]
    fn strict_mode_raises_name_error() {
        let expr = parse_expression("missing").unwrap();
        let env = Environment::new();
        let builtins = BuiltinRegistry::standard();
        let config = EngineConfig::default().with_strict(true);
        let err = Evaluator::new(&env, &builtins, &config).eval(&expr).unwrap_err();
        assert_eq!(err.message, "NameError: name 'missing' is not defined");
    }

    #[test]
    fn bool_ops_return_deciding_operand() {
        assert_eq!(eval("0 or 'x'"), Value::Str("x".into()));
        assert_eq!(eval("1 and 0"), Value::Int(0));
        assert_eq!(eval("[] and undefined_call()"), Value::List(vec![]));
    }

    #[test]
    fn chained_comparison_short_circuits() {
        assert_eq!(eval("1 < 2 < 3"), Value::Bool(true));
        assert_eq!(eval("3 < 2 < 'a'"), Value::Bool(false));
        assert!(eval_in(&Environment::new(), "1 < 'a'").is_err());
    }

    #[test]
    fn unsupported_forms_are_none() {
        assert_eq!(eval("open('f')"), Value::None);
        assert_eq!(eval("[x for x in y]"), Value::None);
        assert_eq!(eval("'abc'.upper()"), Value::None);
        assert_eq!(eval("lambda: 1"), Value::None);
    }

    #[test]
    fn whitelisted_calls() {
        assert_eq!(eval("len([1, 2, 3])"), Value::Int(3));
        assert_eq!(eval("max(range(5))"), Value::Int(4));
        assert_eq!(eval("round(2.675, ndigits=2)"), Value::Float(2.67));
    }

    #[test]
    fn subscripts() {
        assert_eq!(eval("[1, 2, 3][-1]"), Value::Int(3));
        assert_eq!(eval("'abc'[1]"), Value::Str("b".into()));
        assert_eq!(eval("{'a': 1}['a']"), Value::Int(1));
        assert_eq!(eval("range(0, 10, 2)[3]"), Value::Int(6));
        assert_eq!(eval("[1, 2][0:1]"), Value::None);
        let err = eval_in(&Environment::new(), "[1][5]").unwrap_err();
        assert_eq!(err.message, "IndexError: list index out of range");
        let err = eval_in(&Environment::new(), "{}['k']").unwrap_err();
        assert_eq!(err.message, "KeyError: 'k'");
    }

    #[test]
    fn dict_duplicate_keys_keep_first_position() {
        assert_eq!(eval("{'a': 1, 'b': 2, 'a': 3}").repr(), "{'a': 3, 'b': 2}");
    }

    #[test]
    fn fstrings_use_environment() {
        let mut env = Environment::new();
        env.set("y", Value::Int(84));
        env.set("pi", Value::Float(3.14159));
        assert_eq!(eval_in(&env, r#"f"y={y}""#).unwrap(), Value::Str("y=84".into()));
        assert_eq!(eval_in(&env, r#"f"{pi:.2f}|{y:>5}|{'s'!r}""#).unwrap(), Value::Str("3.14|   84|'s'".into()));
        assert_eq!(eval_in(&env, r#"f"{y=}""#).unwrap(), Value::Str("y=84".into()));
    }

    #[test]
    fn free_evaluate_never_fails() {
        let expr = parse_expression("'a' - 1").unwrap();
        assert_eq!(evaluate(&expr, &Environment::new()), Value::None);
    }
}
