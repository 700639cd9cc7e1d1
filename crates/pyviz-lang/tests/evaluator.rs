//! Expression evaluator tests through the public API.
//!
//! Expressions are parsed with `parse_expression` and evaluated with the
//! total `evaluate` function or an `Evaluator` over a prepared environment.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use pyviz_lang::{BuiltinRegistry, EngineConfig, Environment, Evaluator, Value, evaluate, parse_expression};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn eval(src: &str) -> Value {
    let expr = parse_expression(src).unwrap_or_else(|errs| panic!("parse of `{src}` failed: {errs:#?}"));
    evaluate(&expr, &Environment::new())
}

fn eval_env(env: &Environment, src: &str) -> Value {
    let expr = parse_expression(src).unwrap_or_else(|errs| panic!("parse of `{src}` failed: {errs:#?}"));
    evaluate(&expr, env)
}

fn eval_err(src: &str) -> String {
    let expr = parse_expression(src).unwrap_or_else(|errs| panic!("parse of `{src}` failed: {errs:#?}"));
    let env = Environment::new();
    let builtins = BuiltinRegistry::standard();
    let config = EngineConfig::default();
    match Evaluator::new(&env, &builtins, &config).eval(&expr) {
        Ok(v) => panic!("expected `{src}` to fail, got {v:?}"),
        Err(e) => e.message,
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q }
}

// ─── Arithmetic ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn int_arithmetic_matches_host(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        prop_assert_eq!(eval(&format!("({a}) + ({b})")), Value::Int(a + b));
        prop_assert_eq!(eval(&format!("({a}) - ({b})")), Value::Int(a - b));
        prop_assert_eq!(eval(&format!("({a}) * ({b})")), Value::Int(a * b));
        if b != 0 {
            prop_assert_eq!(eval(&format!("({a}) / ({b})")), Value::Float(a as f64 / b as f64));
            prop_assert_eq!(eval(&format!("({a}) // ({b})")), Value::Int(floor_div(a, b)));
            prop_assert_eq!(eval(&format!("({a}) % ({b})")), Value::Int(a - b * floor_div(a, b)));
        }
    }

    #[test]
    fn float_arithmetic_matches_host(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
        prop_assert_eq!(eval(&format!("({x:?}) + ({y:?})")), Value::Float(x + y));
        prop_assert_eq!(eval(&format!("({x:?}) - ({y:?})")), Value::Float(x - y));
        prop_assert_eq!(eval(&format!("({x:?}) * ({y:?})")), Value::Float(x * y));
        if y != 0.0 {
            prop_assert_eq!(eval(&format!("({x:?}) / ({y:?})")), Value::Float(x / y));
        }
    }

    #[test]
    fn division_by_zero_is_zero(a in -1000i64..1000) {
        prop_assert_eq!(eval(&format!("{a} / 0")), Value::Int(0));
        prop_assert_eq!(eval(&format!("{a} // 0")), Value::Int(0));
        prop_assert_eq!(eval(&format!("{a} % 0")), Value::Int(0));
        prop_assert_eq!(eval(&format!("{a}.5 / 0.0")), Value::Int(0));
    }
}

#[test]
fn python_numeric_tower() {
    assert_eq!(eval("True + 1"), Value::Int(2));
    assert_eq!(eval("1 + 2.0"), Value::Float(3.0));
    assert_eq!(eval("-7 // 2"), Value::Int(-4));
    assert_eq!(eval("-7 % 3"), Value::Int(2));
    assert_eq!(eval("7.5 // 2"), Value::Float(3.0));
    assert_eq!(eval("2 ** -1"), Value::Float(0.5));
    assert_eq!(eval("0.1 + 0.2").repr(), "0.30000000000000004");
    assert_eq!(eval("2 ** 100"), Value::Float(2f64.powi(100)));
}

#[test]
fn sequences() {
    assert_eq!(eval("'ab' * 3"), Value::Str("ababab".into()));
    assert_eq!(eval("[1] + [2]").repr(), "[1, 2]");
    assert_eq!(eval("(1,) * 2").repr(), "(1, 1)");
    assert_eq!(eval("2 in [1, 2]"), Value::Bool(true));
    assert_eq!(eval("'k' not in {'k': 1}"), Value::Bool(false));
    assert_eq!(eval("5 in range(0, 10, 5)"), Value::Bool(true));
}

// ─── Names and calls ─────────────────────────────────────────────────────────

#[test]
fn environment_lookup_and_default() {
    let mut env = Environment::new();
    env.set("x", Value::Int(42));
    assert_eq!(eval_env(&env, "x * 2"), Value::Int(84));
    assert_eq!(eval_env(&env, "nope"), Value::Int(0));
}

#[test]
fn whitelist_only() {
    assert_eq!(eval("abs(-3)"), Value::Int(3));
    assert_eq!(eval("min(4, 2, 8)"), Value::Int(2));
    assert_eq!(eval("round(2.5)"), Value::Int(2));
    assert_eq!(eval("int('12') + float('0.5')"), Value::Float(12.5));
    assert_eq!(eval("str(3.0)"), Value::Str("3.0".into()));
    assert_eq!(eval("bool([])"), Value::Bool(false));
    assert_eq!(eval("len(range(10 ** 9))"), Value::Int(1_000_000_000));
    assert_eq!(eval("input('name?')"), Value::None);
    assert_eq!(eval("print('x')"), Value::None);
}

#[test]
fn shadowed_builtin_is_not_called() {
    let mut env = Environment::new();
    env.set("len", Value::Int(3));
    assert_eq!(eval_env(&env, "len([1])"), Value::None);
}

#[test]
fn runtime_errors_carry_python_messages() {
    assert_eq!(eval_err("'a' - 1"), "TypeError: unsupported operand type(s) for -: 'str' and 'int'");
    assert_eq!(eval_err("[1, 2][7]"), "IndexError: list index out of range");
    assert_eq!(eval_err("int('x')"), "ValueError: invalid literal for int() with base 10: 'x'");
}

// ─── f-strings ───────────────────────────────────────────────────────────────

#[test]
fn fstring_formatting() {
    let mut env = Environment::new();
    env.set("n", Value::Int(1234567));
    env.set("r", Value::Float(0.256));
    env.set("w", Value::Int(8));
    assert_eq!(eval_env(&env, r#"f"{n:,}""#), Value::Str("1,234,567".into()));
    assert_eq!(eval_env(&env, r#"f"{r:.1%}""#), Value::Str("25.6%".into()));
    assert_eq!(eval_env(&env, r#"f"[{n:>{w}}]""#), Value::Str("[ 1234567]".into()));
    assert_eq!(eval_env(&env, r#"f"{n:#x}""#), Value::Str("0x12d687".into()));
    assert_eq!(eval_env(&env, r#"f"{{literal}} {n!r}""#), Value::Str("{literal} 1234567".into()));
}
