//! End-to-end execution tests.
//!
//! Source text goes through `Session::execute`; the resulting variable
//! snapshot and element list are inspected.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use pyviz_lang::{ElementKind, EngineConfig, ExecutionResult, Session, Value, VisualElement, execute};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn run(src: &str) -> ExecutionResult {
    let result = execute(src);
    if !result.success {
        panic!("execution of {src:?} failed: {:?}", result.error);
    }
    result
}

fn run_with(config: EngineConfig, src: &str) -> ExecutionResult {
    Session::new(config).execute(src)
}

fn var<'a>(result: &'a ExecutionResult, name: &str) -> &'a Value {
    result
        .variables
        .get(name)
        .unwrap_or_else(|| panic!("variable `{name}` not bound; have {:?}", result.variables.keys().collect::<Vec<_>>()))
}

fn of_kind(result: &ExecutionResult, kind: ElementKind) -> Vec<&VisualElement> {
    result.elements.iter().filter(|e| e.kind == kind).collect()
}

fn texts(result: &ExecutionResult, kind: ElementKind) -> Vec<&str> {
    of_kind(result, kind).into_iter().map(|e| e.text.as_str()).collect()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn fstring_print_scenario() {
    let result = run("x = 42\ny = x * 2\nprint(f\"y={y}\")\n");
    assert_eq!(var(&result, "x"), &Value::Int(42));
    assert_eq!(var(&result, "y"), &Value::Int(84));
    assert_eq!(result.variables.len(), 2);
    assert_eq!(texts(&result, ElementKind::Output), vec!["y=84"]);
    assert!(of_kind(&result, ElementKind::Variable).len() >= 2);
    assert_eq!(result.output_lines, 1);
    assert_eq!(result.variables_bound, 2);
}

#[test]
fn division_by_zero_scenario() {
    let result = run("x = 10\ny = 0\nresult = x / y\n");
    assert_eq!(var(&result, "result"), &Value::Int(0));
    assert!(of_kind(&result, ElementKind::Error).is_empty());
}

#[test]
fn if_else_scenario() {
    let result = run("if 5 > 3: a = 1\nelse: a = 2\n");
    assert_eq!(var(&result, "a"), &Value::Int(1));
    let conditions = of_kind(&result, ElementKind::IfCondition);
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].meta("result"), Some(&Value::Bool(true)));
}

#[test]
fn untaken_branch_never_binds() {
    let result = run("if 5 > 3:\n    a = 1\nelse:\n    only_else = 2\n");
    assert!(!result.variables.contains_key("only_else"));
    assert_eq!(of_kind(&result, ElementKind::Variable).len(), 1);
}

#[test]
fn elements_are_laid_out_top_down() {
    let result = run("a = 1\nprint(a)\nfor i in range(2):\n    b = i\n");
    let lines: Vec<i32> = result
        .elements
        .iter()
        .filter(|e| e.kind != ElementKind::VariableBar)
        .map(|e| e.y)
        .collect();
    let expected: Vec<i32> = (0..lines.len() as i32).map(|i| 50 + 20 * i).collect();
    assert_eq!(lines, expected);
}

#[test]
fn lanes() {
    let result = run("a = -3\nprint(a)\nfor i in range(1):\n    pass\n");
    let x_of = |kind| of_kind(&result, kind)[0].x;
    assert_eq!(x_of(ElementKind::Variable), 50);
    assert_eq!(x_of(ElementKind::VariableBar), 250);
    assert_eq!(x_of(ElementKind::Output), 400);
    assert_eq!(x_of(ElementKind::LoopStart), 400);
    assert_eq!(x_of(ElementKind::LoopIteration), 420);
    let bar = of_kind(&result, ElementKind::VariableBar)[0];
    assert_eq!(bar.meta("bar_width"), Some(&Value::Float(6.0)));
    assert_eq!(bar.color.to_hex(), "#ff0000");
}

#[test]
fn runtime_error_does_not_abort_run() {
    let result = run("a = 1\nb = [1, 2][5]\nc = 3\n");
    assert_eq!(var(&result, "c"), &Value::Int(3));
    assert_eq!(texts(&result, ElementKind::Error), vec!["Line 2: IndexError: list index out of range"]);
    assert_eq!(result.runtime_errors, 1);
    assert!(result.success);
}

#[test]
fn syntax_error_fails_whole_run() {
    let result = execute("a = 1\nif a\n    b = 2\n");
    assert!(!result.success);
    assert!(result.variables.is_empty());
    assert_eq!(result.elements.len(), 1);
    assert_eq!(result.elements[0].kind, ElementKind::Error);
    let error = result.error.unwrap_or_default();
    assert!(error.starts_with("SyntaxError:") && error.ends_with("at line 2"), "{error}");
}

#[test]
fn unsupported_statements_degrade() {
    let result = run("import math\nclass Foo:\n    x = 1\ntry:\n    y = 1\nexcept Exception:\n    pass\nz = 5\n");
    assert_eq!(
        texts(&result, ElementKind::Debug),
        vec!["# unsupported: import math", "# unsupported: class Foo:", "# unsupported: try:", "# unsupported: except Exception:"]
    );
    assert_eq!(result.variables.keys().collect::<Vec<_>>(), vec!["z"]);
}

#[test]
fn strict_mode_reports_undefined_names() {
    let result = run_with(EngineConfig::default().with_strict(true), "y = x + 1\n");
    assert_eq!(texts(&result, ElementKind::Error), vec!["Line 1: NameError: name 'x' is not defined"]);
    let lenient = run("y = x + 1\n");
    assert_eq!(var(&lenient, "y"), &Value::Int(1));
}

#[test]
fn realistic_program() {
    let src = r#"
scores = [88, 92, 79]
total = 0
for s in scores:
    total += s
average = total / len(scores)
if average >= 90:
    grade = "A"
elif average >= 80:
    grade = "B"
else:
    grade = "C"
print(f"avg={average:.1f} grade={grade}")
"#;
    let result = run(src);
    assert_eq!(var(&result, "total"), &Value::Int(259));
    assert_eq!(var(&result, "grade"), &Value::Str("B".into()));
    assert_eq!(texts(&result, ElementKind::Output), vec!["avg=86.3 grade=B"]);
    assert_eq!(texts(&result, ElementKind::IfCondition), vec!["if average >= 90: → False", "elif average >= 80: → True"]);
    assert_eq!(texts(&result, ElementKind::AugAssign)[0], "total += 88 → 88");
}

// ─── Loops ───────────────────────────────────────────────────────────────────

fn expected_range(a: i64, b: i64, c: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut i = a;
    while (c > 0 && i < b) || (c < 0 && i > b) {
        out.push(i);
        i += c;
    }
    out
}

proptest! {
    #[test]
    fn range_loop_binds_last_value(
        a in -20i64..20,
        b in -20i64..20,
        c in prop_oneof![-5i64..=-1, 1i64..=5],
    ) {
        let result = run(&format!("for i in range({a}, {b}, {c}):\n    pass\n"));
        let values = expected_range(a, b, c);
        let last = values.last().map(|v| Value::Int(*v));
        prop_assert_eq!(result.variables.get("i"), last.as_ref());
        prop_assert_eq!(of_kind(&result, ElementKind::LoopIteration).len(), values.len());
        prop_assert!(of_kind(&result, ElementKind::LoopTruncated).is_empty());
    }

    #[test]
    fn cap_truncates_exactly_once(cap in 1usize..20, extra in 1usize..30, body in 0usize..3) {
        let body = ["pass", "x = i * 2", "if i % 2 == 0:\n        print(i)"][body];
        let src = format!("for i in range({}):\n    {body}\n", cap + extra);
        let result = run_with(EngineConfig::default().with_max_loop_iterations(cap), &src);
        prop_assert_eq!(of_kind(&result, ElementKind::LoopTruncated).len(), 1);
        prop_assert_eq!(of_kind(&result, ElementKind::LoopIteration).len(), cap);
        prop_assert_eq!(result.variables.get("i"), Some(&Value::Int(cap as i64 - 1)));
    }
}

#[test]
fn while_loop_iterations() {
    let result = run("n = 3\nwhile n > 0:\n    n -= 1\n");
    assert_eq!(var(&result, "n"), &Value::Int(0));
    assert_eq!(texts(&result, ElementKind::LoopStart), vec!["while n > 0:"]);
    assert_eq!(texts(&result, ElementKind::LoopIteration), vec!["  iteration 1", "  iteration 2", "  iteration 3"]);
}

#[test]
fn infinite_while_is_capped() {
    let result = run("while True:\n    pass\nafter = 1\n");
    assert_eq!(of_kind(&result, ElementKind::LoopIteration).len(), 50);
    assert_eq!(texts(&result, ElementKind::LoopTruncated), vec!["... (truncated after 50 iterations)"]);
    assert_eq!(var(&result, "after"), &Value::Int(1));
}

#[test]
fn nested_loops_are_capped_independently() {
    let config = EngineConfig::default().with_max_loop_iterations(3);
    let result = run_with(config, "for i in range(2):\n    for j in range(5):\n        pass\n");
    assert_eq!(of_kind(&result, ElementKind::LoopTruncated).len(), 2);
    assert_eq!(result.variables.get("i"), Some(&Value::Int(1)));
}

// ─── Resource limits ─────────────────────────────────────────────────────────

fn error_texts(result: &ExecutionResult) -> Vec<&str> {
    texts(result, ElementKind::Error)
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    for src in [
        format!("x = {}1{}\n", "(".repeat(10_000), ")".repeat(10_000)),
        format!("x = {}1\n", "-".repeat(200_000)),
        format!("x = {}y\n", "not ".repeat(5_000)),
    ] {
        let result = execute(&src);
        assert!(!result.success);
        let error = result.error.unwrap_or_default();
        assert!(error.starts_with("SyntaxError:"), "{error}");
    }
}

#[test]
fn huge_ranges_are_never_materialised() {
    let result = run(
        "r = range(10**15)\nlo = min(r)\nhi = max(r)\nn = len(r)\nlast = r[-1]\nhas = 10**14 in r\ny = 1\n",
    );
    assert_eq!(var(&result, "lo"), &Value::Int(0));
    assert_eq!(var(&result, "hi"), &Value::Int(999_999_999_999_999));
    assert_eq!(var(&result, "n"), &Value::Int(1_000_000_000_000_000));
    assert_eq!(var(&result, "last"), &Value::Int(999_999_999_999_999));
    assert_eq!(var(&result, "has"), &Value::Bool(true));
    assert_eq!(var(&result, "y"), &Value::Int(1));
    assert!(error_texts(&result).is_empty());
}

#[test]
fn oversized_values_become_runtime_errors() {
    let result = run("xs = list(range(10**15))\nys = [0] * 10**12\ns = f\"{1:999999999999}\"\ny = 1\n");
    let errors = error_texts(&result);
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors.iter().all(|e| e.contains("MemoryError")), "{errors:?}");
    assert!(!result.variables.contains_key("xs"));
    assert!(!result.variables.contains_key("ys"));
    assert!(!result.variables.contains_key("s"));
    assert_eq!(var(&result, "y"), &Value::Int(1));
}

#[test]
fn ranges_spanning_the_whole_int_domain() {
    let result = run(
        "lo = -9223372036854775807 - 1\nr = range(lo, 9223372036854775807)\na = 5 in r\nb = r[0]\nc = r == range(lo, 9223372036854775807)\n",
    );
    assert_eq!(var(&result, "a"), &Value::Bool(true));
    assert_eq!(var(&result, "b"), &Value::Int(i64::MIN));
    assert_eq!(var(&result, "c"), &Value::Bool(true));
}
