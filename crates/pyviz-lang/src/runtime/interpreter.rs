//! The statement interpreter.
//!
//! Walks a module in source order, mutating the environment and reporting
//! each meaningful statement to the emitter. Every statement runs behind an
//! error boundary: a runtime error becomes an inline `Error` element and the
//! next statement still runs.

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::emitter::Emitter;
use crate::error::RuntimeError;
use crate::runtime::builtins::BuiltinRegistry;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::ops;
use crate::runtime::value::Value;
use crate::syntax::ast::{BinOp, Expr, Module, Stmt, Target};

/// How a block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub statements: usize,
    pub output_lines: usize,
    pub runtime_errors: usize,
}

pub struct Interpreter<'a> {
    config: &'a EngineConfig,
    builtins: &'a BuiltinRegistry,
    env: &'a mut Environment,
    emitter: &'a mut Emitter,
    report: RunReport,
    loop_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        config: &'a EngineConfig,
        builtins: &'a BuiltinRegistry,
        env: &'a mut Environment,
        emitter: &'a mut Emitter,
    ) -> Self {
        Self { config, builtins, env, emitter, report: RunReport::default(), loop_depth: 0 }
    }

    pub fn run(mut self, module: &Module) -> RunReport {
        // `break` outside a loop is reported as an error, never returned.
        self.exec_block(&module.body);
        self.report
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Flow {
        for stmt in body {
            match self.exec(stmt) {
                Ok(Flow::Normal) => {}
                Ok(flow) => return flow,
                Err(e) => {
                    debug!(line = e.line, error = %e.message, "statement failed");
                    self.report.runtime_errors += 1;
                    self.emitter.error(e.line, &e.message);
                }
            }
        }
        Flow::Normal
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        let line = stmt.span().line;
        trace!(line, "exec");
        self.report.statements += 1;

        match stmt {
            Stmt::Assign { targets, value, .. } => {
                let v = self.eval(value)?;
                for target in targets {
                    self.assign(target, v.clone(), line)?;
                }
            }
            Stmt::AugAssign { target, op, value, .. } => self.exec_aug_assign(target, *op, value, line)?,
            Stmt::Expr { expr, .. } => self.exec_expr(expr, line)?,
            Stmt::For { target, iter, body, orelse, .. } => return self.exec_for(target, iter, body, orelse, line),
            Stmt::While { test, body, orelse, .. } => return self.exec_while(test, body, orelse),
            Stmt::If { test, body, orelse, span } => return self.exec_if(test, body, orelse, span.column, "if"),
            Stmt::FunctionDef { name, params, .. } => {
                self.env.set(name, Value::Opaque(format!("<function {name}>")));
                self.emitter.function_def(name, params);
            }
            Stmt::Return { value, .. } => {
                let v = value.as_ref().map(|e| self.eval(e)).transpose()?;
                self.emitter.return_marker(v.as_ref());
            }
            Stmt::Pass { .. } => {}
            Stmt::Break { .. } => return self.loop_control(Flow::Break, "break", line),
            Stmt::Continue { .. } => return self.loop_control(Flow::Continue, "continue", line),
            Stmt::Unsupported { keyword, text, .. } => {
                debug!(line, keyword = %keyword, "skipped unsupported statement");
                self.emitter.debug(text);
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        Evaluator::new(self.env, self.builtins, self.config).eval(expr)
    }

    fn loop_control(&self, flow: Flow, keyword: &str, line: usize) -> Result<Flow, RuntimeError> {
        if self.loop_depth == 0 {
            return Err(RuntimeError::new(line, format!("SyntaxError: '{keyword}' outside loop")));
        }
        Ok(flow)
    }

    // ─── Assignment ──────────────────────────────────────────────────────────

    /// Binds `value` to `target` and emits one variable element per name.
    fn assign(&mut self, target: &Target, value: Value, line: usize) -> Result<(), RuntimeError> {
        let mut bindings = Vec::new();
        if !self.destructure(target, value, line, &mut bindings)? {
            return Ok(());
        }
        for (name, value) in bindings {
            self.emitter.variable(&name, &value);
            self.env.set(&name, value);
        }
        Ok(())
    }

    /// Binds a loop variable without emitting variable elements.
    fn bind_quietly(&mut self, target: &Target, value: Value, line: usize) -> Result<(), RuntimeError> {
        let mut bindings = Vec::new();
        if self.destructure(target, value, line, &mut bindings)? {
            for (name, value) in bindings {
                self.env.set(&name, value);
            }
        }
        Ok(())
    }

    /// Collects the name bindings for `target`. Returns `false` when an
    /// unpack arity mismatch turns the whole assignment into a no-op; nothing
    /// is bound in that case.
    fn destructure(
        &mut self,
        target: &Target,
        value: Value,
        line: usize,
        out: &mut Vec<(String, Value)>,
    ) -> Result<bool, RuntimeError> {
        match target {
            Target::Name(name) => {
                out.push((name.clone(), value));
                Ok(true)
            }
            Target::Unpack(targets) => {
                let expected = targets.len();
                let Some(iter) = value.iter() else {
                    return Err(RuntimeError::type_error(
                        line,
                        format!("cannot unpack non-iterable {} object", value.type_name()),
                    ));
                };
                let items: Vec<Value> = iter.take(expected + 1).collect();
                if items.len() != expected {
                    let message = if items.len() > expected {
                        format!("too many values to unpack (expected {expected})")
                    } else {
                        format!("not enough values to unpack (expected {expected}, got {})", items.len())
                    };
                    if self.config.strict {
                        return Err(RuntimeError::value_error(line, message));
                    }
                    debug!(line, target = %target, "{message}; assignment skipped");
                    return Ok(false);
                }
                for (t, item) in targets.iter().zip(items) {
                    if !self.destructure(t, item, line, out)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Target::Other(expr) => {
                debug!(line, target = %expr, "assignment to non-name target skipped");
                self.emitter.debug(&format!("{expr} = {}", value.repr()));
                Ok(true)
            }
        }
    }

    fn exec_aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr, line: usize) -> Result<(), RuntimeError> {
        let Target::Name(name) = target else {
            debug!(line, target = %target, "augmented assignment to non-name target skipped");
            self.emitter.debug(&format!("{target} {}= {value}", op.symbol()));
            return Ok(());
        };
        let Some(old) = self.env.get(name).cloned() else {
            if self.config.strict {
                return Err(RuntimeError::new(line, format!("NameError: name '{name}' is not defined")));
            }
            debug!(line, name = %name, "augmented assignment to unbound name skipped");
            return Ok(());
        };
        let rhs = self.eval(value)?;
        let new = ops::binary(op, &old, &rhs, line)?;
        self.emitter.aug_assign(name, op, &rhs, &new);
        self.env.set(name, new);
        Ok(())
    }

    // ─── Expression statements ───────────────────────────────────────────────

    fn exec_expr(&mut self, expr: &Expr, line: usize) -> Result<(), RuntimeError> {
        if let Expr::Call { args, keywords, .. } = expr {
            match expr.callee_name() {
                Some("print") => return self.exec_print(args, keywords, line),
                Some(name) if self.builtins.contains(name) && !self.env.contains(name) => {
                    let result = self.eval(expr)?;
                    if result != Value::None {
                        self.emitter.function_result(name, &result);
                    }
                    return Ok(());
                }
                Some(name) => {
                    let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                    self.emitter.function_call(name, &args);
                    return Ok(());
                }
                None => {
                    debug!(line, call = %expr, "call through non-name callee skipped");
                    self.emitter.debug(&expr.to_string());
                    return Ok(());
                }
            }
        }

        let value = self.eval(expr)?;
        if value != Value::None {
            self.emitter.expression_result(&value);
        }
        Ok(())
    }

    /// `print(*args, sep=' ')`. Other keywords such as `end` are ignored.
    fn exec_print(&mut self, args: &[Expr], keywords: &[(String, Expr)], line: usize) -> Result<(), RuntimeError> {
        let mut sep = " ".to_string();
        for (key, value) in keywords {
            if key == "sep" {
                match self.eval(value)? {
                    Value::Str(s) => sep = s,
                    Value::None => {}
                    other => {
                        return Err(RuntimeError::type_error(
                            line,
                            format!("sep must be None or a string, not {}", other.type_name()),
                        ));
                    }
                }
            }
        }
        let parts = args
            .iter()
            .map(|a| self.eval(a).map(|v| v.to_str()))
            .collect::<Result<Vec<_>, _>>()?;
        self.emitter.output(&parts.join(&sep));
        self.report.output_lines += 1;
        Ok(())
    }

    // ─── Control flow ────────────────────────────────────────────────────────

    fn exec_if(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        column: usize,
        keyword: &str,
    ) -> Result<Flow, RuntimeError> {
        let result = self.eval(test)?.truthy();
        self.emitter.condition(keyword, &test.to_string(), result);

        if result {
            return Ok(self.exec_block(body));
        }
        // An `elif` parses as a lone nested `if` at the same column.
        if let [Stmt::If { test, body, orelse, span }] = orelse {
            if span.column == column {
                self.report.statements += 1;
                return self.exec_if(test, body, orelse, column, "elif");
            }
        }
        Ok(self.exec_block(orelse))
    }

    fn exec_for(
        &mut self,
        target: &Target,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        line: usize,
    ) -> Result<Flow, RuntimeError> {
        let iterable = self.eval(iter)?;
        let Some(items) = iterable.iter() else {
            return Err(RuntimeError::type_error(
                line,
                format!("'{}' object is not iterable", iterable.type_name()),
            ));
        };
        self.emitter.loop_start(&format!("for {target} in {iter}:"));

        self.loop_depth += 1;
        let outcome = self.drive_for(target, items, body, line);
        self.loop_depth -= 1;
        let (count, completed) = outcome?;

        debug!(line, iterations = count, completed, "for loop finished");
        Ok(if completed { self.exec_block(orelse) } else { Flow::Normal })
    }

    /// Returns the iteration count and whether the loop ran to exhaustion.
    fn drive_for(
        &mut self,
        target: &Target,
        items: impl Iterator<Item = Value>,
        body: &[Stmt],
        line: usize,
    ) -> Result<(usize, bool), RuntimeError> {
        let cap = self.config.max_loop_iterations;
        let mut count = 0;
        for item in items {
            if count == cap {
                self.emitter.loop_truncated(cap);
                return Ok((count, false));
            }
            self.emitter.loop_iteration(&format!("{target} = {}", item.repr()), count);
            self.bind_quietly(target, item, line)?;
            count += 1;
            if self.exec_block(body) == Flow::Break {
                return Ok((count, false));
            }
        }
        Ok((count, true))
    }

    fn exec_while(&mut self, test: &Expr, body: &[Stmt], orelse: &[Stmt]) -> Result<Flow, RuntimeError> {
        let line = test.span().line;
        self.emitter.loop_start(&format!("while {test}:"));

        self.loop_depth += 1;
        let outcome = self.drive_while(test, body);
        self.loop_depth -= 1;
        let (count, completed) = outcome?;

        debug!(line, iterations = count, completed, "while loop finished");
        Ok(if completed { self.exec_block(orelse) } else { Flow::Normal })
    }

    fn drive_while(&mut self, test: &Expr, body: &[Stmt]) -> Result<(usize, bool), RuntimeError> {
        let cap = self.config.max_loop_iterations;
        let mut count = 0;
        while self.eval(test)?.truthy() {
            if count == cap {
                self.emitter.loop_truncated(cap);
                return Ok((count, false));
            }
            self.emitter.loop_iteration(&format!("iteration {}", count + 1), count);
            count += 1;
            if self.exec_block(body) == Flow::Break {
                return Ok((count, false));
            }
        }
        Ok((count, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;
    use crate::types::visual::{ElementKind, VisualElement};
    use pretty_assertions::assert_eq;

    fn run_with(config: EngineConfig, src: &str) -> (Environment, Vec<VisualElement>, RunReport) {
        let tokens = Lexer::new(src).tokenize().unwrap_or_else(|e| panic!("lex failed: {e:?}"));
        let module = Parser::new(tokens).parse().unwrap_or_else(|e| panic!("parse failed: {e:?}"));
        let builtins = BuiltinRegistry::standard();
        let mut env = Environment::new();
        let mut emitter = Emitter::new(Layout::default());
        let report = Interpreter::new(&config, &builtins, &mut env, &mut emitter).run(&module);
        (env, emitter.into_elements(), report)
    }

    fn run(src: &str) -> (Environment, Vec<VisualElement>) {
        let (env, els, _) = run_with(EngineConfig::default(), src);
        (env, els)
    }

    fn texts(els: &[VisualElement], kind: ElementKind) -> Vec<String> {
        els.iter().filter(|e| e.kind == kind).map(|e| e.text.clone()).collect()
    }

    fn count(els: &[VisualElement], kind: ElementKind) -> usize {
        els.iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn assignments_emit_variables_and_bars() {
        let (env, els) = run("x = 42\ny = x * 2\nname = 'bob'\n");
        assert_eq!(env.get("y"), Some(&Value::Int(84)));
        assert_eq!(texts(&els, ElementKind::Variable), vec!["x = 42", "y = 84", "name = 'bob'"]);
        assert_eq!(count(&els, ElementKind::VariableBar), 2);
    }

    #[test]
    fn chained_and_unpacking_assignment() {
        let (env, _) = run("a = b = 3\nc, (d, e) = 1, [2, 3]\n");
        assert_eq!(env.get("a"), Some(&Value::Int(3)));
        assert_eq!(env.get("b"), Some(&Value::Int(3)));
        assert_eq!(env.get("e"), Some(&Value::Int(3)));
    }

    #[test]
    fn unpack_mismatch_is_a_noop() {
        let (env, els) = run("a, b = 1, 2, 3\n");
        assert!(env.is_empty());
        assert_eq!(count(&els, ElementKind::Error), 0);
    }

    #[test]
    fn unpack_mismatch_errors_in_strict_mode() {
        let (env, els, report) = run_with(EngineConfig::default().with_strict(true), "a, b = 1, 2, 3\n");
        assert!(env.is_empty());
        assert_eq!(texts(&els, ElementKind::Error), vec!["Line 1: ValueError: too many values to unpack (expected 2)"]);
        assert_eq!(report.runtime_errors, 1);
    }

    #[test]
    fn aug_assign_requires_binding() {
        let (env, els) = run("x = 10\nx += 5\nmissing += 1\n");
        assert_eq!(env.get("x"), Some(&Value::Int(15)));
        assert!(!env.contains("missing"));
        assert_eq!(texts(&els, ElementKind::AugAssign), vec!["x += 5 → 15"]);
    }

    #[test]
    fn print_joins_with_sep() {
        let (_, els) = run("print('a', 1, 2.5)\nprint('x', 'y', sep='-', end='')\nprint()\n");
        assert_eq!(texts(&els, ElementKind::Output), vec!["a 1 2.5", "x-y", ""]);
    }

    #[test]
    fn call_statements() {
        let (_, els) = run("len([1, 2, 3])\ngreet('bob')\nxs = []\nxs.append(1)\n");
        assert_eq!(texts(&els, ElementKind::FunctionResult), vec!["len() → 3"]);
        assert_eq!(texts(&els, ElementKind::FunctionCall), vec!["greet('bob')"]);
        assert_eq!(texts(&els, ElementKind::Debug), vec!["# unsupported: xs.append(1)"]);
    }

    #[test]
    fn expression_results_skip_none() {
        let (_, els) = run("1 + 2\nNone\n");
        assert_eq!(texts(&els, ElementKind::ExpressionResult), vec!["Result: 3"]);
    }

    #[test]
    fn for_range_binds_last_value() {
        let (env, els) = run("for i in range(0, 5):\n    pass\n");
        assert_eq!(env.get("i"), Some(&Value::Int(4)));
        assert_eq!(texts(&els, ElementKind::LoopStart), vec!["for i in range(0, 5):"]);
        assert_eq!(count(&els, ElementKind::LoopIteration), 5);
        assert_eq!(count(&els, ElementKind::LoopTruncated), 0);
    }

    #[test]
    fn for_with_unpacking_target() {
        let (env, _) = run("total = 0\nfor k, v in [('a', 1), ('b', 2)]:\n    total += v\n");
        assert_eq!(env.get("total"), Some(&Value::Int(3)));
        assert_eq!(env.get("k"), Some(&Value::Str("b".into())));
    }

    #[test]
    fn loop_cap_truncates_once() {
        let (env, els) = run("n = 0\nwhile True:\n    n += 1\n");
        assert_eq!(env.get("n"), Some(&Value::Int(50)));
        assert_eq!(texts(&els, ElementKind::LoopTruncated), vec!["... (truncated after 50 iterations)"]);
    }

    #[test]
    fn loop_exactly_at_cap_is_not_truncated() {
        let (_, els) = run("for i in range(50):\n    pass\n");
        assert_eq!(count(&els, ElementKind::LoopIteration), 50);
        assert_eq!(count(&els, ElementKind::LoopTruncated), 0);
    }

    #[test]
    fn configurable_cap() {
        let config = EngineConfig::default().with_max_loop_iterations(3);
        let (env, els, _) = run_with(config, "for i in range(10 ** 9):\n    pass\n");
        assert_eq!(env.get("i"), Some(&Value::Int(2)));
        assert_eq!(texts(&els, ElementKind::LoopTruncated), vec!["... (truncated after 3 iterations)"]);
    }

    #[test]
    fn break_continue_and_else() {
        let src = "\
found = -1
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 4:
        found = i
        break
else:
    found = 100
n = 0
while n < 3:
    n += 1
else:
    done = True
";
        let (env, _) = run(src);
        assert_eq!(env.get("found"), Some(&Value::Int(5)));
        assert_eq!(env.get("done"), Some(&Value::Bool(true)));
    }

    #[test]
    fn truncated_loop_skips_else() {
        let config = EngineConfig::default().with_max_loop_iterations(2);
        let (env, _, _) = run_with(config, "for i in range(5):\n    pass\nelse:\n    hit = 1\n");
        assert!(!env.contains("hit"));
    }

    #[test]
    fn if_takes_one_branch() {
        let (env, els) = run("if 5 > 3: a = 1\nelse: b = 2\n");
        assert_eq!(env.get("a"), Some(&Value::Int(1)));
        assert!(!env.contains("b"));
        let conditions = texts(&els, ElementKind::IfCondition);
        assert_eq!(conditions, vec!["if 5 > 3: → True"]);
    }

    #[test]
    fn elif_chain_labels() {
        let (env, els) = run("x = 2\nif x == 1:\n    r = 'one'\nelif x == 2:\n    r = 'two'\nelse:\n    r = 'many'\n");
        assert_eq!(env.get("r"), Some(&Value::Str("two".into())));
        assert_eq!(texts(&els, ElementKind::IfCondition), vec!["if x == 1: → False", "elif x == 2: → True"]);
    }

    #[test]
    fn runtime_errors_are_inline() {
        let (env, els, report) = run_with(EngineConfig::default(), "a = 'x' - 1\nb = 2\n");
        assert_eq!(
            texts(&els, ElementKind::Error),
            vec!["Line 1: TypeError: unsupported operand type(s) for -: 'str' and 'int'"]
        );
        assert_eq!(env.get("b"), Some(&Value::Int(2)));
        assert_eq!(report.runtime_errors, 1);
    }

    #[test]
    fn errors_inside_loops_do_not_stop_the_loop() {
        let (env, els) = run("for i in range(3):\n    x = [1][i]\n");
        assert_eq!(env.get("x"), Some(&Value::Int(1)));
        assert_eq!(count(&els, ElementKind::Error), 2);
    }

    #[test]
    fn def_registers_placeholder() {
        let (env, els) = run("def add(a, b):\n    return a + b\nreturn 5\n");
        assert_eq!(env.get("add"), Some(&Value::Opaque("<function add>".into())));
        assert_eq!(texts(&els, ElementKind::FunctionDef), vec!["def add(a, b)"]);
        assert_eq!(texts(&els, ElementKind::Return), vec!["Return: 5"]);
    }

    #[test]
    fn unsupported_statements_leave_markers() {
        let (env, els) = run("import math\nx = 1\n");
        assert_eq!(texts(&els, ElementKind::Debug), vec!["# unsupported: import math"]);
        assert_eq!(env.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn stray_break_is_an_error() {
        let (_, els) = run("break\nx = 1\n");
        assert_eq!(texts(&els, ElementKind::Error), vec!["Line 1: SyntaxError: 'break' outside loop"]);
    }
}
