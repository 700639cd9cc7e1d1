//! Turns interpreter events into positioned elements.
//!
//! The emitter owns the layout cursor. Every event occupies one display line:
//! the element is placed at the cursor in its lane, then the cursor moves down
//! by one line height. A numeric variable also gets a bar on the same line.

use crate::config::Layout;
use crate::runtime::value::Value;
use crate::syntax::ast::BinOp;
use crate::types::palette::{Tone, ValueClass};
use crate::types::visual::{ElementKind, VisualElement};

pub struct Emitter {
    layout: Layout,
    cursor: i32,
    elements: Vec<VisualElement>,
}

impl Emitter {
    pub fn new(layout: Layout) -> Self {
        let cursor = layout.top;
        Self { layout, cursor, elements: Vec::new() }
    }

    /// Continues after earlier output, keeping its elements and cursor.
    pub fn resume(layout: Layout, elements: Vec<VisualElement>, cursor: i32) -> Self {
        Self { layout, cursor, elements }
    }

    pub fn cursor(&self) -> i32 { self.cursor }

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn elements(&self) -> &[VisualElement] { &self.elements }

    pub fn into_elements(self) -> Vec<VisualElement> { self.elements }

    pub fn len(&self) -> usize { self.elements.len() }

    pub fn is_empty(&self) -> bool { self.elements.is_empty() }

    // ─── Events ──────────────────────────────────────────────────────────────

    /// `name = value`, plus a bar for int and float values.
    pub fn variable(&mut self, name: &str, value: &Value) {
        let text = format!("{name} = {}", value.repr());
        let el = self.at(ElementKind::Variable, text, self.layout.variable_x, Tone::Value(ValueClass::of(value)))
            .with_meta("name", name)
            .with_meta("value", value.clone());
        self.elements.push(el);

        if let (true, Some(v)) = (value.is_numeric(), value.as_f64()) {
            let tone = if v >= 0.0 { Tone::BarPositive } else { Tone::BarNegative };
            let bar = VisualElement::new(
                ElementKind::VariableBar,
                "",
                self.layout.bar_x,
                self.cursor - 5,
                tone.color(),
            )
            .with_meta("bar_width", self.bar_width(v))
            .with_meta("bar_height", self.layout.bar_height as i64)
            .with_meta("value", value.clone());
            self.elements.push(bar);
        }
        self.advance();
    }

    /// Saturating linear bar length: `min(|v| * scale, max_width)`.
    pub fn bar_width(&self, v: f64) -> f64 {
        if v.is_nan() {
            return 0.0;
        }
        (v.abs() * self.layout.bar_scale).min(self.layout.bar_max_width)
    }

    /// `name += rhs → new`
    pub fn aug_assign(&mut self, name: &str, op: BinOp, rhs: &Value, new: &Value) {
        let text = format!("{name} {}= {} → {}", op.symbol(), rhs.repr(), new.repr());
        let el = self.at(ElementKind::AugAssign, text, self.layout.variable_x, Tone::AugAssign)
            .with_meta("name", name)
            .with_meta("value", new.clone());
        self.emit(el);
    }

    pub fn output(&mut self, text: &str) {
        let el = self.at(ElementKind::Output, text, self.layout.output_x, Tone::Output);
        self.emit(el);
    }

    /// Header line such as `for i in range(0, 5):` or `while n > 0:`.
    pub fn loop_start(&mut self, header: &str) {
        let el = self.at(ElementKind::LoopStart, header, self.layout.flow_x, Tone::LoopStart);
        self.emit(el);
    }

    pub fn loop_iteration(&mut self, text: &str, index: usize) {
        let x = self.layout.flow_x + self.layout.indent;
        let el = self.at(ElementKind::LoopIteration, format!("  {text}"), x, Tone::LoopIteration)
            .with_meta("iteration", index as i64);
        self.emit(el);
    }

    pub fn loop_truncated(&mut self, limit: usize) {
        let text = format!("... (truncated after {limit} iterations)");
        let el = self.at(ElementKind::LoopTruncated, text, self.layout.flow_x, Tone::Truncation)
            .with_meta("limit", limit as i64);
        self.emit(el);
    }

    /// `if cond: → True`
    pub fn condition(&mut self, keyword: &str, test: &str, result: bool) {
        let text = format!("{keyword} {test}: → {}", if result { "True" } else { "False" });
        let el = self.at(ElementKind::IfCondition, text, self.layout.flow_x, Tone::Condition(result))
            .with_meta("result", result);
        self.emit(el);
    }

    pub fn function_def(&mut self, name: &str, params: &[String]) {
        let text = format!("def {name}({})", params.join(", "));
        let el = self.at(ElementKind::FunctionDef, text, self.layout.output_x, Tone::FunctionDef)
            .with_meta("name", name);
        self.emit(el);
    }

    /// Echo of a call whose result is not shown, e.g. `greet('bob')`.
    pub fn function_call(&mut self, name: &str, args: &[Value]) {
        let args: Vec<String> = args.iter().map(Value::repr).collect();
        let text = format!("{name}({})", args.join(", "));
        let el = self.at(ElementKind::FunctionCall, text, self.layout.output_x, Tone::CallEcho)
            .with_meta("name", name);
        self.emit(el);
    }

    /// `len() → 3`
    pub fn function_result(&mut self, name: &str, value: &Value) {
        let text = format!("{name}() → {}", value.repr());
        let el = self.at(ElementKind::FunctionResult, text, self.layout.output_x, Tone::FunctionResult)
            .with_meta("name", name)
            .with_meta("value", value.clone());
        self.emit(el);
    }

    pub fn expression_result(&mut self, value: &Value) {
        let text = format!("Result: {}", value.repr());
        let el = self.at(ElementKind::ExpressionResult, text, self.layout.output_x, Tone::ExpressionResult)
            .with_meta("value", value.clone());
        self.emit(el);
    }

    pub fn return_marker(&mut self, value: Option<&Value>) {
        let text = match value {
            Some(v) => format!("Return: {}", v.repr()),
            None => "Return".to_string(),
        };
        let el = self.at(ElementKind::Return, text, self.layout.output_x, Tone::Return);
        self.emit(el);
    }

    /// `# unsupported: import math`
    pub fn debug(&mut self, text: &str) {
        let el = self.at(ElementKind::Debug, format!("# unsupported: {text}"), self.layout.variable_x, Tone::Debug);
        self.emit(el);
    }

    /// `Line N: message`
    pub fn error(&mut self, line: usize, message: &str) {
        let text = format!("Line {line}: {message}");
        let el = self.at(ElementKind::Error, text, self.layout.output_x, Tone::Error)
            .with_meta("line", line as i64);
        self.emit(el);
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn at(&self, kind: ElementKind, text: impl Into<String>, x: i32, tone: Tone) -> VisualElement {
        VisualElement::new(kind, text, x, self.cursor, tone.color())
    }

    fn emit(&mut self, el: VisualElement) {
        self.elements.push(el);
        self.advance();
    }

    fn advance(&mut self) {
        self.cursor += self.layout.line_height;
    }
}
