use std::collections::BTreeMap;
use std::mem;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::emitter::Emitter;
use crate::error::Error;
use crate::runtime::builtins::BuiltinRegistry;
use crate::runtime::environment::Environment;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;
use crate::types::visual::VisualElement;

/// Outcome of one run. Always well formed, even for a syntax error.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub elapsed_ms: f64,
    /// Elements produced by this run. In live mode `elements` also holds
    /// the ones carried over from earlier runs.
    pub elements_created: usize,
    pub variables_bound: usize,
    pub output_lines: usize,
    pub runtime_errors: usize,
    pub error: Option<String>,
    pub variables: BTreeMap<String, Value>,
    pub elements: Vec<VisualElement>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub executions: usize,
    /// Runs that ended in a syntax error.
    pub failures: usize,
    pub total_elapsed: Duration,
}

impl SessionStats {
    pub fn average_ms(&self) -> f64 {
        if self.executions == 0 {
            return 0.0;
        }
        self.total_elapsed.as_secs_f64() * 1000.0 / self.executions as f64
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Long-lived execution context.
///
/// `execute` starts every run from scratch. `execute_live` keeps the
/// environment and the element list of earlier runs and continues the
/// layout cursor below them.
pub struct Session {
    config: EngineConfig,
    builtins: BuiltinRegistry,
    env: Environment,
    elements: Vec<VisualElement>,
    cursor: i32,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let cursor = config.layout.top;
        Self {
            config,
            builtins: BuiltinRegistry::standard(),
            env: Environment::new(),
            elements: Vec::new(),
            cursor,
            stats: SessionStats::default(),
        }
    }

    pub fn with_builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn variables(&self) -> BTreeMap<String, Value> { self.env.snapshot() }

    pub fn elements(&self) -> &[VisualElement] { &self.elements }

    pub fn stats(&self) -> SessionStats { self.stats }

    /// Clears the environment and elements. Statistics are kept.
    pub fn reset(&mut self) {
        self.env.clear();
        self.elements.clear();
        self.cursor = self.config.layout.top;
    }

    pub fn execute(&mut self, source: &str) -> ExecutionResult {
        self.reset();
        self.run(source, false)
    }

    pub fn execute_live(&mut self, source: &str) -> ExecutionResult {
        self.run(source, true)
    }

    fn run(&mut self, source: &str, live: bool) -> ExecutionResult {
        let start = Instant::now();
        let result = match crate::parse(source) {
            Ok(module) => {
                let before = self.elements.len();
                let mut emitter = Emitter::resume(self.config.layout.clone(), mem::take(&mut self.elements), self.cursor);
                let report = Interpreter::new(&self.config, &self.builtins, &mut self.env, &mut emitter).run(&module);
                self.cursor = emitter.cursor();
                self.elements = emitter.into_elements();

                ExecutionResult {
                    success: true,
                    elapsed_ms: 0.0,
                    elements_created: self.elements.len() - before,
                    variables_bound: self.env.len(),
                    output_lines: report.output_lines,
                    runtime_errors: report.runtime_errors,
                    error: None,
                    variables: self.env.snapshot(),
                    elements: self.elements.clone(),
                }
            }
            Err(errors) => self.syntax_failure(&errors, live),
        };

        let elapsed = start.elapsed();
        self.stats.executions += 1;
        self.stats.total_elapsed += elapsed;
        if !result.success {
            self.stats.failures += 1;
        }
        debug!(
            live,
            success = result.success,
            elements = result.elements_created,
            elapsed_us = elapsed.as_micros() as u64,
            "execution finished"
        );
        ExecutionResult { elapsed_ms: elapsed.as_secs_f64() * 1000.0, ..result }
    }

    /// A syntax error renders as a single error element. A live session keeps
    /// its previous state so a half-typed edit does not wipe the view.
    fn syntax_failure(&mut self, errors: &[Error], live: bool) -> ExecutionResult {
        let (line, message) = errors
            .first()
            .map(|e| (e.line, e.message.clone()))
            .unwrap_or((0, "invalid syntax".to_string()));
        debug!(line, count = errors.len(), "syntax error");

        let mut emitter = Emitter::new(self.config.layout.clone());
        emitter.error(line, &format!("SyntaxError: {message}"));
        let elements = emitter.into_elements();
        if !live {
            self.elements = elements.clone();
        }

        ExecutionResult {
            success: false,
            elapsed_ms: 0.0,
            elements_created: elements.len(),
            variables_bound: self.env.len(),
            output_lines: 0,
            runtime_errors: 0,
            error: Some(format!("SyntaxError: {message} at line {line}")),
            variables: self.env.snapshot(),
            elements,
        }
    }
}

impl Default for Session {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::visual::ElementKind;

    #[test]
    fn execute_starts_fresh() {
        let mut session = Session::default();
        session.execute("a = 1\n");
        let result = session.execute("b = 2\n");
        assert_eq!(result.variables.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(result.elements[0].y, 50);
    }

    #[test]
    fn live_mode_carries_state_forward() {
        let mut session = Session::default();
        session.execute_live("a = 1\n");
        let result = session.execute_live("b = a + 1\n");
        assert_eq!(result.variables.get("b"), Some(&Value::Int(2)));
        assert_eq!(result.elements_created, 2);
        assert_eq!(result.elements.len(), 4);
        assert_eq!(result.elements[2].y, 70);
    }

    #[test]
    fn syntax_error_result() {
        let mut session = Session::default();
        let result = session.execute("x = = 1\n");
        assert!(!result.success);
        let error = result.error.as_deref().unwrap_or_default();
        assert!(error.starts_with("SyntaxError: "), "{error}");
        assert!(error.ends_with("at line 1"), "{error}");
        assert_eq!(result.elements.len(), 1);
        assert_eq!(result.elements[0].kind, ElementKind::Error);
        assert_eq!(session.stats().failures, 1);
    }

    #[test]
    fn live_syntax_error_keeps_previous_state() {
        let mut session = Session::default();
        session.execute_live("a = 1\n");
        let result = session.execute_live("a = (\n");
        assert!(!result.success);
        assert_eq!(session.variables().get("a"), Some(&Value::Int(1)));
        assert_eq!(session.elements().len(), 2);
    }

    #[test]
    fn stats_accumulate() {
        let mut session = Session::default();
        session.execute("x = 1\n");
        session.execute("y = 2\n");
        let stats = session.stats();
        assert_eq!(stats.executions, 2);
        assert_eq!(stats.failures, 0);
        assert!(stats.average_ms() >= 0.0);
    }

    #[test]
    fn result_serializes() {
        let result = Session::default().execute("x = 42\nprint(f\"y={x * 2}\")\n");
        let json = serde_json::to_value(&result).unwrap_or_else(|e| panic!("serialize failed: {e}"));
        assert_eq!(json["success"], true);
        assert_eq!(json["variables"]["x"], 42);
        assert_eq!(json["elements"][0]["kind"], "variable");
        assert_eq!(json["elements"][0]["color"], "#ffff00");
        assert_eq!(json["output_lines"], 1);
    }
}
