pub mod syntax;
pub mod types;
pub mod runtime;
pub mod error;
pub mod config;
pub mod emitter;
pub mod session;

pub use config::{EngineConfig, Layout};
pub use emitter::Emitter;
pub use error::{Error, ErrorCode, RuntimeError};
pub use runtime::builtins::{BuiltinProvider, BuiltinRegistry};
pub use runtime::environment::Environment;
pub use runtime::evaluator::{Evaluator, evaluate};
pub use runtime::interpreter::{Interpreter, RunReport};
pub use runtime::value::Value;
pub use session::{ExecutionResult, Session, SessionStats};
pub use syntax::ast::Module;
pub use syntax::parser::parse_expression;
pub use types::palette::{BACKGROUND, Tone, ValueClass};
pub use types::visual::{ElementKind, Rgb, VisualElement};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lex and parse source text into a module.
pub fn parse(source: &str) -> Result<Module, Vec<Error>> {
    let tokens = syntax::lexer::Lexer::new(source).tokenize()?;
    syntax::parser::Parser::new(tokens).parse()
}

/// One-off run with the default configuration.
pub fn execute(source: &str) -> ExecutionResult {
    Session::new(EngineConfig::default()).execute(source)
}
