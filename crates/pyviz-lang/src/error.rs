use thiserror::Error as ThisError;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // malformed escape sequence
    L004, // unindent does not match any outer indentation level
    L005, // unbalanced bracket

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // invalid assignment target
    P004, // malformed f-string
    P005, // nesting too deep
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::L005 => "L005",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::P004 => "P004",
            Self::P005 => "P005",
        }
    }
}

/// A syntax error. Any of these makes the whole run fail.
#[derive(Debug, Clone, ThisError)]
#[error("[{}] {line}:{column}: {message}", .code.as_str())]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Raised while evaluating a single statement. The interpreter turns it into
/// an inline error element and moves on to the next statement.
#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("[runtime] {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }

    pub fn type_error(line: usize, message: impl std::fmt::Display) -> Self {
        Self::new(line, format!("TypeError: {message}"))
    }

    pub fn value_error(line: usize, message: impl std::fmt::Display) -> Self {
        Self::new(line, format!("ValueError: {message}"))
    }
}
