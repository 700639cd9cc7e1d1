pub mod value;
pub mod ops;
pub mod format;
pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
