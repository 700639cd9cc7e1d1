//! Whitelisted callables. Each provider owns a group of names; the registry
//! dispatches a call to whichever provider exports the name.
//! `print` is not here: it is a statement-level event handled by the interpreter.

use crate::error::RuntimeError;
use crate::runtime::ops::MAX_REPEAT_LEN;
use crate::runtime::value::{Value, range_len};

pub mod core;
pub mod sequences;

// ─── Provider interface ───────────────────────────────────────────────────────

pub trait BuiltinProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn exports(&self) -> &'static [&'static str];

    /// `Ok(None)` when the name is not one of this provider's exports.
    fn call(
        &self,
        name: &str,
        args: &[Value],
        keywords: &[(String, Value)],
        line: usize,
    ) -> Result<Option<Value>, RuntimeError>;
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct BuiltinRegistry {
    providers: Vec<Box<dyn BuiltinProvider>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self { Self { providers: Vec::new() } }

    pub fn register(&mut self, p: Box<dyn BuiltinProvider>) { self.providers.push(p); }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.iter().any(|p| p.exports().contains(&name))
    }

    /// All exported names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.iter().flat_map(|p| p.exports().iter().copied())
    }

    pub fn call(&self, name: &str, args: &[Value], line: usize) -> Result<Value, RuntimeError> {
        self.call_with(name, args, &[], line)
    }

    /// Calls a builtin with keyword arguments. Unknown names evaluate to `None`.
    pub fn call_with(
        &self,
        name: &str,
        args: &[Value],
        keywords: &[(String, Value)],
        line: usize,
    ) -> Result<Value, RuntimeError> {
        for p in &self.providers {
            if let Some(v) = p.call(name, args, keywords, line)? {
                return Ok(v);
            }
        }
        Ok(Value::None)
    }

    pub fn standard() -> Self {
        let mut r = Self::new();
        r.register(Box::new(core::CoreBuiltins));
        r.register(Box::new(sequences::SequenceBuiltins));
        r
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self { Self::standard() }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn check_argc(name: &str, args: &[Value], min: usize, max: usize, line: usize) -> Result<(), RuntimeError> {
    let n = args.len();
    if n >= min && n <= max {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if n < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    let plural = if expected.ends_with(" 1") { "" } else { "s" };
    Err(RuntimeError::type_error(
        line,
        format!("{name}() takes {expected} argument{plural} ({n} given)"),
    ))
}

pub(crate) fn keyword<'k>(keywords: &'k [(String, Value)], name: &str) -> Option<&'k Value> {
    keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

pub(crate) fn reject_keywords(name: &str, keywords: &[(String, Value)], allowed: &[&str], line: usize) -> Result<(), RuntimeError> {
    match keywords.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
        Some((k, _)) => Err(RuntimeError::type_error(
            line,
            format!("'{k}' is an invalid keyword argument for {name}()"),
        )),
        None => Ok(()),
    }
}

/// An integer argument, as `range()` and `round()` require.
pub(crate) fn as_index(v: &Value, line: usize) -> Result<i64, RuntimeError> {
    v.as_i64().ok_or_else(|| {
        RuntimeError::type_error(line, format!("'{}' object cannot be interpreted as an integer", v.type_name()))
    })
}

fn not_iterable(v: &Value, line: usize) -> RuntimeError {
    RuntimeError::type_error(line, format!("'{}' object is not iterable", v.type_name()))
}

/// Lazy iteration for builtins that fold over their argument.
pub(crate) fn items(v: &Value, line: usize) -> Result<Box<dyn Iterator<Item = Value> + '_>, RuntimeError> {
    v.iter().ok_or_else(|| not_iterable(v, line))
}

/// Materialised items. Ranges too long to hold in memory are refused.
pub(crate) fn iterate(v: &Value, line: usize) -> Result<Vec<Value>, RuntimeError> {
    if let Value::Range { start, stop, step } = v {
        let len = range_len(*start, *stop, *step);
        if usize::try_from(len).map_or(true, |n| n > MAX_REPEAT_LEN) {
            return Err(RuntimeError::new(line, format!("MemoryError: range of {len} items is too large")));
        }
    }
    Ok(items(v, line)?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_exports_whitelist() {
        let r = BuiltinRegistry::standard();
        for name in ["range", "len", "abs", "min", "max", "round", "str", "int", "float", "bool"] {
            assert!(r.contains(name), "missing builtin {name}");
        }
        assert!(!r.contains("print"));
        assert!(!r.contains("open"));
    }

    #[test]
    fn unknown_name_is_none() {
        let r = BuiltinRegistry::standard();
        assert_eq!(r.call("open", &[Value::Str("x".into())], 1).unwrap(), Value::None);
    }

    #[test]
    fn argc_message() {
        let err = check_argc("len", &[], 1, 1, 4).unwrap_err();
        assert_eq!(err.message, "TypeError: len() takes exactly 1 argument (0 given)");
    }
}
