use std::collections::{BTreeMap, HashMap};

use crate::runtime::value::Value;

/// The variable environment of one execution. Python module scope only:
/// function bodies never run, so there is nothing to nest.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize { self.vars.len() }

    pub fn is_empty(&self) -> bool { self.vars.is_empty() }

    pub fn clear(&mut self) { self.vars.clear(); }

    /// Sorted copy of every binding.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite() {
        let mut env = Environment::new();
        env.set("x", Value::Int(1));
        env.set("x", Value::Int(2));
        assert_eq!(env.get("x"), Some(&Value::Int(2)));
        assert_eq!(env.len(), 1);
        assert!(env.get("y").is_none());
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut env = Environment::new();
        env.set("b", Value::Int(2));
        env.set("a", Value::Int(1));
        let keys: Vec<_> = env.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
