use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A dynamically typed Python value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion ordered, like a Python dict.
    Dict(Vec<(Value, Value)>),
    /// Lazy `range(start, stop, step)`; `step` is never zero.
    Range { start: i64, stop: i64, step: i64 },
    /// Placeholder for values the interpreter does not model, e.g. `<function f>`.
    Opaque(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Opaque(s) if s.starts_with("<function") => "function",
            Value::Opaque(_) => "object",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Dict(pairs) => !pairs.is_empty(),
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Value::Opaque(_) => true,
        }
    }

    /// Int or float, excluding bool. These are the values that get a bar.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric view with bool promoted, as Python arithmetic does.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Python `str()`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Python `repr()`.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".into(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => format_float(*x),
            Value::Str(s) => quote_str(s),
            Value::List(items) => format!("[{}]", join_repr(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items)),
            Value::Dict(pairs) => {
                let body: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            Value::Range { start, stop, step: 1 } => format!("range({start}, {stop})"),
            Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Value::Opaque(s) => s.clone(),
        }
    }

    /// Items produced by iterating the value, or `None` if it is not iterable.
    /// Dicts yield their keys. Ranges are produced lazily.
    pub fn iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(Box::new(items.iter().cloned())),
            Value::Str(s) => Some(Box::new(s.chars().map(|c| Value::Str(c.to_string())))),
            Value::Dict(pairs) => Some(Box::new(pairs.iter().map(|(k, _)| k.clone()))),
            Value::Range { start, stop, step } => {
                let (start, step) = (*start, *step);
                let len = range_len(start, *stop, step);
                Some(Box::new((0..len).map(move |i| Value::Int(range_item(start, step, i)))))
            }
            _ => None,
        }
    }

    /// Materialised items, for builtins that need the whole sequence.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        self.iter().map(Iterator::collect)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Float(x) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(s) }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_str())
    }
}

// ─── Serialization ───────────────────────────────────────────────────────────

/// Values serialize to their natural JSON shape. Dict keys become strings,
/// and values JSON cannot hold (non-finite floats, ranges, opaque) serialize as their repr.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dict(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(&k.to_str(), v)?;
                }
                map.end()
            }
            Value::Str(s) => serializer.serialize_str(s),
            other => serializer.serialize_str(&other.repr()),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// The `i`th item of a range; `i` must be below its length.
pub fn range_item(start: i64, step: i64, i: i64) -> i64 {
    (i128::from(start) + i128::from(i) * i128::from(step)) as i64
}

/// Number of items `range(start, stop, step)` yields.
pub fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / -step + 1
    } else {
        0
    };
    // saturates for ranges spanning the whole i64 domain
    len.min(i128::from(i64::MAX)) as i64
}

/// Formats a float the way Python's `repr` does: shortest round-trip digits,
/// always with a fractional part or exponent, exponent form outside `[1e-4, 1e16)`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{x:e}");
        let (mantissa, exp) = s.split_once('e').unwrap_or((&s, "0"));
        let (sign, digits) = match exp.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exp),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    let s = x.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

/// Quotes a string the way Python's `repr` does.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => { out.push('\\'); out.push(c); }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_repr_matches_python() {
        assert_eq!(format_float(84.0), "84.0");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NAN), "nan");
    }

    #[test]
    fn string_repr_picks_quotes() {
        assert_eq!(quote_str("hi"), "'hi'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(quote_str("tab\there"), "'tab\\there'");
    }

    #[test]
    fn container_repr() {
        let v = Value::List(vec![Value::Int(1), Value::Str("a".into()), Value::None]);
        assert_eq!(v.repr(), "[1, 'a', None]");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(Value::Tuple(vec![]).repr(), "()");
        let d = Value::Dict(vec![(Value::Str("k".into()), Value::Float(2.5))]);
        assert_eq!(d.repr(), "{'k': 2.5}");
        assert_eq!(Value::Range { start: 0, stop: 5, step: 1 }.repr(), "range(0, 5)");
    }

    #[test]
    fn range_lengths() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(5, 0, -2), 3);
        assert_eq!(range_len(5, 5, 1), 0);
        assert_eq!(range_len(0, 5, -1), 0);
        assert_eq!(range_len(i64::MIN, i64::MAX, 1), i64::MAX);
        assert_eq!(range_len(i64::MAX, i64::MIN, -1), i64::MAX);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).truthy());
        assert!(Value::Str("x".into()).truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(!Value::Range { start: 3, stop: 3, step: 1 }.truthy());
    }

    #[test]
    fn range_iterates_lazily() {
        let huge = Value::Range { start: 0, stop: i64::MAX, step: 1 };
        let first: Vec<Value> = huge.iter().into_iter().flatten().take(3).collect();
        assert_eq!(first, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }
}
