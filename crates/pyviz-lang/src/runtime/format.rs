//! The format-spec mini-language used by f-string fields:
//! `[[fill]align][sign][#][0][width][,|_][.precision][type]`.

use crate::error::RuntimeError;
use crate::runtime::ops::MAX_REPEAT_LEN;
use crate::runtime::value::{Value, format_float};

#[derive(Debug, Clone, PartialEq)]
struct FormatSpec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            width: 0,
            grouping: None,
            precision: None,
            ty: None,
        }
    }
}

/// Width or precision, bounded like sequence repetition.
fn spec_number(digits: &[char], line: usize) -> Result<usize, RuntimeError> {
    let n = digits.iter().collect::<String>().parse::<usize>().unwrap_or(usize::MAX);
    if n > MAX_REPEAT_LEN {
        return Err(RuntimeError::new(line, "MemoryError: format width or precision is too large"));
    }
    Ok(n)
}

fn parse_spec(spec: &str, line: usize) -> Result<FormatSpec, RuntimeError> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = chars[0];
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
        out.sign = c;
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        if out.align.is_none() {
            out.fill = '0';
            out.align = Some('=');
        }
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        out.width = spec_number(&chars[start..i], line)?;
    }
    if let Some(&c @ (',' | '_')) = chars.get(i) {
        out.grouping = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err(RuntimeError::value_error(line, "Format specifier missing precision"));
        }
        out.precision = Some(spec_number(&chars[start..i], line)?);
    }
    if let Some(&c) = chars.get(i) {
        out.ty = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err(RuntimeError::value_error(line, "Invalid format specifier"));
    }
    Ok(out)
}

/// Applies an `!r` / `!s` / `!a` conversion.
pub fn convert(value: &Value, conversion: char) -> Value {
    match conversion {
        'r' => Value::Str(value.repr()),
        'a' => Value::Str(ascii(&value.repr())),
        _ => Value::Str(value.to_str()),
    }
}

fn ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c as u32 {
            0..=0x7f => out.push(c),
            n @ 0x80..=0xff => out.push_str(&format!("\\x{n:02x}")),
            n @ 0x100..=0xffff => out.push_str(&format!("\\u{n:04x}")),
            n => out.push_str(&format!("\\U{n:08x}")),
        }
    }
    out
}

/// Python `format(value, spec)`.
pub fn format_value(value: &Value, spec: &str, line: usize) -> Result<String, RuntimeError> {
    if spec.is_empty() {
        return Ok(value.to_str());
    }
    let fs = parse_spec(spec, line)?;

    match value {
        Value::Str(s) => format_str(s, &fs, line),
        Value::Int(_) | Value::Bool(_) => {
            let i = value.as_i64().unwrap_or(0);
            match fs.ty {
                Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => Ok(format_float_spec(i as f64, &fs)),
                _ => format_int(i, &fs, line),
            }
        }
        Value::Float(x) => match fs.ty {
            None | Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%' | 'n') => Ok(format_float_spec(*x, &fs)),
            Some(t) => Err(unknown_code(t, "float", line)),
        },
        other => Err(RuntimeError::type_error(
            line,
            format!("unsupported format string passed to {}.__format__", other.type_name()),
        )),
    }
}

fn unknown_code(code: char, type_name: &str, line: usize) -> RuntimeError {
    RuntimeError::value_error(line, format!("Unknown format code '{code}' for object of type '{type_name}'"))
}

fn format_str(s: &str, fs: &FormatSpec, line: usize) -> Result<String, RuntimeError> {
    if let Some(t) = fs.ty.filter(|t| *t != 's') {
        return Err(unknown_code(t, "str", line));
    }
    if fs.sign != '-' {
        return Err(RuntimeError::value_error(line, "Sign not allowed in string format specifier"));
    }
    let body: String = match fs.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    Ok(pad("", &body, fs, '<'))
}

fn format_int(i: i64, fs: &FormatSpec, line: usize) -> Result<String, RuntimeError> {
    let magnitude = i.unsigned_abs();
    let (digits, prefix, group_every) = match fs.ty {
        None | Some('d' | 'n') => (magnitude.to_string(), "", 3),
        Some('b') => (format!("{magnitude:b}"), "0b", 4),
        Some('o') => (format!("{magnitude:o}"), "0o", 4),
        Some('x') => (format!("{magnitude:x}"), "0x", 4),
        Some('X') => (format!("{magnitude:X}"), "0X", 4),
        Some('c') => {
            let c = u32::try_from(i).ok().and_then(char::from_u32)
                .ok_or_else(|| RuntimeError::new(line, "OverflowError: %c arg not in range(0x110000)"))?;
            return Ok(pad("", &c.to_string(), fs, '<'));
        }
        Some(t) => return Err(unknown_code(t, "int", line)),
    };
    if fs.precision.is_some() {
        return Err(RuntimeError::value_error(line, "Precision not allowed in integer format specifier"));
    }
    let digits = match fs.grouping {
        Some(sep) => group(&digits, sep, group_every),
        None => digits,
    };
    let mut lead = sign_str(i < 0, fs.sign).to_string();
    if fs.alternate {
        lead.push_str(prefix);
    }
    Ok(pad(&lead, &digits, fs, '>'))
}

fn format_float_spec(x: f64, fs: &FormatSpec) -> String {
    let negative = x.is_sign_negative() && !x.is_nan();
    let magnitude = x.abs();
    let upper = matches!(fs.ty, Some('E' | 'F' | 'G'));

    let mut body = if !magnitude.is_finite() {
        let s = if magnitude.is_nan() { "nan" } else { "inf" };
        let s = if upper { s.to_uppercase() } else { s.to_string() };
        if fs.ty == Some('%') { format!("{s}%") } else { s }
    } else {
        match fs.ty {
            Some('f' | 'F') => format!("{:.*}", fs.precision.unwrap_or(6), magnitude),
            Some('e' | 'E') => exp_form(magnitude, fs.precision.unwrap_or(6), upper),
            Some('g' | 'G') => general(magnitude, fs.precision.unwrap_or(6), fs.alternate, upper),
            Some('%') => format!("{:.*}%", fs.precision.unwrap_or(6), magnitude * 100.0),
            _ => match fs.precision {
                // like 'g', but keeps a fractional digit on whole numbers
                Some(p) => {
                    let s = general(magnitude, p, fs.alternate, false);
                    if s.contains(['.', 'e']) { s } else { format!("{s}.0") }
                }
                None => format_float(magnitude),
            },
        }
    };

    if let Some(sep) = fs.grouping {
        let split = body.find(['.', 'e', '%']).unwrap_or(body.len());
        let (int_part, rest) = body.split_at(split);
        if int_part.chars().all(|c| c.is_ascii_digit()) {
            body = format!("{}{}", group(int_part, sep, 3), rest);
        }
    }
    pad(sign_str(negative, fs.sign), &body, fs, '>')
}

/// `d.ddde+XX` with at least two exponent digits.
fn exp_form(x: f64, precision: usize, upper: bool) -> String {
    let s = format!("{:.*e}", precision, x);
    let (mantissa, exp) = s.split_once('e').unwrap_or((&s, "0"));
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{digits:0>2}")
}

/// The `g` presentation: fixed or exponent form depending on the exponent,
/// with insignificant trailing zeros removed unless `#` was given.
fn general(x: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let p = precision.max(1);
    let exp = if x == 0.0 {
        0
    } else {
        let sci = format!("{:.*e}", p - 1, x);
        sci.split_once('e').and_then(|(_, e)| e.parse::<i32>().ok()).unwrap_or(0)
    };
    let s = if (-4..p as i32).contains(&exp) {
        format!("{:.*}", (p as i32 - 1 - exp).max(0) as usize, x)
    } else {
        exp_form(x, p - 1, upper)
    };
    if alternate {
        return s;
    }
    match s.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let e = if upper { 'E' } else { 'e' };
            format!("{}{e}{exp}", strip_zeros(mantissa))
        }
        None => strip_zeros(&s).to_string(),
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') { s.trim_end_matches('0').trim_end_matches('.') } else { s }
}

fn sign_str(negative: bool, sign: char) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

fn group(digits: &str, sep: char, every: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / every);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % every == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

/// Pads `lead + body` to the spec width. `=` alignment pads between the two.
fn pad(lead: &str, body: &str, fs: &FormatSpec, default_align: char) -> String {
    let len = lead.chars().count() + body.chars().count();
    if fs.width <= len {
        return format!("{lead}{body}");
    }
    let fill: String = std::iter::repeat_n(fs.fill, fs.width - len).collect();
    match fs.align.unwrap_or(default_align) {
        '<' => format!("{lead}{body}{fill}"),
        '=' => format!("{lead}{fill}{body}"),
        '^' => {
            let left = (fs.width - len) / 2;
            let (l, r) = fill.split_at(left * fs.fill.len_utf8());
            format!("{l}{lead}{body}{r}")
        }
        _ => format!("{fill}{lead}{body}"),
    }
}
