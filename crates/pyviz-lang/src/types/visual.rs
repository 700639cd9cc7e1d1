use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::value::Value;

/// An sRGB color. Serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self { c.to_hex() }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&s).ok_or_else(|| format!("invalid color `{s}`"))
    }
}

// ─── Elements ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Variable,
    VariableBar,
    AugAssign,
    Output,
    LoopStart,
    LoopIteration,
    LoopTruncated,
    IfCondition,
    FunctionDef,
    FunctionCall,
    FunctionResult,
    ExpressionResult,
    Return,
    Debug,
    Error,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::VariableBar => "variable_bar",
            Self::AugAssign => "aug_assign",
            Self::Output => "output",
            Self::LoopStart => "loop_start",
            Self::LoopIteration => "loop_iteration",
            Self::LoopTruncated => "loop_truncated",
            Self::IfCondition => "if_condition",
            Self::FunctionDef => "function_def",
            Self::FunctionCall => "function_call",
            Self::FunctionResult => "function_result",
            Self::ExpressionResult => "expression_result",
            Self::Return => "return",
            Self::Debug => "debug",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positioned, colored unit of feedback. Bars carry their geometry in
/// `metadata` (`bar_width`, `bar_height`, `value`); text elements carry none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualElement {
    pub kind: ElementKind,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
    pub metadata: BTreeMap<String, Value>,
}

impl VisualElement {
    pub fn new(kind: ElementKind, text: impl Into<String>, x: i32, y: i32, color: Rgb) -> Self {
        Self { kind, text: text.into(), x, y, color, metadata: BTreeMap::new() }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}
